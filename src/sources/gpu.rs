// GPUs: NVIDIA through nvidia-smi, the rest from /sys/class/drm (AMD exposes live metrics there)

use async_trait::async_trait;
use std::time::Duration;
use tracing::instrument;

use super::linux::{self, DrmCard};
use super::run_tool;
use crate::adapter::SourceAdapter;
use crate::error::CollectError;
use crate::models::{GpuController, GpuStats};

const NVIDIA_SMI: &str = "nvidia-smi";
const NVIDIA_QUERY: &str = concat!(
    "--query-gpu=index,name,driver_version,memory.total,memory.used,",
    "utilization.gpu,temperature.gpu,power.draw,power.limit"
);
const MIB: u64 = 1024 * 1024;

/// Caches the PCI card list and whether nvidia-smi works; both are probed on first collection.
#[derive(Default)]
pub struct GpuSource {
    cards: Option<Vec<DrmCard>>,
    nvidia_smi: Option<bool>,
}

impl GpuSource {
    pub fn new() -> Self {
        Self::default()
    }
}

fn nvidia_value(field: &str) -> Option<&str> {
    let field = field.trim();
    if field.is_empty() || field.starts_with('[') || field.eq_ignore_ascii_case("n/a") {
        return None;
    }
    Some(field)
}

/// Parse `nvidia-smi --format=csv,noheader,nounits` output for `NVIDIA_QUERY`.
fn parse_nvidia_smi(output: &str) -> Vec<GpuController> {
    output
        .lines()
        .filter_map(|line| {
            let f: Vec<&str> = line.split(',').collect();
            if f.len() < 9 {
                return None;
            }
            let float = |i: usize| nvidia_value(f[i]).and_then(|v| v.parse::<f64>().ok());
            let mib = |i: usize| {
                nvidia_value(f[i])
                    .and_then(|v| v.parse::<f64>().ok())
                    .map(|v| (v as u64).saturating_mul(MIB))
            };
            Some(GpuController {
                index: nvidia_value(f[0])?.parse().ok()?,
                vendor: "NVIDIA".into(),
                model: nvidia_value(f[1]).unwrap_or("Unknown").to_string(),
                driver_version: nvidia_value(f[2]).map(str::to_string),
                memory_total: mib(3),
                memory_used: mib(4),
                utilization: float(5),
                temperature: float(6),
                power_draw: float(7),
                power_limit: float(8),
            })
        })
        .collect()
}

fn drm_controller(index: u32, card: &DrmCard) -> GpuController {
    let vendor = linux::pci_vendor_name(&card.vendor_id);
    GpuController {
        index,
        vendor: vendor.to_string(),
        model: format!("{} GPU [{}]", vendor, card.device_id),
        driver_version: None,
        memory_total: card.vram_total(),
        memory_used: card.vram_used(),
        utilization: card.busy_percent(),
        temperature: card.temperature(),
        power_draw: None,
        power_limit: None,
    }
}

async fn nvidia_smi_works() -> bool {
    run_tool(NVIDIA_SMI, &["-L"]).await.is_ok()
}

#[async_trait]
impl SourceAdapter for GpuSource {
    type Output = GpuStats;

    #[instrument(skip(self), fields(source = "gpu", operation = "collect_gpu"))]
    async fn collect(&mut self, _budget: Duration) -> Result<GpuStats, CollectError> {
        if self.cards.is_none() {
            let cards = tokio::task::spawn_blocking(linux::drm_cards).await?;
            tracing::debug!(cards = cards.len(), "drm cards probed");
            self.cards = Some(cards);
        }
        let use_nvidia_smi = match self.nvidia_smi {
            Some(v) => v,
            None => {
                let v = nvidia_smi_works().await;
                tracing::debug!(available = v, "nvidia-smi probed");
                self.nvidia_smi = Some(v);
                v
            }
        };

        let mut controllers = if use_nvidia_smi {
            let out = run_tool(NVIDIA_SMI, &[NVIDIA_QUERY, "--format=csv,noheader,nounits"]).await?;
            parse_nvidia_smi(&out)
        } else {
            vec![]
        };

        // NVIDIA cards are covered by nvidia-smi when it runs; skip their sysfs entries.
        let skip_nvidia = !controllers.is_empty();
        let cards = self.cards.clone().unwrap_or_default();
        let first_index = controllers.len() as u32;
        let from_drm = tokio::task::spawn_blocking(move || {
            cards
                .iter()
                .filter(|c| !(skip_nvidia && linux::pci_vendor_name(&c.vendor_id) == "NVIDIA"))
                .enumerate()
                .map(|(i, c)| drm_controller(first_index + i as u32, c))
                .collect::<Vec<_>>()
        })
        .await?;
        controllers.extend(from_drm);

        if controllers.is_empty() {
            return Err(CollectError::unavailable("no GPU detected"));
        }
        Ok(GpuStats { controllers })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_nvidia_smi_rows() {
        let out = "0, NVIDIA GeForce RTX 3080, 550.54.14, 10240, 1024, 37, 54, 112.50, 320.00\n\
                   1, Tesla T4, 550.54.14, 15360, [N/A], [N/A], 40, [Not Supported], 70.00\n";
        let gpus = parse_nvidia_smi(out);
        assert_eq!(gpus.len(), 2);
        assert_eq!(gpus[0].model, "NVIDIA GeForce RTX 3080");
        assert_eq!(gpus[0].memory_total, Some(10240 * MIB));
        assert_eq!(gpus[0].utilization, Some(37.0));
        assert_eq!(gpus[0].memory_usage_percent(), Some(10.0));
        assert_eq!(gpus[1].index, 1);
        assert_eq!(gpus[1].memory_used, None);
        assert_eq!(gpus[1].power_draw, None);
        assert_eq!(gpus[1].power_limit, Some(70.0));
    }

    #[test]
    fn parse_nvidia_smi_ignores_garbage() {
        assert!(parse_nvidia_smi("No devices were found\n").is_empty());
        assert!(parse_nvidia_smi("").is_empty());
    }
}
