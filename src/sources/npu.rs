// NPUs: /sys/class/accel or lspci on Linux, the Neural Engine on Apple silicon.
// Detection runs once; only the busy-time counter is read on later collections.

use async_trait::async_trait;
use std::time::Duration;
use tracing::instrument;

use super::linux::{self, AccelDevice};
use super::run_tool;
use crate::adapter::SourceAdapter;
use crate::error::CollectError;
use crate::models::{NpuDevice, NpuStats, NpuVendor};

#[derive(Debug, Clone)]
struct Detected {
    device: NpuDevice,
    accel: Option<AccelDevice>,
}

#[derive(Default)]
pub struct NpuSource {
    detected: Option<Vec<Detected>>,
}

impl NpuSource {
    pub fn new() -> Self {
        Self::default()
    }
}

fn accel_name(accel: &AccelDevice) -> (NpuVendor, String) {
    let hint = match (&accel.driver, &accel.vendor_id) {
        (Some(driver), _) => driver.clone(),
        (None, Some(vendor_id)) => linux::pci_vendor_name(vendor_id).to_string(),
        (None, None) => String::new(),
    };
    let vendor = NpuVendor::from_description(&hint);
    let label = match vendor {
        NpuVendor::Intel => "Intel NPU",
        NpuVendor::Amd => "AMD XDNA NPU",
        NpuVendor::Qualcomm => "Qualcomm Hexagon NPU",
        _ => "NPU",
    };
    (vendor, format!("{} ({})", label, accel.node))
}

/// NPU-looking devices in `lspci` output.
fn parse_lspci(output: &str) -> Vec<NpuDevice> {
    output
        .lines()
        .filter(|line| {
            let l = line.to_lowercase();
            l.contains("neural") || l.contains(" npu") || l.contains("processing accelerators")
        })
        .map(|line| {
            let desc = line.splitn(2, ": ").nth(1).unwrap_or(line).trim();
            NpuDevice::detected(NpuVendor::from_description(desc), desc)
        })
        .collect()
}

async fn detect() -> Result<Vec<Detected>, CollectError> {
    let accel = tokio::task::spawn_blocking(linux::accel_devices).await?;
    if !accel.is_empty() {
        return Ok(accel
            .into_iter()
            .map(|a| {
                let (vendor, name) = accel_name(&a);
                Detected {
                    device: NpuDevice::detected(vendor, name),
                    accel: Some(a),
                }
            })
            .collect());
    }

    if cfg!(target_os = "linux") {
        // lspci may be missing; that only means nothing was found this way.
        if let Ok(out) = run_tool("lspci", &[]).await {
            return Ok(parse_lspci(&out)
                .into_iter()
                .map(|device| Detected {
                    device,
                    accel: None,
                })
                .collect());
        }
    }

    if cfg!(target_os = "macos")
        && let Ok(brand) = run_tool("sysctl", &["-n", "machdep.cpu.brand_string"]).await
        && brand.trim().starts_with("Apple")
    {
        return Ok(vec![Detected {
            device: NpuDevice::detected(
                NpuVendor::Apple,
                format!("{} Neural Engine", brand.trim()),
            ),
            accel: None,
        }]);
    }

    Ok(vec![])
}

#[async_trait]
impl SourceAdapter for NpuSource {
    type Output = NpuStats;

    #[instrument(skip(self), fields(source = "npu", operation = "collect_npu"))]
    async fn collect(&mut self, _budget: Duration) -> Result<NpuStats, CollectError> {
        let detected = match &self.detected {
            Some(d) => d.clone(),
            None => {
                let d = detect().await?;
                tracing::info!(devices = d.len(), "npu detection finished");
                self.detected = Some(d.clone());
                d
            }
        };
        if detected.is_empty() {
            return Err(CollectError::unavailable("no NPU detected"));
        }

        let devices = tokio::task::spawn_blocking(move || {
            detected
                .into_iter()
                .map(|d| {
                    let mut device = d.device;
                    device.busy_time_us = d.accel.as_ref().and_then(AccelDevice::busy_time_us);
                    device
                })
                .collect::<Vec<_>>()
        })
        .await?;
        Ok(NpuStats { devices })
    }
}
