// CPU usage via sysinfo; identity is read once and cached

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use sysinfo::{MINIMUM_CPU_UPDATE_INTERVAL, System};
use tracing::instrument;

use super::{linux, lock};
use crate::adapter::SourceAdapter;
use crate::error::CollectError;
use crate::models::{CoreLoad, CpuInfo, CpuStats};

pub struct CpuSource {
    sys: Arc<Mutex<System>>,
    info: Option<CpuInfo>,
    refreshed_at: Instant,
    previous: Option<CpuStats>,
}

impl Default for CpuSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuSource {
    pub fn new() -> Self {
        let mut sys = System::new();
        // Usage is measured between refreshes; this is the baseline for the first collection.
        sys.refresh_cpu_all();
        Self {
            sys: Arc::new(Mutex::new(sys)),
            info: None,
            refreshed_at: Instant::now(),
            previous: None,
        }
    }
}

/// Time left before sysinfo can measure usage again; `None` once the minimum interval has passed.
fn refresh_wait(refreshed_at: Instant, now: Instant) -> Option<Duration> {
    let elapsed = now.saturating_duration_since(refreshed_at);
    MINIMUM_CPU_UPDATE_INTERVAL
        .checked_sub(elapsed)
        .filter(|d| !d.is_zero())
}

#[async_trait]
impl SourceAdapter for CpuSource {
    type Output = CpuStats;

    #[instrument(skip(self), fields(source = "sysinfo", operation = "collect_cpu"))]
    async fn collect(&mut self, budget: Duration) -> Result<CpuStats, CollectError> {
        if let Some(wait) = refresh_wait(self.refreshed_at, Instant::now()) {
            match &self.previous {
                Some(prev) => return Ok(prev.clone()),
                None => tokio::time::sleep(wait.min(budget)).await,
            }
        }

        let sys = self.sys.clone();
        let need_info = self.info.is_none();
        let (mut stats, info) = tokio::task::spawn_blocking(
            move || -> Result<(CpuStats, Option<CpuInfo>), CollectError> {
                let mut sys = lock(&sys, "sysinfo")?;
                sys.refresh_cpu_usage();
                if sys.cpus().is_empty() {
                    return Err(CollectError::unavailable("no CPUs reported"));
                }

                let mut stats = CpuStats::with_usage(sys.global_cpu_usage() as f64);
                stats.cores = sys
                    .cpus()
                    .iter()
                    .map(|c| CoreLoad {
                        usage: (c.cpu_usage() as f64).clamp(0.0, 100.0),
                    })
                    .collect();

                let info = if need_info {
                    sys.refresh_cpu_frequency();
                    let logical = sys.cpus().len() as u32;
                    sys.cpus().first().map(|first| CpuInfo {
                        vendor: first.vendor_id().to_string(),
                        brand: linux::read_cpu_model()
                            .or_else(|| {
                                Some(first.brand().trim().to_string()).filter(|s| !s.is_empty())
                            })
                            .unwrap_or_else(|| "Unknown".into()),
                        physical_cores: System::physical_core_count().unwrap_or(0) as u32,
                        logical_cores: logical,
                        frequency_mhz: first.frequency(),
                    })
                } else {
                    None
                };
                Ok((stats, info))
            },
        )
        .await??;
        self.refreshed_at = Instant::now();

        if info.is_some() {
            self.info = info;
        }
        stats.info = self.info.clone();
        self.previous = Some(stats.clone());
        Ok(stats)
    }
}
