// Memory and swap via sysinfo

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use sysinfo::System;
use tracing::instrument;

use super::lock;
use crate::adapter::SourceAdapter;
use crate::error::CollectError;
use crate::models::MemoryStats;

pub struct MemorySource {
    sys: Arc<Mutex<System>>,
}

impl Default for MemorySource {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySource {
    pub fn new() -> Self {
        Self {
            sys: Arc::new(Mutex::new(System::new())),
        }
    }
}

#[async_trait]
impl SourceAdapter for MemorySource {
    type Output = MemoryStats;

    #[instrument(skip(self), fields(source = "sysinfo", operation = "collect_memory"))]
    async fn collect(&mut self, _budget: Duration) -> Result<MemoryStats, CollectError> {
        let sys = self.sys.clone();
        tokio::task::spawn_blocking(move || {
            let mut sys = lock(&sys, "sysinfo")?;
            sys.refresh_memory();

            let total = sys.total_memory();
            if total == 0 {
                return Err(CollectError::transient("memory totals not reported"));
            }
            Ok(MemoryStats::from_totals(
                total,
                sys.available_memory(),
                sys.free_memory(),
                sys.total_swap(),
                sys.used_swap(),
            ))
        })
        .await?
    }
}
