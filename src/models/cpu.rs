// CPU models

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{CompositeSnapshot, Domain, DomainSnapshot};
use crate::adapter::Telemetry;

/// Static CPU identity; fetched once per adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuInfo {
    pub vendor: String,
    pub brand: String,
    pub physical_cores: u32,
    pub logical_cores: u32,
    pub frequency_mhz: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoreLoad {
    pub usage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuStats {
    /// Overall usage percent (0-100).
    pub usage: f64,
    pub usage_idle: f64,
    pub cores: Vec<CoreLoad>,
    pub info: Option<CpuInfo>,
    pub temperature: Option<f64>,
}

impl CpuStats {
    /// Reading with only the overall usage set.
    pub fn with_usage(usage: f64) -> Self {
        let usage = usage.clamp(0.0, 100.0);
        Self {
            usage,
            usage_idle: 100.0 - usage,
            cores: vec![],
            info: None,
            temperature: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuHistoryEntry {
    pub timestamp: u64,
    pub usage: f64,
    pub cores: Vec<f64>,
}

impl Telemetry for CpuStats {
    type HistoryEntry = CpuHistoryEntry;

    const DOMAIN: Domain = Domain::Cpu;

    fn history_entry(&self, timestamp: u64) -> Option<CpuHistoryEntry> {
        Some(CpuHistoryEntry {
            timestamp,
            usage: self.usage,
            cores: self.cores.iter().map(|c| c.usage).collect(),
        })
    }

    fn place(snapshot: Arc<DomainSnapshot<Self>>, composite: &mut CompositeSnapshot) {
        composite.cpu = Some(snapshot);
    }
}
