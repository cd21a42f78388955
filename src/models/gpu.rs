// GPU models

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{CompositeSnapshot, Domain, DomainSnapshot};
use crate::adapter::Telemetry;

/// One graphics controller. Live metrics are `None` when no vendor tool reports them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GpuController {
    pub index: u32,
    pub vendor: String,
    pub model: String,
    pub driver_version: Option<String>,
    pub memory_total: Option<u64>,
    pub memory_used: Option<u64>,
    pub utilization: Option<f64>,
    pub temperature: Option<f64>,
    pub power_draw: Option<f64>,
    pub power_limit: Option<f64>,
}

impl GpuController {
    pub fn memory_usage_percent(&self) -> Option<f64> {
        match (self.memory_used, self.memory_total) {
            (Some(used), Some(total)) if total > 0 => Some(used as f64 / total as f64 * 100.0),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GpuStats {
    pub controllers: Vec<GpuController>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GpuHistoryEntry {
    pub timestamp: u64,
    pub utilization: f64,
    pub memory_usage_percent: f64,
    pub temperature: f64,
}

impl Telemetry for GpuStats {
    type HistoryEntry = GpuHistoryEntry;

    const DOMAIN: Domain = Domain::Gpu;

    /// History follows the primary (first) controller.
    fn history_entry(&self, timestamp: u64) -> Option<GpuHistoryEntry> {
        let primary = self.controllers.first()?;
        Some(GpuHistoryEntry {
            timestamp,
            utilization: primary.utilization.unwrap_or(0.0),
            memory_usage_percent: primary.memory_usage_percent().unwrap_or(0.0),
            temperature: primary.temperature.unwrap_or(0.0),
        })
    }

    fn place(snapshot: Arc<DomainSnapshot<Self>>, composite: &mut CompositeSnapshot) {
        composite.gpu = Some(snapshot);
    }
}
