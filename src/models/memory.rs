// Memory models

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{CompositeSnapshot, Domain, DomainSnapshot};
use crate::adapter::Telemetry;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryStats {
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub available: u64,
    pub usage_percent: f64,
    pub available_percent: f64,
    pub swap_total: u64,
    pub swap_used: u64,
    pub swap_free: u64,
}

fn percent(part: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    ((part as f64 / total as f64) * 10_000.0).round() / 100.0
}

impl MemoryStats {
    /// Derives `used` and the percentages from the raw totals.
    pub fn from_totals(
        total: u64,
        available: u64,
        free: u64,
        swap_total: u64,
        swap_used: u64,
    ) -> Self {
        let used = total.saturating_sub(available);
        Self {
            total,
            used,
            free,
            available,
            usage_percent: percent(used, total),
            available_percent: percent(available, total),
            swap_total,
            swap_used,
            swap_free: swap_total.saturating_sub(swap_used),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryHistoryEntry {
    pub timestamp: u64,
    pub usage_percent: f64,
    pub used: u64,
    pub available: u64,
}

impl Telemetry for MemoryStats {
    type HistoryEntry = MemoryHistoryEntry;

    const DOMAIN: Domain = Domain::Memory;

    fn history_entry(&self, timestamp: u64) -> Option<MemoryHistoryEntry> {
        Some(MemoryHistoryEntry {
            timestamp,
            usage_percent: self.usage_percent,
            used: self.used,
            available: self.available,
        })
    }

    fn place(snapshot: Arc<DomainSnapshot<Self>>, composite: &mut CompositeSnapshot) {
        composite.memory = Some(snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_totals_computes_percentages() {
        let m = MemoryStats::from_totals(1000, 250, 100, 0, 0);
        assert_eq!(m.used, 750);
        assert_eq!(m.usage_percent, 75.0);
        assert_eq!(m.available_percent, 25.0);
    }

    #[test]
    fn zero_total_is_zero_percent() {
        let m = MemoryStats::from_totals(0, 0, 0, 0, 0);
        assert_eq!(m.usage_percent, 0.0);
    }
}
