// NPU models. A detected NPU may expose no metrics; that is still "present".

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use super::{CompositeSnapshot, Domain, DomainSnapshot};
use crate::adapter::Telemetry;
use crate::rate::RateTracker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NpuVendor {
    Intel,
    Amd,
    Apple,
    Qualcomm,
    #[serde(other)]
    Other,
}

impl NpuVendor {
    /// Best-effort vendor guess from a device or driver description.
    pub fn from_description(s: &str) -> Self {
        let s = s.to_lowercase();
        if s.contains("intel") || s.contains("ivpu") || s.contains("vpu") {
            NpuVendor::Intel
        } else if s.contains("amd") || s.contains("xdna") {
            NpuVendor::Amd
        } else if s.contains("apple") || s.contains("neural engine") {
            NpuVendor::Apple
        } else if s.contains("qualcomm") || s.contains("hexagon") {
            NpuVendor::Qualcomm
        } else {
            NpuVendor::Other
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NpuDevice {
    pub vendor: NpuVendor,
    pub name: String,
    /// Cumulative busy time in microseconds, when the driver exposes it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub busy_time_us: Option<u64>,
    pub utilization: Option<f64>,
    pub power: Option<f64>,
    pub temperature: Option<f64>,
}

impl NpuDevice {
    /// Device that is detected but reports no live metrics.
    pub fn detected(vendor: NpuVendor, name: impl Into<String>) -> Self {
        Self {
            vendor,
            name: name.into(),
            busy_time_us: None,
            utilization: None,
            power: None,
            temperature: None,
        }
    }

    pub fn has_metrics(&self) -> bool {
        self.utilization.is_some() || self.power.is_some() || self.temperature.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NpuStats {
    pub devices: Vec<NpuDevice>,
}

impl NpuStats {
    pub fn metrics_available(&self) -> bool {
        self.devices.iter().any(NpuDevice::has_metrics)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NpuHistoryEntry {
    pub timestamp: u64,
    pub utilization: f64,
    pub power: f64,
    pub temperature: f64,
}

impl Telemetry for NpuStats {
    type HistoryEntry = NpuHistoryEntry;

    const DOMAIN: Domain = Domain::Npu;

    /// Busy microseconds per second / 10^4 is percent busy.
    fn derive_rates(&mut self, rates: &mut RateTracker, at: Instant) {
        for device in &mut self.devices {
            if let Some(busy) = device.busy_time_us {
                let key = format!("npu:{}:busy", device.name);
                let rate = rates.observe(&key, busy, at).rate_per_second;
                device.utilization = Some((rate / 10_000.0).clamp(0.0, 100.0));
            }
        }
        rates.sweep();
    }

    fn history_entry(&self, timestamp: u64) -> Option<NpuHistoryEntry> {
        let primary = self.devices.iter().find(|d| d.has_metrics())?;
        Some(NpuHistoryEntry {
            timestamp,
            utilization: primary.utilization.unwrap_or(0.0),
            power: primary.power.unwrap_or(0.0),
            temperature: primary.temperature.unwrap_or(0.0),
        })
    }

    fn place(snapshot: Arc<DomainSnapshot<Self>>, composite: &mut CompositeSnapshot) {
        composite.npu = Some(snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vendor_from_description() {
        assert_eq!(
            NpuVendor::from_description("Intel Corporation Meteor Lake NPU"),
            NpuVendor::Intel
        );
        assert_eq!(NpuVendor::from_description("amdxdna"), NpuVendor::Amd);
        assert_eq!(NpuVendor::from_description("Apple M2"), NpuVendor::Apple);
        assert_eq!(NpuVendor::from_description("mystery"), NpuVendor::Other);
    }

    #[test]
    fn detected_without_metrics_has_no_history() {
        let stats = NpuStats {
            devices: vec![NpuDevice::detected(NpuVendor::Intel, "NPU")],
        };
        assert!(!stats.metrics_available());
        assert!(stats.history_entry(1).is_none());
    }

    #[test]
    fn utilization_from_busy_time() {
        let mut rates = RateTracker::new();
        let t0 = Instant::now();
        let mut device = NpuDevice::detected(NpuVendor::Intel, "accel0");
        device.busy_time_us = Some(1_000_000);
        let mut stats = NpuStats {
            devices: vec![device],
        };
        stats.derive_rates(&mut rates, t0);
        assert_eq!(stats.devices[0].utilization, Some(0.0));

        stats.devices[0].busy_time_us = Some(1_250_000);
        stats.derive_rates(&mut rates, t0 + std::time::Duration::from_secs(1));
        assert_eq!(stats.devices[0].utilization, Some(25.0));
        assert!(stats.metrics_available());
    }
}
