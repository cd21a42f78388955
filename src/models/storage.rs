// Storage models: filesystems and per-device I/O counters/rates

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use super::{CompositeSnapshot, Domain, DomainSnapshot};
use crate::adapter::Telemetry;
use crate::rate::RateTracker;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilesystemStat {
    pub mount: String,
    pub name: String,
    pub fs_type: String,
    pub total: u64,
    pub used: u64,
    pub available: u64,
    pub usage_percent: f64,
}

impl FilesystemStat {
    pub fn new(mount: String, name: String, fs_type: String, total: u64, available: u64) -> Self {
        let used = total.saturating_sub(available);
        let usage_percent = if total > 0 {
            ((used as f64 / total as f64) * 10_000.0).round() / 100.0
        } else {
            0.0
        };
        Self {
            mount,
            name,
            fs_type,
            total,
            used,
            available,
            usage_percent,
        }
    }
}

/// Cumulative I/O counters of one device, plus rates derived between collections.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskIoStat {
    pub name: String,
    pub read_bytes: u64,
    pub write_bytes: u64,
    /// Completed read operations, when the platform reports them.
    pub read_ops: Option<u64>,
    pub write_ops: Option<u64>,
    #[serde(default)]
    pub read_rate: f64,
    #[serde(default)]
    pub write_rate: f64,
    #[serde(default)]
    pub read_iops: f64,
    #[serde(default)]
    pub write_iops: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IoRates {
    pub read: f64,
    pub write: f64,
    pub read_iops: f64,
    pub write_iops: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageStats {
    pub filesystems: Vec<FilesystemStat>,
    pub devices: Vec<DiskIoStat>,
    #[serde(default)]
    pub totals: IoRates,
}

impl StorageStats {
    /// Mean usage percent across filesystems (0 when there are none).
    pub fn mean_usage_percent(&self) -> f64 {
        if self.filesystems.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.filesystems.iter().map(|f| f.usage_percent).sum();
        sum / self.filesystems.len() as f64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageHistoryEntry {
    pub timestamp: u64,
    pub read_rate: f64,
    pub write_rate: f64,
    pub total_usage: f64,
}

impl Telemetry for StorageStats {
    type HistoryEntry = StorageHistoryEntry;

    const DOMAIN: Domain = Domain::Storage;

    fn derive_rates(&mut self, rates: &mut RateTracker, at: Instant) {
        let mut totals = IoRates::default();
        for dev in &mut self.devices {
            dev.read_rate = rates
                .observe(&format!("disk:{}:read", dev.name), dev.read_bytes, at)
                .rate_per_second;
            dev.write_rate = rates
                .observe(&format!("disk:{}:write", dev.name), dev.write_bytes, at)
                .rate_per_second;
            if let Some(ops) = dev.read_ops {
                dev.read_iops = rates
                    .observe(&format!("disk:{}:rops", dev.name), ops, at)
                    .rate_per_second;
            }
            if let Some(ops) = dev.write_ops {
                dev.write_iops = rates
                    .observe(&format!("disk:{}:wops", dev.name), ops, at)
                    .rate_per_second;
            }
            totals.read += dev.read_rate;
            totals.write += dev.write_rate;
            totals.read_iops += dev.read_iops;
            totals.write_iops += dev.write_iops;
        }
        self.totals = totals;
        rates.sweep();
    }

    fn history_entry(&self, timestamp: u64) -> Option<StorageHistoryEntry> {
        Some(StorageHistoryEntry {
            timestamp,
            read_rate: self.totals.read,
            write_rate: self.totals.write,
            total_usage: self.mean_usage_percent(),
        })
    }

    fn place(snapshot: Arc<DomainSnapshot<Self>>, composite: &mut CompositeSnapshot) {
        composite.storage = Some(snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn device(name: &str, read: u64, write: u64) -> DiskIoStat {
        DiskIoStat {
            name: name.into(),
            read_bytes: read,
            write_bytes: write,
            read_ops: Some(read / 512),
            write_ops: None,
            ..Default::default()
        }
    }

    #[test]
    fn derive_rates_sums_devices() {
        let mut tracker = RateTracker::new();
        let t0 = Instant::now();
        let mut first = StorageStats {
            devices: vec![device("sda", 0, 0), device("sdb", 0, 0)],
            ..Default::default()
        };
        first.derive_rates(&mut tracker, t0);
        assert_eq!(first.totals, IoRates::default());

        let mut second = StorageStats {
            devices: vec![device("sda", 4096, 1024), device("sdb", 2048, 0)],
            ..Default::default()
        };
        second.derive_rates(&mut tracker, t0 + Duration::from_secs(2));
        assert!((second.totals.read - 3072.0).abs() < 1e-9);
        assert!((second.totals.write - 512.0).abs() < 1e-9);
        assert!((second.devices[0].read_iops - 4.0).abs() < 1e-9);
        assert_eq!(second.devices[0].write_iops, 0.0);
    }

    #[test]
    fn vanished_devices_are_forgotten() {
        let mut tracker = RateTracker::new();
        let t0 = Instant::now();
        let mut s = StorageStats {
            devices: vec![device("sda", 0, 0), device("sdb", 0, 0)],
            ..Default::default()
        };
        s.derive_rates(&mut tracker, t0);
        assert_eq!(tracker.stream_count(), 6);
        let mut s = StorageStats {
            devices: vec![device("sda", 0, 0)],
            ..Default::default()
        };
        s.derive_rates(&mut tracker, t0 + Duration::from_secs(1));
        assert_eq!(tracker.stream_count(), 3);
    }

    #[test]
    fn mean_usage_over_filesystems() {
        let s = StorageStats {
            filesystems: vec![
                FilesystemStat::new("/".into(), "sda1".into(), "ext4".into(), 100, 50),
                FilesystemStat::new("/home".into(), "sda2".into(), "ext4".into(), 100, 0),
            ],
            ..Default::default()
        };
        assert_eq!(s.mean_usage_percent(), 75.0);
    }
}
