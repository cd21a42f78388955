// Filesystems via sysinfo; block device I/O counters from /proc/diskstats, else sysinfo disk usage

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use sysinfo::Disks;
use tracing::instrument;

use super::linux::{self, DISKSTATS_SECTOR_BYTES};
use super::lock;
use crate::adapter::SourceAdapter;
use crate::error::CollectError;
use crate::models::{DiskIoStat, FilesystemStat, IoRates, StorageStats};

pub struct StorageSource {
    disks: Arc<Mutex<Disks>>,
}

impl Default for StorageSource {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageSource {
    pub fn new() -> Self {
        Self {
            disks: Arc::new(Mutex::new(Disks::new_with_refreshed_list())),
        }
    }
}

fn devices_from_diskstats(counters: Vec<linux::DiskCounters>) -> Vec<DiskIoStat> {
    counters
        .into_iter()
        .map(|c| DiskIoStat {
            name: c.name,
            read_bytes: c.sectors_read.saturating_mul(DISKSTATS_SECTOR_BYTES),
            write_bytes: c.sectors_written.saturating_mul(DISKSTATS_SECTOR_BYTES),
            read_ops: Some(c.reads_completed),
            write_ops: Some(c.writes_completed),
            ..Default::default()
        })
        .collect()
}

/// Per-disk byte counters as sysinfo reports them. Several mounts of one disk
/// collapse to one entry.
fn devices_from_sysinfo(disks: &Disks) -> Vec<DiskIoStat> {
    let mut by_name: BTreeMap<String, DiskIoStat> = BTreeMap::new();
    for d in disks.list() {
        let name = d.name().to_string_lossy().into_owned();
        let usage = d.usage();
        by_name.entry(name.clone()).or_insert_with(|| DiskIoStat {
            name,
            read_bytes: usage.total_read_bytes,
            write_bytes: usage.total_written_bytes,
            ..Default::default()
        });
    }
    by_name.into_values().collect()
}

#[async_trait]
impl SourceAdapter for StorageSource {
    type Output = StorageStats;

    #[instrument(skip(self), fields(source = "sysinfo", operation = "collect_storage"))]
    async fn collect(&mut self, _budget: Duration) -> Result<StorageStats, CollectError> {
        let disks = self.disks.clone();
        tokio::task::spawn_blocking(move || {
            let mut disks = lock(&disks, "sysinfo disks")?;
            disks.refresh(true);

            let filesystems: Vec<FilesystemStat> = disks
                .list()
                .iter()
                .map(|d| {
                    FilesystemStat::new(
                        d.mount_point().to_string_lossy().into_owned(),
                        d.name().to_string_lossy().into_owned(),
                        d.file_system().to_string_lossy().into_owned(),
                        d.total_space(),
                        d.available_space(),
                    )
                })
                .collect();

            let devices = match linux::read_diskstats() {
                Some(counters) => devices_from_diskstats(counters),
                None => devices_from_sysinfo(&disks),
            };

            if filesystems.is_empty() && devices.is_empty() {
                return Err(CollectError::unavailable(
                    "no filesystems or block devices reported",
                ));
            }
            Ok(StorageStats {
                filesystems,
                devices,
                totals: IoRates::default(),
            })
        })
        .await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diskstats_sectors_become_bytes() {
        let devices = devices_from_diskstats(vec![linux::DiskCounters {
            name: "sda".into(),
            reads_completed: 10,
            sectors_read: 4,
            writes_completed: 3,
            sectors_written: 2,
        }]);
        assert_eq!(devices[0].read_bytes, 2048);
        assert_eq!(devices[0].write_bytes, 1024);
        assert_eq!(devices[0].read_ops, Some(10));
        assert_eq!(devices[0].write_ops, Some(3));
        assert_eq!(devices[0].read_rate, 0.0);
    }
}
