// Motherboard identity from DMI plus sysinfo temperature sensors, served from a short-lived cache

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use sysinfo::Components;
use tokio::time::Instant;
use tracing::instrument;

use super::{linux, lock};
use crate::adapter::SourceAdapter;
use crate::error::CollectError;
use crate::models::{
    BiosInfo, BoardInfo, ChassisInfo, MotherboardStats, ProductInfo, SensorReading,
};

pub struct MotherboardSource {
    ttl: Duration,
    components: Arc<Mutex<Components>>,
    cached: Option<(Instant, MotherboardStats)>,
}

impl MotherboardSource {
    /// `ttl`: how long a reading is reused before DMI and sensors are read again.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            components: Arc::new(Mutex::new(Components::new_with_refreshed_list())),
            cached: None,
        }
    }

    /// The cached reading while it is younger than the TTL. Age counts from the
    /// start of the collection that produced it.
    fn fresh_cached(&self) -> Option<MotherboardStats> {
        self.cached
            .as_ref()
            .filter(|(at, _)| at.elapsed() < self.ttl)
            .map(|(_, stats)| stats.clone())
    }
}

/// SMBIOS chassis type code to name.
fn chassis_type_name(code: &str) -> String {
    let name = match code.trim().parse::<u32>().unwrap_or(0) {
        3 => "Desktop",
        4 => "Low Profile Desktop",
        6 => "Mini Tower",
        7 => "Tower",
        8 => "Portable",
        9 => "Laptop",
        10 => "Notebook",
        13 => "All in One",
        14 => "Sub Notebook",
        17 => "Main Server Chassis",
        23 => "Rack Mount Chassis",
        30 => "Tablet",
        31 => "Convertible",
        32 => "Detachable",
        35 => "Mini PC",
        36 => "Stick PC",
        _ => "Other",
    };
    name.to_string()
}

fn dmi(field: &str) -> String {
    linux::read_dmi(field).unwrap_or_default()
}

fn read_identity() -> MotherboardStats {
    MotherboardStats {
        board: BoardInfo {
            manufacturer: dmi("board_vendor"),
            model: dmi("board_name"),
            version: dmi("board_version"),
            serial: linux::read_dmi("board_serial"),
            asset_tag: linux::read_dmi("board_asset_tag"),
        },
        bios: BiosInfo {
            vendor: dmi("bios_vendor"),
            version: dmi("bios_version"),
            release_date: dmi("bios_date"),
        },
        system: ProductInfo {
            manufacturer: dmi("sys_vendor"),
            model: dmi("product_name"),
            version: dmi("product_version"),
        },
        chassis: ChassisInfo {
            manufacturer: dmi("chassis_vendor"),
            type_: linux::read_dmi("chassis_type")
                .map(|c| chassis_type_name(&c))
                .unwrap_or_default(),
        },
        ..Default::default()
    }
}

fn has_content(stats: &MotherboardStats) -> bool {
    !stats.board.manufacturer.is_empty()
        || !stats.board.model.is_empty()
        || !stats.bios.vendor.is_empty()
        || !stats.system.manufacturer.is_empty()
        || !stats.sensors.is_empty()
}

fn epoch_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[async_trait]
impl SourceAdapter for MotherboardSource {
    type Output = MotherboardStats;

    #[instrument(skip(self), fields(source = "dmi", operation = "collect_motherboard"))]
    async fn collect(&mut self, _budget: Duration) -> Result<MotherboardStats, CollectError> {
        if let Some(stats) = self.fresh_cached() {
            return Ok(stats);
        }

        let started = Instant::now();
        let components = self.components.clone();
        let stats = tokio::task::spawn_blocking(move || {
            let mut stats = read_identity();
            let mut components = lock(&components, "sysinfo components")?;
            components.refresh(true);
            stats.sensors = components
                .list()
                .iter()
                .filter_map(|c| {
                    Some(SensorReading {
                        label: c.label().to_string(),
                        temperature: c.temperature()? as f64,
                        critical: c.critical().map(|v| v as f64),
                    })
                })
                .collect();
            stats.refreshed_at = epoch_ms();
            Ok::<_, CollectError>(stats)
        })
        .await??;

        if !has_content(&stats) {
            return Err(CollectError::unavailable(
                "no motherboard information exposed",
            ));
        }
        self.cached = Some((started, stats.clone()));
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chassis_codes() {
        assert_eq!(chassis_type_name("3"), "Desktop");
        assert_eq!(chassis_type_name("10\n"), "Notebook");
        assert_eq!(chassis_type_name("junk"), "Other");
    }

    #[test]
    fn empty_identity_has_no_content() {
        assert!(!has_content(&MotherboardStats::default()));
        let mut stats = MotherboardStats::default();
        stats.bios.vendor = "American Megatrends".into();
        assert!(has_content(&stats));
    }

    #[tokio::test(start_paused = true)]
    async fn cache_expires_one_ttl_after_collection_start() {
        let ttl = Duration::from_secs(10);
        let mut source = MotherboardSource::new(ttl);
        let mut stats = MotherboardStats::default();
        stats.bios.vendor = "American Megatrends".into();
        source.cached = Some((Instant::now(), stats));

        tokio::time::advance(ttl - Duration::from_millis(1)).await;
        assert!(source.fresh_cached().is_some());
        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(source.fresh_cached().is_none());
    }
}
