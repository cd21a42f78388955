// Motherboard, BIOS, product and chassis identity plus temperature sensors

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{CompositeSnapshot, Domain, DomainSnapshot};
use crate::adapter::Telemetry;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardInfo {
    pub manufacturer: String,
    pub model: String,
    pub version: String,
    pub serial: Option<String>,
    pub asset_tag: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BiosInfo {
    pub vendor: String,
    pub version: String,
    pub release_date: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInfo {
    pub manufacturer: String,
    pub model: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChassisInfo {
    pub manufacturer: String,
    #[serde(rename = "type")]
    pub type_: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorReading {
    pub label: String,
    pub temperature: f64,
    pub critical: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MotherboardStats {
    pub board: BoardInfo,
    pub bios: BiosInfo,
    pub system: ProductInfo,
    pub chassis: ChassisInfo,
    pub sensors: Vec<SensorReading>,
    /// Epoch ms when the adapter last refreshed (rather than served from cache).
    pub refreshed_at: u64,
}

impl Telemetry for MotherboardStats {
    /// Identity data is not charted.
    type HistoryEntry = ();

    const DOMAIN: Domain = Domain::Motherboard;

    fn history_entry(&self, _timestamp: u64) -> Option<()> {
        None
    }

    fn place(snapshot: Arc<DomainSnapshot<Self>>, composite: &mut CompositeSnapshot) {
        composite.motherboard = Some(snapshot);
    }
}
