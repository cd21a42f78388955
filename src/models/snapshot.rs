// Per-domain snapshot and the composite published on every tick

use serde::Serialize;
use std::sync::Arc;

use super::{
    CpuStats, Domain, GpuStats, MemoryStats, MotherboardStats, NetworkStats, NpuStats,
    StorageStats,
};
use crate::adapter::Telemetry;
use crate::error::{CollectError, ErrorKind};

/// Why a domain's values are stale.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainError {
    pub kind: ErrorKind,
    pub message: String,
    /// Timestamp (epoch ms) of the first failure in the current streak.
    pub since: u64,
    pub consecutive_failures: u32,
}

/// One domain's readings, derived rates (inside `data`) and bounded history.
///
/// Never mutated after construction: a failure produces a shallow copy with
/// `error` set, so readers can hold on to an `Arc` without locking.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase", bound(serialize = ""))]
pub struct DomainSnapshot<T: Telemetry> {
    pub domain: Domain,
    /// Epoch ms of the collection these values came from.
    pub timestamp: u64,
    /// False when the hardware is not present on this host.
    pub available: bool,
    pub data: Option<Arc<T>>,
    pub history: Arc<[T::HistoryEntry]>,
    pub error: Option<DomainError>,
}

impl<T: Telemetry> DomainSnapshot<T> {
    pub fn present(data: T, history: Arc<[T::HistoryEntry]>, timestamp: u64) -> Self {
        Self {
            domain: T::DOMAIN,
            timestamp,
            available: true,
            data: Some(Arc::new(data)),
            history,
            error: None,
        }
    }

    pub fn not_present(history: Arc<[T::HistoryEntry]>, timestamp: u64) -> Self {
        Self {
            domain: T::DOMAIN,
            timestamp,
            available: false,
            data: None,
            history,
            error: None,
        }
    }

    /// Copy of `self` (last-known-good) flagged with a failure observed at `now`.
    pub fn with_failure(&self, err: &CollectError, now: u64) -> Self {
        let (since, consecutive_failures) = match &self.error {
            Some(prev) => (prev.since, prev.consecutive_failures.saturating_add(1)),
            None => (now, 1),
        };
        Self {
            error: Some(DomainError {
                kind: err.kind,
                message: err.message.clone(),
                since,
                consecutive_failures,
            }),
            ..self.clone()
        }
    }

    pub fn is_stale(&self) -> bool {
        self.error.is_some()
    }
}

/// Latest value of every domain, assembled fresh on each tick.
///
/// A field is `None` until its domain first reports; after that it stays `Some`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeSnapshot {
    pub timestamp: u64,
    pub cpu: Option<Arc<DomainSnapshot<CpuStats>>>,
    pub memory: Option<Arc<DomainSnapshot<MemoryStats>>>,
    pub gpu: Option<Arc<DomainSnapshot<GpuStats>>>,
    pub storage: Option<Arc<DomainSnapshot<StorageStats>>>,
    pub network: Option<Arc<DomainSnapshot<NetworkStats>>>,
    pub npu: Option<Arc<DomainSnapshot<NpuStats>>>,
    pub motherboard: Option<Arc<DomainSnapshot<MotherboardStats>>>,
}

/// (populated, available, error, collected-at) of a domain field, type-erased.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DomainStatus<'a> {
    pub populated: bool,
    pub available: bool,
    pub error: Option<&'a DomainError>,
    pub timestamp: Option<u64>,
}

fn status_of<T: Telemetry>(slot: &Option<Arc<DomainSnapshot<T>>>) -> DomainStatus<'_> {
    match slot {
        Some(s) => DomainStatus {
            populated: true,
            available: s.available,
            error: s.error.as_ref(),
            timestamp: Some(s.timestamp),
        },
        None => DomainStatus {
            populated: false,
            available: false,
            error: None,
            timestamp: None,
        },
    }
}

impl CompositeSnapshot {
    pub fn empty(timestamp: u64) -> Self {
        Self {
            timestamp,
            ..Default::default()
        }
    }

    pub fn status(&self, domain: Domain) -> DomainStatus<'_> {
        match domain {
            Domain::Cpu => status_of(&self.cpu),
            Domain::Memory => status_of(&self.memory),
            Domain::Gpu => status_of(&self.gpu),
            Domain::Storage => status_of(&self.storage),
            Domain::Network => status_of(&self.network),
            Domain::Npu => status_of(&self.npu),
            Domain::Motherboard => status_of(&self.motherboard),
        }
    }

    pub fn is_populated(&self, domain: Domain) -> bool {
        self.status(domain).populated
    }

    /// Domains currently serving last-known-good values.
    pub fn stale_domains(&self) -> Vec<Domain> {
        Domain::ALL
            .into_iter()
            .filter(|d| self.status(*d).error.is_some())
            .collect()
    }
}
