// Network interface models

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use super::{CompositeSnapshot, Domain, DomainSnapshot};
use crate::adapter::Telemetry;
use crate::rate::RateTracker;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceStat {
    pub name: String,
    pub mac_address: String,
    pub ipv4: Vec<String>,
    pub ipv6: Vec<String>,
    pub is_up: bool,
    /// Link speed in bits per second, 0 if unknown.
    pub speed: u64,
    pub bytes_recv: u64,
    pub bytes_sent: u64,
    pub packets_recv: u64,
    pub packets_sent: u64,
    /// Receive rate in bytes/sec (computed from the previous collection).
    #[serde(default)]
    pub rx_rate: f64,
    /// Transmit rate in bytes/sec (computed from the previous collection).
    #[serde(default)]
    pub tx_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkTotals {
    pub rx_rate: f64,
    pub tx_rate: f64,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkStats {
    pub interfaces: Vec<InterfaceStat>,
    #[serde(default)]
    pub totals: NetworkTotals,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkHistoryEntry {
    pub timestamp: u64,
    pub rx_rate: f64,
    pub tx_rate: f64,
}

impl Telemetry for NetworkStats {
    type HistoryEntry = NetworkHistoryEntry;

    const DOMAIN: Domain = Domain::Network;

    fn derive_rates(&mut self, rates: &mut RateTracker, at: Instant) {
        let mut totals = NetworkTotals::default();
        for iface in &mut self.interfaces {
            iface.rx_rate = rates
                .observe(&format!("net:{}:rx", iface.name), iface.bytes_recv, at)
                .rate_per_second;
            iface.tx_rate = rates
                .observe(&format!("net:{}:tx", iface.name), iface.bytes_sent, at)
                .rate_per_second;
            totals.rx_rate += iface.rx_rate;
            totals.tx_rate += iface.tx_rate;
            totals.rx_bytes = totals.rx_bytes.saturating_add(iface.bytes_recv);
            totals.tx_bytes = totals.tx_bytes.saturating_add(iface.bytes_sent);
        }
        self.totals = totals;
        rates.sweep();
    }

    fn history_entry(&self, timestamp: u64) -> Option<NetworkHistoryEntry> {
        Some(NetworkHistoryEntry {
            timestamp,
            rx_rate: self.totals.rx_rate,
            tx_rate: self.totals.tx_rate,
        })
    }

    fn place(snapshot: Arc<DomainSnapshot<Self>>, composite: &mut CompositeSnapshot) {
        composite.network = Some(snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn iface(name: &str, rx: u64, tx: u64) -> InterfaceStat {
        InterfaceStat {
            name: name.into(),
            bytes_recv: rx,
            bytes_sent: tx,
            is_up: true,
            ..Default::default()
        }
    }

    #[test]
    fn rates_per_interface_and_totals() {
        let mut tracker = RateTracker::new();
        let t0 = Instant::now();
        let mut a = NetworkStats {
            interfaces: vec![iface("eth0", 1000, 0), iface("lo", 0, 0)],
            ..Default::default()
        };
        a.derive_rates(&mut tracker, t0);
        assert_eq!(a.totals.rx_rate, 0.0);
        assert_eq!(a.totals.rx_bytes, 1000);

        let mut b = NetworkStats {
            interfaces: vec![iface("eth0", 1500, 200), iface("lo", 100, 100)],
            ..Default::default()
        };
        b.derive_rates(&mut tracker, t0 + Duration::from_secs(2));
        assert!((b.interfaces[0].rx_rate - 250.0).abs() < 1e-9);
        assert!((b.totals.rx_rate - 300.0).abs() < 1e-9);
        assert!((b.totals.tx_rate - 150.0).abs() < 1e-9);
    }

    #[test]
    fn counter_reset_does_not_go_negative() {
        let mut tracker = RateTracker::new();
        let t0 = Instant::now();
        let mut a = NetworkStats {
            interfaces: vec![iface("eth0", 5000, 5000)],
            ..Default::default()
        };
        a.derive_rates(&mut tracker, t0);
        let mut b = NetworkStats {
            interfaces: vec![iface("eth0", 10, 10)],
            ..Default::default()
        };
        b.derive_rates(&mut tracker, t0 + Duration::from_secs(1));
        assert_eq!(b.totals.rx_rate, 0.0);
        assert_eq!(b.totals.tx_rate, 0.0);
    }
}
