// Network interfaces via sysinfo; link state and speed from sysfs

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use sysinfo::Networks;
use tracing::instrument;

use super::{linux, lock};
use crate::adapter::SourceAdapter;
use crate::error::CollectError;
use crate::models::{InterfaceStat, NetworkStats, NetworkTotals};

pub struct NetworkSource {
    networks: Arc<Mutex<Networks>>,
}

impl Default for NetworkSource {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkSource {
    pub fn new() -> Self {
        Self {
            networks: Arc::new(Mutex::new(Networks::new_with_refreshed_list())),
        }
    }
}

#[async_trait]
impl SourceAdapter for NetworkSource {
    type Output = NetworkStats;

    #[instrument(skip(self), fields(source = "sysinfo", operation = "collect_network"))]
    async fn collect(&mut self, _budget: Duration) -> Result<NetworkStats, CollectError> {
        let networks = self.networks.clone();
        tokio::task::spawn_blocking(move || {
            let mut networks = lock(&networks, "sysinfo networks")?;
            networks.refresh(true);

            let mut interfaces: Vec<InterfaceStat> = networks
                .list()
                .iter()
                .map(|(name, data)| InterfaceStat {
                    name: name.clone(),
                    mac_address: data.mac_address().to_string(),
                    ipv4: data
                        .ip_networks()
                        .iter()
                        .filter(|n| n.addr.is_ipv4())
                        .map(|n| n.addr.to_string())
                        .collect(),
                    ipv6: data
                        .ip_networks()
                        .iter()
                        .filter(|n| n.addr.is_ipv6())
                        .map(|n| n.addr.to_string())
                        .collect(),
                    is_up: linux::interface_is_up(name).unwrap_or(true),
                    speed: linux::interface_speed(name),
                    bytes_recv: data.total_received(),
                    bytes_sent: data.total_transmitted(),
                    packets_recv: data.total_packets_received(),
                    packets_sent: data.total_packets_transmitted(),
                    ..Default::default()
                })
                .collect();

            if interfaces.is_empty() {
                return Err(CollectError::unavailable("no network interfaces reported"));
            }
            interfaces.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(NetworkStats {
                interfaces,
                totals: NetworkTotals::default(),
            })
        })
        .await?
    }
}
