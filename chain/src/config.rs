//! Top-level configuration for a ledger node.
//!
//! This module aggregates configuration for:
//!
//! - consensus parameters (`ConsensusConfig`),
//! - peer discovery and chain sync (`NetworkConfig`),
//! - storage (RocksDB path and creation flags),
//! - metrics exporter (enable flag + listen address).
//!
//! Binaries construct a `NodeConfig` from defaults and override individual
//! fields from the environment as needed.

use std::net::SocketAddr;
use std::time::Duration;

use crate::consensus::ConsensusConfig;
use crate::params::{DEFAULT_PEER_PORT, RESYNC_INTERVAL_SECS};
use crate::storage::RocksDbConfig;

/// Bounds applied to [`NetworkConfig::target_peers`].
pub const MIN_TARGET_PEERS: usize = 2;
pub const MAX_TARGET_PEERS: usize = 5;

/// Peer discovery, relay and sync settings.
#[derive(Clone, Debug)]
pub struct NetworkConfig {
    /// Base URL of the bootstrap relay, e.g. `"http://127.0.0.1:10011/api/v1"`.
    pub relay_url: String,
    /// URL answering with this node's public IP as plain text.
    pub ip_lookup_url: String,
    /// Fixed address to advertise instead of asking `ip_lookup_url`.
    pub advertise_ip: Option<String>,
    /// Port every peer serves the sync protocol on.
    pub peer_port: u16,
    /// Number of peers discovery tries to reach (clamped to 2..=5).
    pub target_peers: usize,
    /// Maximum relay queries per discovery round.
    pub discovery_attempts: usize,
    /// Reject relay answers that are not IP addresses.
    pub validate_ips: bool,
    /// Timeout applied to every outbound HTTP call.
    pub request_timeout: Duration,
    /// Pause between periodic resync rounds.
    pub resync_interval: Duration,
}

impl NetworkConfig {
    /// `target_peers` clamped to the supported range.
    pub fn effective_target_peers(&self) -> usize {
        self.target_peers.clamp(MIN_TARGET_PEERS, MAX_TARGET_PEERS)
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            relay_url: "http://127.0.0.1:10011/api/v1".to_string(),
            ip_lookup_url: "https://api.ipify.org?format=text".to_string(),
            advertise_ip: None,
            peer_port: DEFAULT_PEER_PORT,
            target_peers: MIN_TARGET_PEERS,
            discovery_attempts: 100,
            validate_ips: true,
            request_timeout: Duration::from_secs(5),
            resync_interval: Duration::from_secs(RESYNC_INTERVAL_SECS),
        }
    }
}

/// Configuration for the Prometheus metrics exporter.
#[derive(Clone, Debug)]
pub struct MetricsConfig {
    /// Whether to run a `/metrics` HTTP exporter.
    pub enabled: bool,
    /// Address to bind the metrics HTTP server to.
    pub listen_addr: SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        let addr: SocketAddr = "127.0.0.1:9898"
            .parse()
            .expect("hard-coded metrics listen address should parse");
        Self {
            enabled: true,
            listen_addr: addr,
        }
    }
}

/// Top-level configuration for a ledger node.
#[derive(Clone, Debug, Default)]
pub struct NodeConfig {
    pub consensus: ConsensusConfig,
    pub network: NetworkConfig,
    pub storage: RocksDbConfig,
    pub metrics: MetricsConfig,
}
