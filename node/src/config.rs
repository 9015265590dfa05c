//! Node binary configuration.
//!
//! Everything has a default; a handful of `PRISM_*` environment variables
//! override individual fields:
//!
//! | Variable              | Effect                                         |
//! |-----------------------|------------------------------------------------|
//! | `PRISM_LISTEN_ADDR`   | HTTP bind address; its port is the peer port   |
//! | `PRISM_MINER_KEY`     | hex private key of the miner identity          |
//! | `PRISM_AUTO_MINE`     | `false` to skip starting the periodic miner    |
//! | `PRISM_DB_PATH`       | RocksDB directory                              |
//! | `PRISM_RELAY_URL`     | bootstrap relay base URL                       |
//! | `PRISM_ADVERTISE_IP`  | address to register instead of a lookup        |
//! | `PRISM_METRICS_ADDR`  | Prometheus exporter bind address               |
//! | `PRISM_MAX_BODY_BYTES`| largest accepted request body, in bytes        |

use std::net::SocketAddr;

use prism_chain::NodeConfig;
use prism_chain::params::DEFAULT_PEER_PORT;

/// Default request body limit. `POST /sync` carries a whole chain
/// snapshot, which outgrows axum's 2 MB default as the chain grows.
pub const DEFAULT_MAX_BODY_BYTES: usize = 256 * 1024 * 1024;

/// Configuration for the node's HTTP server and identity.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP server to.
    pub listen_addr: SocketAddr,
    /// Hex private key of the miner; a fresh key pair is generated if unset.
    pub miner_key: Option<String>,
    /// Start the periodic miner at boot.
    pub auto_mine: bool,
    /// Largest request body the HTTP server accepts.
    pub max_body_bytes: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PEER_PORT)),
            miner_key: None,
            auto_mine: true,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/// Reads both configs from the process environment.
pub fn from_env() -> Result<(ApiConfig, NodeConfig), String> {
    from_lookup(|key| std::env::var(key).ok())
}

fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<(ApiConfig, NodeConfig), String> {
    let mut api = ApiConfig::default();
    let mut node = NodeConfig::default();

    if let Some(addr) = get("PRISM_LISTEN_ADDR") {
        api.listen_addr = addr
            .parse()
            .map_err(|e| format!("PRISM_LISTEN_ADDR {addr:?} is not a socket address: {e}"))?;
    }
    api.miner_key = get("PRISM_MINER_KEY").filter(|k| !k.trim().is_empty());
    if let Some(flag) = get("PRISM_AUTO_MINE") {
        api.auto_mine = parse_bool(&flag)
            .ok_or_else(|| format!("PRISM_AUTO_MINE {flag:?} is not a boolean"))?;
    }

    if let Some(limit) = get("PRISM_MAX_BODY_BYTES") {
        api.max_body_bytes = limit
            .trim()
            .parse()
            .map_err(|e| format!("PRISM_MAX_BODY_BYTES {limit:?} is not a byte count: {e}"))?;
    }

    // Peers reach each other on the port they serve on.
    node.network.peer_port = api.listen_addr.port();

    if let Some(path) = get("PRISM_DB_PATH") {
        node.storage.path = path;
    }
    if let Some(url) = get("PRISM_RELAY_URL") {
        node.network.relay_url = url;
    }
    node.network.advertise_ip = get("PRISM_ADVERTISE_IP").filter(|ip| !ip.trim().is_empty());
    if let Some(addr) = get("PRISM_METRICS_ADDR") {
        node.metrics.listen_addr = addr
            .parse()
            .map_err(|e| format!("PRISM_METRICS_ADDR {addr:?} is not a socket address: {e}"))?;
    }

    Ok((api, node))
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
