// node/src/main.rs

//! Prism node binary.
//!
//! This binary serves the peer chain-sync wire contract and the local
//! wallet, data and mining operations on top of the `prism-chain` crate:
//!
//! - `GET /`, `POST /sync`, `GET /peer`, `GET /is_alive`
//! - `PUT /update/mempool`, `PUT /update/datapool`
//! - `GET|POST /transactions`, `GET /all_transactions`, `GET|POST /data`
//! - `GET /mine`, `GET /mine/start`, `GET /amount`, `POST /join`
//! - `GET /health`
//!
//! It embeds a RocksDB-backed [`Node`], joins the network through the
//! bootstrap relay, runs the periodic resync (and by default the periodic
//! miner) and exports Prometheus metrics on `/metrics`.

mod config;
mod routes;
mod state;

use std::sync::Arc;

use tokio::signal;

use prism_chain::{
    ChainSync, HttpPeerClient, HttpRelayClient, KeyPair, MetricsRegistry, Node, PeerDirectory,
    RocksDbSnapshotStore, run_prometheus_http_server,
};
use state::{AppState, SharedState};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "prism_node=info,prism_chain=info".to_string()),
        )
        .init();

    if let Err(e) = run().await {
        tracing::error!("fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    let (api_cfg, node_cfg) = config::from_env()?;

    // ---------------------------
    // Metrics
    // ---------------------------

    let metrics = Arc::new(
        MetricsRegistry::new()
            .map_err(|e| format!("failed to initialise metrics registry: {e}"))?,
    );

    if node_cfg.metrics.enabled {
        let metrics_clone = metrics.clone();
        let addr = node_cfg.metrics.listen_addr;
        tokio::spawn(async move {
            if let Err(e) = run_prometheus_http_server(metrics_clone, addr).await {
                tracing::error!("metrics HTTP server error: {e}");
            }
        });
        tracing::info!("metrics exporter listening on http://{}/metrics", addr);
    }

    // ---------------------------
    // Miner identity
    // ---------------------------

    let identity = match &api_cfg.miner_key {
        Some(key) => KeyPair::from_private_hex(key)
            .map_err(|e| format!("PRISM_MINER_KEY is not a usable private key: {e}"))?,
        None => {
            let kp = KeyPair::generate();
            tracing::warn!(
                private_key = %kp.private_key_hex(),
                public_key = %kp.public_key().to_hex(),
                "generated a new miner identity; set PRISM_MINER_KEY to keep it across restarts"
            );
            kp
        }
    };
    tracing::info!(address = %identity.address(), "miner identity");

    // ---------------------------
    // Storage + network
    // ---------------------------

    let store = RocksDbSnapshotStore::open(&node_cfg.storage).map_err(|e| {
        format!(
            "failed to open RocksDB store at {}: {e}",
            node_cfg.storage.path
        )
    })?;

    let net = &node_cfg.network;
    let relay = HttpRelayClient::new(
        net.relay_url.clone(),
        net.ip_lookup_url.clone(),
        net.request_timeout,
    )
    .map_err(|e| format!("failed to create relay client: {e}"))?;
    let peers_client = HttpPeerClient::new(net.peer_port, net.request_timeout)
        .map_err(|e| format!("failed to create peer client: {e}"))?;
    let sync = ChainSync::new(
        net.clone(),
        Arc::new(PeerDirectory::new(net.validate_ips)),
        Arc::new(relay),
        Arc::new(peers_client),
    );

    // ---------------------------
    // Node
    // ---------------------------

    let node = Node::start(
        node_cfg.clone(),
        identity.address().clone(),
        Arc::new(store),
        sync,
        metrics,
    )
    .await
    .map_err(|e| format!("failed to start node: {e}"))?;

    node.start_resync();
    if api_cfg.auto_mine {
        node.start_mining();
    }

    // ---------------------------
    // HTTP server
    // ---------------------------

    let app_state: SharedState = Arc::new(AppState { node: node.clone() });
    let app = routes::router(app_state, api_cfg.max_body_bytes);

    tracing::info!("Prism node listening on http://{}", api_cfg.listen_addr);

    let listener = tokio::net::TcpListener::bind(api_cfg.listen_addr)
        .await
        .map_err(|e| format!("failed to bind {}: {e}", api_cfg.listen_addr))?;

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| format!("API server error: {e}"));

    node.shutdown().await;
    served
}

/// Waits for Ctrl-C and returns, used for graceful shutdown.
async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
