//! HTTP routes.
//!
//! The peer wire contract (`/`, `/sync`, `/peer`, `/is_alive`,
//! `/update/*`) and the local wallet/mining operations share one router.
//!
//! Request bodies are capped by a configurable limit instead of axum's
//! 2 MB default, since `POST /sync` carries the whole chain.

pub mod accounts;
pub mod chain;
pub mod data;
pub mod health;
pub mod mining;
pub mod transactions;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post, put},
};

use crate::state::SharedState;

pub fn router(state: SharedState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/", get(chain::get_chain))
        .route("/sync", post(chain::sync_chain))
        .route("/peer", get(chain::random_peer))
        .route("/is_alive", get(chain::is_alive))
        .route("/update/mempool", put(transactions::update_mempool))
        .route("/update/datapool", put(data::update_datapool))
        .route(
            "/transactions",
            get(transactions::pending).post(transactions::submit),
        )
        .route("/all_transactions", get(transactions::confirmed))
        .route("/data", get(data::confirmed).post(data::submit))
        .route("/mine", get(mining::mine))
        .route("/mine/start", get(mining::start))
        .route("/amount", get(accounts::amount))
        .route("/join", post(accounts::join))
        .route("/health", get(health::health))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use prism_chain::{
        Address, Blockchain, ChainSnapshot, ChainSync, HttpPeerClient, HttpRelayClient,
        InMemorySnapshotStore, MetricsRegistry, NetworkConfig, NetworkError, Node, NodeConfig,
        PeerClient, PeerDirectory, UserData,
    };

    use super::*;
    use crate::config::DEFAULT_MAX_BODY_BYTES;
    use crate::state::AppState;

    /// A node with no reachable relay or peers; discovery gives up after
    /// one refused connection.
    async fn lonely_node() -> Arc<Node> {
        let network = NetworkConfig {
            advertise_ip: Some("127.0.0.1".into()),
            discovery_attempts: 1,
            request_timeout: Duration::from_secs(1),
            ..NetworkConfig::default()
        };
        let relay = HttpRelayClient::new(
            "http://127.0.0.1:9",
            "http://127.0.0.1:9",
            network.request_timeout,
        )
        .expect("relay client");
        let peers =
            HttpPeerClient::new(network.peer_port, network.request_timeout).expect("peer client");
        let sync = ChainSync::new(
            network.clone(),
            Arc::new(PeerDirectory::new(true)),
            Arc::new(relay),
            Arc::new(peers),
        );
        let config = NodeConfig {
            network,
            ..NodeConfig::default()
        };
        let metrics = Arc::new(MetricsRegistry::new().expect("metrics"));
        Node::start(
            config,
            Address::from("miner"),
            Arc::new(InMemorySnapshotStore::new()),
            sync,
            metrics,
        )
        .await
        .expect("node should start")
    }

    /// Serves the router on an ephemeral local port and returns the port.
    async fn serve(node: Arc<Node>, max_body_bytes: usize) -> u16 {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let port = listener.local_addr().expect("local addr").port();
        let app = router(Arc::new(AppState { node }), max_body_bytes);
        tokio::spawn(async move { axum::serve(listener, app).await });
        port
    }

    /// Two blocks, the second carrying one data record of `payload` bytes.
    fn chain_with_payload(payload: usize) -> ChainSnapshot {
        let mut bc = Blockchain::new(Address::from("peer"), 10111);
        assert!(bc.add_data(UserData::new(
            Address::from("carol"),
            vec!["x".repeat(payload)],
        )));
        let prev = bc.last_block().compute_hash();
        bc.append_block(1, prev);
        bc.snapshot()
    }

    #[tokio::test]
    async fn sync_accepts_snapshots_beyond_two_megabytes() {
        let node = lonely_node().await;
        let port = serve(node.clone(), DEFAULT_MAX_BODY_BYTES).await;

        let snapshot = chain_with_payload(3 * 1024 * 1024);
        let client = HttpPeerClient::new(port, Duration::from_secs(10)).expect("client");
        client
            .push_chain("127.0.0.1", &snapshot)
            .await
            .expect("large push should be accepted");

        assert_eq!(node.committed_len(), 2);
        assert_eq!(node.snapshot().await.chain, snapshot.chain);
        node.shutdown().await;
    }

    #[tokio::test]
    async fn sync_rejects_bodies_over_the_configured_limit() {
        let node = lonely_node().await;
        let port = serve(node.clone(), 1024).await;

        let snapshot = chain_with_payload(4 * 1024);
        let client = HttpPeerClient::new(port, Duration::from_secs(5)).expect("client");
        let err = client
            .push_chain("127.0.0.1", &snapshot)
            .await
            .expect_err("oversized push should be refused");

        assert!(
            matches!(err, NetworkError::Status { status: 413, .. }),
            "unexpected error: {err}"
        );
        assert_eq!(node.committed_len(), 1);
        node.shutdown().await;
    }
}
