//! Prometheus-backed metrics and HTTP exporter.
//!
//! This module defines a [`MetricsRegistry`] that owns a Prometheus
//! registry and the node's strongly-typed metrics, and an async HTTP
//! exporter that serves `/metrics` using `hyper`.

use std::{convert::Infallible, net::SocketAddr, sync::Arc};

use bytes::Bytes;
use http_body_util::Full;
use hyper::{
    Method, Request, Response, StatusCode, body::Incoming, header, server::conn::http1,
    service::service_fn,
};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

use prometheus::{
    self, Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Opts, Registry, TextEncoder,
};

/// Ledger, mining and sync metrics.
///
/// These are registered into a [`Registry`] and updated by the node
/// orchestration layer.
#[derive(Clone)]
pub struct LedgerMetrics {
    /// Wall time of successful proof-of-work searches, in seconds.
    pub pow_search_seconds: Histogram,
    /// Blocks committed by this node.
    pub blocks_mined: IntCounter,
    /// Proof searches abandoned because a peer chain was adopted.
    pub mining_aborted: IntCounter,
    /// Transactions admitted into the pool (including split parts).
    pub transactions_admitted: IntCounter,
    /// Transaction requests rejected at admission.
    pub transactions_rejected: IntCounter,
    /// Peer chains adopted in place of the local one.
    pub chains_adopted: IntCounter,
    /// Incoming chains ignored as shorter or structurally invalid.
    pub chains_rejected: IntCounter,
    /// Current size of the peer directory.
    pub known_peers: IntGauge,
    /// Current length of the local chain, genesis included.
    pub chain_length: IntGauge,
}

impl LedgerMetrics {
    /// Registers ledger metrics into the given `Registry`.
    pub fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        let pow_search_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "consensus_pow_search_seconds",
                "Time spent finding a proof-of-work nonce in seconds",
            )
            .buckets(vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ]),
        )?;
        registry.register(Box::new(pow_search_seconds.clone()))?;

        let blocks_mined = counter(registry, "consensus_blocks_mined", "Total blocks mined locally")?;
        let mining_aborted = counter(
            registry,
            "consensus_mining_aborted",
            "Proof searches aborted by chain adoption",
        )?;
        let transactions_admitted = counter(
            registry,
            "ledger_transactions_admitted",
            "Transactions admitted into the pool",
        )?;
        let transactions_rejected = counter(
            registry,
            "ledger_transactions_rejected",
            "Transaction requests rejected at admission",
        )?;
        let chains_adopted = counter(
            registry,
            "sync_chains_adopted",
            "Peer chains adopted as the local chain",
        )?;
        let chains_rejected = counter(
            registry,
            "sync_chains_rejected",
            "Incoming peer chains ignored as shorter or invalid",
        )?;

        let known_peers = IntGauge::with_opts(Opts::new(
            "sync_known_peers",
            "Number of peers in the peer directory",
        ))?;
        registry.register(Box::new(known_peers.clone()))?;

        let chain_length = IntGauge::with_opts(Opts::new(
            "ledger_chain_length",
            "Number of blocks in the local chain",
        ))?;
        registry.register(Box::new(chain_length.clone()))?;

        Ok(Self {
            pow_search_seconds,
            blocks_mined,
            mining_aborted,
            transactions_admitted,
            transactions_rejected,
            chains_adopted,
            chains_rejected,
            known_peers,
            chain_length,
        })
    }
}

fn counter(registry: &Registry, name: &str, help: &str) -> Result<IntCounter, prometheus::Error> {
    let counter = IntCounter::with_opts(Opts::new(name, help))?;
    registry.register(Box::new(counter.clone()))?;
    Ok(counter)
}

/// Wrapper around a Prometheus registry and the ledger metrics.
///
/// This is the main handle passed around in the node. It can be wrapped
/// in an [`Arc`] and shared across threads/tasks.
#[derive(Clone)]
pub struct MetricsRegistry {
    registry: Registry,
    pub ledger: LedgerMetrics,
}

impl MetricsRegistry {
    /// Creates a new `MetricsRegistry` with a fresh underlying `Registry`
    /// and registers the ledger metrics.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("prism".to_string()), None)?;
        let ledger = LedgerMetrics::register(&registry)?;
        Ok(Self { registry, ledger })
    }

    /// Encodes all metrics in this registry into the Prometheus text format.
    pub fn gather_text(&self) -> String {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            tracing::error!(error = %e, "failed to encode Prometheus metrics");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

/// Runs an HTTP server that exposes Prometheus metrics.
///
/// The server listens on `addr` and serves `GET /metrics` with the
/// Prometheus text exposition format. All other paths return 404.
///
/// Intended to be spawned onto a Tokio runtime.
pub async fn run_prometheus_http_server(
    metrics: Arc<MetricsRegistry>,
    addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener = TcpListener::bind(addr).await?;

    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let metrics = metrics.clone();

        tokio::spawn(async move {
            let svc = service_fn(move |req| {
                let metrics = metrics.clone();
                handle_request(req, metrics)
            });

            if let Err(err) = http1::Builder::new().serve_connection(io, svc).await {
                tracing::warn!(error = %err, "prometheus HTTP connection error");
            }
        });
    }
}

async fn handle_request(
    req: Request<Incoming>,
    metrics: Arc<MetricsRegistry>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    match (req.method(), req.uri().path()) {
        (&Method::GET, "/metrics") => {
            let mut resp = Response::new(Full::new(Bytes::from(metrics.gather_text())));
            resp.headers_mut().insert(
                header::CONTENT_TYPE,
                header::HeaderValue::from_static("text/plain; version=0.0.4"),
            );
            Ok(resp)
        }
        _ => {
            let mut resp = Response::new(Full::new(Bytes::from("not found")));
            *resp.status_mut() = StatusCode::NOT_FOUND;
            Ok(resp)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::Registry;

    #[test]
    fn ledger_metrics_register_and_record() {
        let registry = Registry::new();
        let metrics = LedgerMetrics::register(&registry).expect("register metrics");

        metrics.pow_search_seconds.observe(0.123);
        metrics.blocks_mined.inc();
        metrics.known_peers.set(3);
        metrics.chain_length.set(7);

        let metric_families = registry.gather();
        assert!(!metric_families.is_empty());
        assert_eq!(metrics.blocks_mined.get(), 1);
    }

    #[test]
    fn metrics_registry_gather_text_uses_prefix() {
        let registry = MetricsRegistry::new().expect("create metrics registry");
        registry.ledger.chains_adopted.inc();
        let text = registry.gather_text();
        assert!(text.contains("prism_sync_chains_adopted"));
    }

    #[test]
    fn duplicate_registration_fails() {
        let registry = Registry::new();
        LedgerMetrics::register(&registry).expect("first registration");
        assert!(LedgerMetrics::register(&registry).is_err());
    }
}
