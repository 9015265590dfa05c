//! Shared application state.

use std::sync::Arc;

use prism_chain::Node;

/// Shared state held by the request handlers.
///
/// This is wrapped in an [`Arc`] and passed to request handlers via Axum's
/// `State` extractor.
pub struct AppState {
    /// The node: ledger, miner, sync protocol and metrics.
    pub node: Arc<Node>,
}

/// Thread-safe alias for `AppState`.
pub type SharedState = Arc<AppState>;
