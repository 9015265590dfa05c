//! Peer wire contract: snapshot exchange and liveness.

use axum::{Json, extract::State, http::StatusCode};

use prism_chain::ChainSnapshot;

use crate::state::SharedState;

/// `GET /`
///
/// Full snapshot of the local ledger.
pub async fn get_chain(State(state): State<SharedState>) -> Json<ChainSnapshot> {
    Json(state.node.snapshot().await)
}

/// `POST /sync`
///
/// A peer pushes its snapshot. It replaces the local chain only if it
/// passes the hash-link check and is strictly longer; either way the push
/// is acknowledged with `202 Accepted`.
pub async fn sync_chain(
    State(state): State<SharedState>,
    Json(snapshot): Json<ChainSnapshot>,
) -> StatusCode {
    let len = snapshot.chain_len();
    let adopted = state.node.accept_chain(snapshot).await;
    tracing::debug!(len, adopted, "received chain push");
    StatusCode::ACCEPTED
}

/// `GET /peer`
///
/// A random known peer address as plain text, `404` if none are known.
pub async fn random_peer(State(state): State<SharedState>) -> Result<String, StatusCode> {
    state.node.random_peer().ok_or(StatusCode::NOT_FOUND)
}

/// `GET /is_alive`
pub async fn is_alive() -> &'static str {
    "I'm alive"
}
