use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

use crate::state::SharedState;

/// Health-check response with a glance at local chain state.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub chain_length: usize,
    pub peers: usize,
}

/// `GET /health`
///
/// Returns a basic JSON document indicating liveness. The chain length is
/// the last committed length, read without the ledger lock, so this never
/// waits on an in-flight proof search.
pub async fn health(State(state): State<SharedState>) -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok",
            chain_length: state.node.committed_len(),
            peers: state.node.sync().peers().len(),
        }),
    )
}
