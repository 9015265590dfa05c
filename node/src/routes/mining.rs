use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

use prism_chain::ConsensusError;

use crate::state::SharedState;

/// Response body for `GET /mine`.
#[derive(Debug, Serialize)]
pub struct MineResponse {
    pub height: usize,
    pub hash: String,
    pub transactions: usize,
    pub elapsed_ms: u64,
}

/// `GET /mine`
///
/// Mines one block immediately. `409 Conflict` when there is nothing to
/// mine or the search was cut short by a chain adoption.
pub async fn mine(
    State(state): State<SharedState>,
) -> Result<(StatusCode, Json<MineResponse>), (StatusCode, String)> {
    match state.node.mine_now().await {
        Ok(mined) => Ok((
            StatusCode::CREATED,
            Json(MineResponse {
                height: state.node.committed_len().saturating_sub(1),
                hash: mined.block.compute_hash().to_hex(),
                transactions: mined.block.transactions.len(),
                elapsed_ms: mined.elapsed.as_millis() as u64,
            }),
        )),
        Err(e @ (ConsensusError::NothingToMine | ConsensusError::Aborted)) => {
            Err((StatusCode::CONFLICT, e.to_string()))
        }
        Err(e) => {
            tracing::warn!(error = %e, "on-demand mining failed");
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

/// `GET /mine/start`
///
/// Starts the periodic miner if it is not running yet.
pub async fn start(State(state): State<SharedState>) -> &'static str {
    if state.node.start_mining() {
        "Mining started"
    } else {
        "Mining already running"
    }
}
