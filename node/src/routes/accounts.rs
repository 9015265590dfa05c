use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use prism_chain::{Address, is_valid_address};

use crate::state::SharedState;

#[derive(Debug, Deserialize)]
pub struct AmountQuery {
    #[serde(default)]
    pub blockchain_address: String,
}

/// Response body for `GET /amount`.
#[derive(Debug, Serialize)]
pub struct AmountResponse {
    /// Confirmed balance in minor units. Saturates at the `i64` range.
    pub amount: i64,
}

/// `GET /amount?blockchain_address=...`
///
/// Confirmed balance of an address. Pending transactions are not counted.
pub async fn amount(
    State(state): State<SharedState>,
    Query(query): Query<AmountQuery>,
) -> Result<Json<AmountResponse>, (StatusCode, String)> {
    if query.blockchain_address.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "blockchain_address is required".to_string(),
        ));
    }
    let balance = state
        .node
        .balance_of(&Address::from(query.blockchain_address.trim()))
        .await;
    let amount = balance.clamp(i64::MIN as i128, i64::MAX as i128) as i64;
    Ok(Json(AmountResponse { amount }))
}

#[derive(Debug, Deserialize)]
pub struct JoinQuery {
    #[serde(default)]
    pub address: String,
}

/// `POST /join?address=...`
///
/// Queues the one-time joining credit. `201 Created` when queued, `409
/// Conflict` when the address already has it, `400 Bad Request` when the
/// address is not a well-formed Base58Check chain address.
pub async fn join(
    State(state): State<SharedState>,
    Query(query): Query<JoinQuery>,
) -> StatusCode {
    let address = match join_address(&query.address) {
        Ok(address) => address,
        Err(status) => return status,
    };
    if state.node.join(&address).await {
        StatusCode::CREATED
    } else {
        StatusCode::CONFLICT
    }
}

fn join_address(raw: &str) -> Result<Address, StatusCode> {
    let raw = raw.trim();
    if !is_valid_address(raw) {
        tracing::debug!(address = %raw, "refusing joining credit for malformed address");
        return Err(StatusCode::BAD_REQUEST);
    }
    Ok(Address::from(raw))
}

#[cfg(test)]
mod tests {
    use prism_chain::KeyPair;

    use super::*;

    #[test]
    fn join_accepts_derived_addresses() {
        let kp = KeyPair::generate();
        let padded = format!("  {}\n", kp.address());
        assert_eq!(join_address(&padded), Ok(kp.address().clone()));
    }

    #[test]
    fn join_rejects_malformed_addresses() {
        let kp = KeyPair::generate();
        let mut corrupted = kp.address().to_string();
        let last = corrupted.pop();
        corrupted.push(if last == Some('1') { '2' } else { '1' });

        for raw in ["", "   ", "newcomer", "0OIl", corrupted.as_str()] {
            assert_eq!(join_address(raw), Err(StatusCode::BAD_REQUEST), "{raw:?}");
        }
    }
}
