use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

use prism_chain::{Transaction, TransactionRequest};

use crate::state::SharedState;

/// A list of transactions with its length.
#[derive(Debug, Serialize)]
pub struct TransactionsResponse {
    pub transactions: Vec<Transaction>,
    pub length: usize,
}

impl From<Vec<Transaction>> for TransactionsResponse {
    fn from(transactions: Vec<Transaction>) -> Self {
        Self {
            length: transactions.len(),
            transactions,
        }
    }
}

/// `GET /transactions`
///
/// The pending transaction pool.
pub async fn pending(State(state): State<SharedState>) -> Json<TransactionsResponse> {
    Json(state.node.pending_transactions().await.into())
}

/// `GET /all_transactions`
///
/// Every confirmed transaction, in chain order.
pub async fn confirmed(State(state): State<SharedState>) -> Json<TransactionsResponse> {
    Json(state.node.all_transactions().await.into())
}

/// `POST /transactions`
///
/// Admits a signed transfer request and forwards it to every peer.
/// `201 Created` on admission, `400 Bad Request` otherwise.
pub async fn submit(
    State(state): State<SharedState>,
    Json(request): Json<TransactionRequest>,
) -> StatusCode {
    if state.node.submit_transaction(request).await {
        StatusCode::CREATED
    } else {
        StatusCode::BAD_REQUEST
    }
}

/// `PUT /update/mempool`
///
/// A peer forwards a request it admitted. It goes through the same checks
/// as a local submission but is not forwarded again.
pub async fn update_mempool(
    State(state): State<SharedState>,
    Json(request): Json<TransactionRequest>,
) -> StatusCode {
    if state.node.receive_transaction(request).await {
        StatusCode::ACCEPTED
    } else {
        StatusCode::BAD_REQUEST
    }
}
