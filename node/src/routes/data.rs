use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

use prism_chain::UserData;

use crate::state::SharedState;

#[derive(Debug, Serialize)]
pub struct DataResponse {
    pub data: Vec<UserData>,
}

/// `GET /data`
///
/// Every confirmed data record, in chain order.
pub async fn confirmed(State(state): State<SharedState>) -> Json<DataResponse> {
    Json(DataResponse {
        data: state.node.all_data().await,
    })
}

/// `POST /data`
///
/// Queues a data record and forwards it to every peer.
pub async fn submit(State(state): State<SharedState>, Json(entry): Json<UserData>) -> StatusCode {
    if state.node.add_data(entry).await {
        StatusCode::CREATED
    } else {
        StatusCode::BAD_REQUEST
    }
}

/// `PUT /update/datapool`
///
/// A peer forwards a data record. Not forwarded again.
pub async fn update_datapool(
    State(state): State<SharedState>,
    Json(entry): Json<UserData>,
) -> StatusCode {
    if state.node.receive_data(entry).await {
        StatusCode::ACCEPTED
    } else {
        StatusCode::BAD_REQUEST
    }
}
