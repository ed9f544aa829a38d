//! Sidecar control endpoints: bootstrap and receiver CRUD.
//!
//! All bodies are JSON. Receiver endpoints speak `{receiver, route}` pairs,
//! the same shapes that land in the configuration file; the control-plane
//! manager owns any translation to its own receiver model.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::amconfig::{InitInfo, ReceiverWithRoute};
use crate::http::server::AppState;

/// POST /sidecar/v1/init
pub async fn init(State(state): State<AppState>, Json(info): Json<InitInfo>) -> Response {
    match state.store.bootstrap(&info).await {
        Ok(wrote) => {
            tracing::info!(wrote, "bootstrap complete");
            StatusCode::OK.into_response()
        }
        Err(err) => err.into_response(),
    }
}

/// GET /sidecar/v1/receivers (and GET /sidecar/v1/receiver)
pub async fn list_receivers(State(state): State<AppState>) -> Response {
    match state.store.list_receivers().await {
        Ok(receivers) => Json(receivers).into_response(),
        Err(err) => err.into_response(),
    }
}

/// POST /sidecar/v1/receiver
pub async fn create_receiver(
    State(state): State<AppState>,
    Json(pair): Json<ReceiverWithRoute>,
) -> Response {
    if pair.receiver.name.is_empty() {
        return (StatusCode::BAD_REQUEST, "receiver name not specified").into_response();
    }
    match state.store.add_receiver(&pair).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => err.into_response(),
    }
}

/// DELETE /sidecar/v1/receiver
pub async fn delete_receiver(
    State(state): State<AppState>,
    Json(pair): Json<ReceiverWithRoute>,
) -> Response {
    if pair.receiver.name.is_empty() {
        return (StatusCode::BAD_REQUEST, "receiver name not specified").into_response();
    }
    match state.store.remove_receiver(&pair.receiver.name).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => err.into_response(),
    }
}
