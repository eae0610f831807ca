//! # API Endpoint Handlers
//!
//! Batch calls run on the blocking pool: the dispatcher waits on model
//! locks and must not stall the async workers.

use super::{AppState, types::HealthResponse};
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;
use tessera_core::{BatchCall, BatchResponse, TesseraError, batch::mint_packet_id};

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let registry = Arc::clone(state.dispatcher.registry());
    let models = tokio::task::spawn_blocking(move || registry.list_ids().len())
        .await
        .unwrap_or_default();
    Json(HealthResponse::new(models))
}

// =============================================================================
// BATCH HANDLERS
// =============================================================================

/// Run a batch call.
pub async fn batch_handler(
    State(state): State<AppState>,
    payload: Result<Json<BatchCall>, JsonRejection>,
) -> impl IntoResponse {
    run_batch(state, payload, false).await
}

/// Run a batch call as a privileged caller.
pub async fn privileged_batch_handler(
    State(state): State<AppState>,
    payload: Result<Json<BatchCall>, JsonRejection>,
) -> impl IntoResponse {
    run_batch(state, payload, true).await
}

async fn run_batch(
    state: AppState,
    payload: Result<Json<BatchCall>, JsonRejection>,
    privileged: bool,
) -> (StatusCode, Json<BatchResponse>) {
    let call = match payload {
        Ok(Json(call)) => call.privileged(privileged),
        Err(rejection) => {
            let error = TesseraError::SerializationError(rejection.body_text());
            tracing::warn!(error = %error, "rejected batch body");
            let response = BatchResponse::error(mint_packet_id(), None, String::new(), &error);
            return (StatusCode::BAD_REQUEST, Json(response));
        }
    };

    let packet_id = call.packet_id_or_mint();
    let call = call.with_packet_id(packet_id.clone());
    let uid = call.uid.clone();
    let intention = call.intention.clone();
    let dispatcher = Arc::clone(&state.dispatcher);

    match tokio::task::spawn_blocking(move || dispatcher.dispatch(&call)).await {
        Ok(response) => (StatusCode::OK, Json(response)),
        Err(e) => {
            tracing::error!(packet_id = %packet_id, "batch task failed: {}", e);
            let error = TesseraError::IoError(format!("Batch task failed: {}", e));
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(BatchResponse::error(packet_id, uid, intention, &error)),
            )
        }
    }
}
