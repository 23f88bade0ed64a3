use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use tracing::{info, warn};

use super::{
    models::{HealthResponse, IngestResponse, TransactionSummary},
    state::AppState,
    validation::parse_transaction,
};
use crate::api::error::ApiError;

/// Transaction ingestion endpoint (POST /api/transactions)
///
/// Authentication runs in middleware before this handler. The body is read
/// regardless of Content-Type, bounded by `server.api.max_payload_bytes`,
/// and coerced into a transaction (see [`parse_transaction`]). Exactly one
/// row is appended per successful call.
///
/// Returns 201 with `{"status": "ok", "id": <assigned id>}`.
pub async fn ingest_transaction(
    State(state): State<AppState>,
    body: axum::body::Body,
) -> Result<impl IntoResponse, ApiError> {
    let limit = state.config.server.api.max_payload_bytes.as_usize();

    let new = match read_body(body, limit)
        .await
        .and_then(|bytes| parse_transaction(&bytes).map_err(ApiError::from))
    {
        Ok(new) => new,
        Err(err) => {
            state.metrics.ingest_rejected();
            warn!(error = %err, "Rejected transaction");
            return Err(err);
        }
    };

    let store = Arc::clone(&state.store);
    let tx = tokio::task::spawn_blocking(move || store.append(&new)).await??;

    state.metrics.transaction_ingested();
    info!(id = tx.id, name = %tx.name, price = tx.price, taken = tx.taken, "Transaction recorded");

    let response = IngestResponse {
        status: "ok".to_string(),
        id: tx.id,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// Reads the request body, failing with 413 once `limit` bytes are exceeded
async fn read_body(body: axum::body::Body, limit: usize) -> Result<Vec<u8>, ApiError> {
    let collected = Limited::new(body, limit).collect().await.map_err(|err| {
        if err.downcast_ref::<LengthLimitError>().is_some() {
            ApiError::PayloadTooLarge(limit)
        } else {
            ApiError::InvalidPayload(format!("failed to read body: {}", err))
        }
    })?;

    Ok(collected.to_bytes().to_vec())
}

/// Snapshot endpoint (GET /api/transactions)
///
/// The `server.api.snapshot_limit` most recent transactions, newest first,
/// without the `units` column.
pub async fn list_transactions(
    State(state): State<AppState>,
) -> Result<Json<Vec<TransactionSummary>>, ApiError> {
    let limit = state.config.server.api.snapshot_limit;
    let store = Arc::clone(&state.store);

    let rows = tokio::task::spawn_blocking(move || store.recent(limit)).await??;

    Ok(Json(rows.into_iter().map(TransactionSummary::from).collect()))
}

/// Plain-text liveness string (GET /)
pub async fn home() -> &'static str {
    "✅ AutoBill API is running"
}

/// Health check endpoint (GET /health)
///
/// Pings the store and reports counters. 503 if the store is unreachable.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let mut components = HashMap::new();
    components.insert("api".to_string(), "healthy".to_string());

    let store = Arc::clone(&state.store);
    let store_status = match tokio::task::spawn_blocking(move || store.ping()).await {
        Ok(Ok(())) => "healthy".to_string(),
        Ok(Err(err)) => {
            warn!(error = %err, "Store health check failed");
            "unhealthy".to_string()
        }
        Err(err) => {
            warn!(error = %err, "Store health check task failed");
            "unhealthy".to_string()
        }
    };
    components.insert("store".to_string(), store_status);

    let all_healthy = components.values().all(|status| status == "healthy");
    let (status_code, overall) = if all_healthy {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    };

    let response = HealthResponse {
        status: overall.to_string(),
        components,
        version: env!("CARGO_PKG_VERSION").to_string(),
        metrics: state.metrics.snapshot(),
    };

    (status_code, Json(response))
}

/// CORS preflight (OPTIONS /api/transactions, /api/stream)
///
/// Unauthenticated. `Access-Control-Allow-Origin` is added to every response
/// by the router.
pub async fn preflight() -> impl IntoResponse {
    (
        StatusCode::NO_CONTENT,
        [
            (header::ACCESS_CONTROL_ALLOW_METHODS, "GET, POST, OPTIONS"),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, "content-type, x-api-key"),
            (header::ACCESS_CONTROL_MAX_AGE, "86400"),
        ],
    )
}
