//! Health check endpoint

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde_json::{json, Value};

use crate::api::middleware::AppState;

pub const SERVICE_NAME: &str = "authgate";

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

/// GET /health
///
/// 200 while the database answers a ping, 503 otherwise.
async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match state.pool.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({"status": "ok", "service": SERVICE_NAME})),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {:#}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"status": "unavailable", "service": SERVICE_NAME})),
            )
        }
    }
}
