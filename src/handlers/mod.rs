pub mod auth;
pub mod order;
pub mod product;
pub mod stats;
pub mod user;

use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::database::connection::health_check;
use crate::AppState;

/// `GET /`
pub async fn root() -> &'static str {
    "Shop admin API is running"
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match health_check(&state.db).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "version": state.config.version })),
        ),
        Err(e) => {
            tracing::error!(target: "DATABASE", error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable" })),
            )
        }
    }
}
