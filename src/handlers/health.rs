use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::state::AppState;

pub async fn root() -> &'static str {
    "Forex Request API Server"
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub storage: String,
    pub version: String,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let (code, status, storage) = match state.store.ping().await {
        Ok(()) => (StatusCode::OK, "healthy", "connected".to_string()),
        Err(e) => {
            tracing::error!(error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "unhealthy",
                "unreachable".to_string(),
            )
        }
    };

    (
        code,
        Json(HealthResponse {
            status: status.to_string(),
            storage,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}
