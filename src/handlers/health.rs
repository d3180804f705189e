//! Health check endpoint.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::SharedState;

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// "ok" or "unhealthy"
    pub status: String,

    /// "up" or "down"
    pub database: String,
}

/// `GET /health`
///
/// # Returns
///
/// - `200 OK` with `{"status": "ok", "database": "up"}`
/// - `503 Service Unavailable` when the database does not answer
pub async fn health_check(State(state): State<SharedState>) -> (StatusCode, Json<HealthResponse>) {
    match state.database.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok".to_string(),
                database: "up".to_string(),
            }),
        ),
        Err(e) => {
            warn!(error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unhealthy".to_string(),
                    database: "down".to_string(),
                }),
            )
        }
    }
}
