use axum::{Json, response::IntoResponse};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Liveness probe
pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Readiness probe
pub async fn readiness_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ready".to_string(),
    })
}
