//! Health check handler.

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::AppState;

/// Service health.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// `ok` when the inference service answers, otherwise `degraded`.
    pub status: String,
    pub model: String,
    pub inference_available: bool,
    pub version: String,
}

/// Report service status and inference reachability.
#[utoipa::path(get, path = "/health", tag = "Health",
    responses((status = 200, description = "Service status", body = HealthResponse)))]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let inference_available = state.client.health_check().await.unwrap_or(false);
    Json(HealthResponse {
        status: (if inference_available { "ok" } else { "degraded" }).to_string(),
        model: state.client.model_name().to_string(),
        inference_available,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
