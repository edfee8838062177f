//! # snapsort-api
//!
//! HTTP surface for snapsort.
//!
//! Routes:
//! - `POST /api/v1/analyze` - analyze and categorize a batch (JSON or multipart)
//! - `POST /api/v1/export`  - tar.gz of category folders plus summary
//! - `GET  /health`         - service and inference status
//! - `GET  /openapi.json`   - OpenAPI document

pub mod config;
pub mod error;
pub mod handlers;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, Method};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use uuid::Uuid;

use snapsort_core::InferenceClient;
use snapsort_pipeline::SortPipeline;

pub use config::ServerConfig;
pub use error::ApiError;

// =============================================================================
// STATE
// =============================================================================

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<SortPipeline>,
    /// Same client the pipeline uses; consulted by the health check.
    pub client: Arc<dyn InferenceClient>,
}

impl AppState {
    pub fn new(pipeline: SortPipeline, client: Arc<dyn InferenceClient>) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            client,
        }
    }
}

// =============================================================================
// REQUEST ID (UUIDv7)
// =============================================================================

/// Generates time-ordered UUIDv7 request correlation IDs.
#[derive(Clone, Default)]
pub struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

// =============================================================================
// OPENAPI
// =============================================================================

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Snapsort API",
        description = "Analyze, rename, and categorize image batches with a vision model"
    ),
    paths(
        handlers::analyze::analyze,
        handlers::export::export_archive,
        handlers::health::health,
    ),
    components(schemas(
        handlers::analyze::AnalyzeRequest,
        handlers::export::ExportRequest,
        handlers::export::ExportCategory,
        handlers::health::HealthResponse,
    )),
    tags(
        (name = "Analyze", description = "Batch image analysis and categorization"),
        (name = "Export", description = "Archive export"),
        (name = "Health", description = "Service status"),
    )
)]
pub struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

// =============================================================================
// ROUTER
// =============================================================================

/// Build the application router with middleware.
pub fn build_router(state: AppState, config: &ServerConfig) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/openapi.json", get(openapi_json))
        .route("/api/v1/analyze", post(handlers::analyze))
        .route("/api/v1/export", post(handlers::export_archive))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(config.allowed_origins.clone()))
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
                .max_age(std::time::Duration::from_secs(3600)),
        )
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(RequestBodyLimitLayer::new(config.max_upload_bytes))
        .with_state(state)
}
