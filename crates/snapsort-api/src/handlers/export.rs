//! Archive export HTTP handler.

use std::collections::BTreeMap;

use axum::extract::rejection::JsonRejection;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use tracing::info;
use utoipa::ToSchema;

use snapsort_core::{detect_media_type, ImageResult, Item};
use snapsort_pipeline::{archive_file_name, build_archive, decode_payload, validate_batch_size};

use crate::ApiError;

/// Category metadata echoed back from an analyze response.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ExportCategory {
    #[serde(default)]
    pub description: String,
}

/// Export request: the original payloads plus (possibly edited) results.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ExportRequest {
    /// Image payloads in batch order.
    pub images: Vec<String>,
    /// One result per image; `index` selects the payload.
    #[schema(value_type = Vec<Object>)]
    pub results: Vec<ImageResult>,
    /// Optional category descriptions for the summary report.
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub categories: Option<BTreeMap<String, ExportCategory>>,
}

/// Build a tar.gz of category folders plus `summary.txt`.
///
/// # Returns
/// - 200 OK with an `application/gzip` attachment
/// - 400 Bad Request when payloads are invalid or results do not match images
#[utoipa::path(post, path = "/api/v1/export", tag = "Export",
    request_body = ExportRequest,
    responses(
        (status = 200, description = "Archive built", content_type = "application/gzip"),
        (status = 400, description = "Invalid request"),
    ))]
pub async fn export_archive(
    payload: Result<Json<ExportRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::from_rejection(e.status(), e.body_text()))?;
    validate_batch_size(req.images.len())?;

    let items = req
        .images
        .iter()
        .enumerate()
        .map(|(index, payload)| {
            let (data, declared) = decode_payload(payload).map_err(|e| match e {
                snapsort_core::Error::InvalidInput(msg) => {
                    ApiError::BadRequest(format!("Image {}: {}", index + 1, msg))
                }
                other => ApiError::from(other),
            })?;
            let media_type = detect_media_type(None, &data, declared.as_deref());
            Ok(Item::new(index, data, media_type, None))
        })
        .collect::<Result<Vec<_>, ApiError>>()?;

    let descriptions: BTreeMap<String, String> = req
        .categories
        .unwrap_or_default()
        .into_iter()
        .map(|(name, category)| (name, category.description))
        .collect();

    let now = chrono::Utc::now();
    let archive = build_archive(&items, &req.results, &descriptions, now)?;
    let filename = archive_file_name(now.date_naive());

    info!(
        batch_size = items.len(),
        archive_bytes = archive.len(),
        "Export complete"
    );

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/gzip"));
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename))
        .map_err(|e| ApiError::Internal(format!("Invalid content disposition: {}", e)))?;
    headers.insert(header::CONTENT_DISPOSITION, disposition);

    Ok((StatusCode::OK, headers, archive))
}
