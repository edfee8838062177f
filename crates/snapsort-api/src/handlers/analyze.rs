//! Analyze HTTP handler.
//!
//! Accepts either a JSON body or a multipart form and runs the full
//! analyze-then-categorize pipeline over the batch.

use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::header;
use axum::Json;
use serde::Deserialize;
use tracing::{debug, info};
use utoipa::ToSchema;

use snapsort_core::defaults::MAX_BATCH_SIZE;
use snapsort_core::AnalyzeResponse;
use snapsort_pipeline::RawImage;

use crate::{ApiError, AppState};

/// JSON request body for analysis.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    /// Image payloads: `data:<mime>;base64,<data>` URIs or bare base64 (at most 10).
    #[serde(default)]
    pub images: Vec<String>,
    /// Free-text directive appended to every instruction.
    #[serde(default)]
    pub user_prompt: Option<String>,
}

/// Analyze and categorize a batch of images.
///
/// # Request Body
/// - `application/json`: `{ images: [string], userPrompt?: string }`
/// - `multipart/form-data`: file parts under `files`, payload strings
///   under `images`, optional `userPrompt` text field
///
/// # Returns
/// - 200 OK with `{ results, categories, userPrompt }`
/// - 400 Bad Request for an empty or oversized batch or an undecodable image
/// - 413 Payload Too Large when the body exceeds the upload limit
/// - 500 with a generic message when the body itself cannot be read
#[utoipa::path(post, path = "/api/v1/analyze", tag = "Analyze",
    request_body(content = AnalyzeRequest, description = "JSON body or multipart form"),
    responses(
        (status = 200, description = "Batch analyzed"),
        (status = 400, description = "Invalid batch"),
        (status = 413, description = "Upload too large"),
        (status = 500, description = "Unreadable request body"),
    ))]
pub async fn analyze(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    let (raw, user_prompt) = if content_type.starts_with("multipart/form-data") {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|e| ApiError::from_rejection(e.status(), e.body_text()))?;
        read_multipart(multipart).await?
    } else if content_type.starts_with("application/json") {
        let Json(body) = Json::<AnalyzeRequest>::from_request(request, &state)
            .await
            .map_err(|e| ApiError::from_rejection(e.status(), e.body_text()))?;
        (
            body.images.into_iter().map(RawImage::Encoded).collect(),
            body.user_prompt,
        )
    } else {
        return Err(ApiError::BadRequest(
            "Expected application/json or multipart/form-data".to_string(),
        ));
    };

    let batch_size = raw.len();
    let response = state.pipeline.run(raw, user_prompt).await?;

    info!(
        batch_size,
        failed = response.results.iter().filter(|r| !r.is_success()).count(),
        category_count = response.categories.len(),
        "Analyze request complete"
    );
    Ok(Json(response))
}

/// Collect images and the user prompt from a multipart form, in part order.
async fn read_multipart(
    mut multipart: Multipart,
) -> Result<(Vec<RawImage>, Option<String>), ApiError> {
    let mut raw = Vec::new();
    let mut user_prompt = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::from_rejection(e.status(), format!("Failed to read upload: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "files" | "files[]" => {
                let filename = field.file_name().map(|s| s.to_string());
                let content_type = field.content_type().map(|s| s.to_string());
                let data = field.bytes().await.map_err(|e| {
                    ApiError::from_rejection(e.status(), format!("Failed to read file data: {}", e))
                })?;
                raw.push(RawImage::file(data.to_vec(), content_type, filename));
            }
            "images" | "images[]" => {
                let text = field.text().await.map_err(|e| {
                    ApiError::from_rejection(e.status(), format!("Failed to read images field: {}", e))
                })?;
                raw.extend(encoded_images(&text)?);
            }
            "userPrompt" => {
                let text = field.text().await.map_err(|e| {
                    ApiError::from_rejection(e.status(), format!("Failed to read userPrompt: {}", e))
                })?;
                user_prompt = Some(text);
            }
            other => {
                debug!(field = other, "Ignoring unknown multipart field");
            }
        }

        if raw.len() > MAX_BATCH_SIZE {
            // Stop reading; the pipeline rejects the batch before any inference.
            break;
        }
    }

    Ok((raw, user_prompt))
}

/// An `images` form field holds one payload or a JSON array of payloads.
fn encoded_images(text: &str) -> Result<Vec<RawImage>, ApiError> {
    let trimmed = text.trim();
    if trimmed.starts_with('[') {
        let payloads: Vec<String> = serde_json::from_str(trimmed)
            .map_err(|e| ApiError::Internal(format!("Invalid images field: {}", e)))?;
        return Ok(payloads.into_iter().map(RawImage::Encoded).collect());
    }
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    Ok(vec![RawImage::encoded(trimmed)])
}
