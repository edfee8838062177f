//! In-process HTTP tests driving the router with `oneshot`.

use std::io::Read;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use base64::Engine;
use serde_json::{json, Value};
use tower::ServiceExt;

use snapsort_api::{build_router, AppState, ServerConfig};
use snapsort_core::{Error, ImageTranscoder, Result};
use snapsort_inference::MockInferenceClient;
use snapsort_pipeline::SortPipeline;

// ============================================================================
// HELPERS
// ============================================================================

struct NoTranscoder;

#[async_trait]
impl ImageTranscoder for NoTranscoder {
    async fn to_jpeg(&self, _data: &[u8], _media_type: &str) -> Result<Vec<u8>> {
        Err(Error::Transcode("unavailable".to_string()))
    }

    fn name(&self) -> &str {
        "none"
    }
}

const ANALYSIS: &str =
    r#"{"content": "desk photo", "extractedText": "Monday", "theme": "Office", "confidence": 81}"#;

fn app(client: &MockInferenceClient) -> Router {
    app_with_config(client, ServerConfig::default())
}

fn app_with_config(client: &MockInferenceClient, config: ServerConfig) -> Router {
    let client: Arc<dyn snapsort_core::InferenceClient> = Arc::new(client.clone());
    let pipeline = SortPipeline::new(client.clone(), Arc::new(NoTranscoder));
    build_router(AppState::new(pipeline, client), &config)
}

fn data_uri(bytes: &[u8]) -> String {
    format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

fn json_request(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn multipart_body(boundary: &str, parts: &[(&str, Option<&str>, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, filename, data) in parts {
        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        match filename {
            Some(filename) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: image/png\r\n\r\n",
                        name, filename
                    )
                    .as_bytes(),
                );
            }
            None => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                );
            }
        }
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());
    body
}

// ============================================================================
// HEALTH & DOCS
// ============================================================================

#[tokio::test]
async fn test_health_reports_model_and_availability() {
    let client = MockInferenceClient::new().with_model("vision-test");
    let response = app(&client)
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["model"], "vision-test");
    assert_eq!(body["inference_available"], true);
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_health_degraded_when_inference_down() {
    let client = MockInferenceClient::new().with_health(false);
    let response = app(&client)
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["inference_available"], false);
}

#[tokio::test]
async fn test_openapi_document_lists_routes() {
    let client = MockInferenceClient::new();
    let response = app(&client)
        .oneshot(Request::get("/openapi.json").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["paths"]["/api/v1/analyze"].is_object());
    assert!(body["paths"]["/api/v1/export"].is_object());
    assert!(body["paths"]["/health"].is_object());
}

// ============================================================================
// ANALYZE
// ============================================================================

#[tokio::test]
async fn test_analyze_json_batch() {
    let client = MockInferenceClient::new()
        .with_fixed_response(ANALYSIS)
        .respond_without_image(r#"{"office": {"description": "Work stuff", "images": [0, 1]}}"#);
    let response = app(&client)
        .oneshot(json_request(
            "/api/v1/analyze",
            json!({"images": [data_uri(b"one"), data_uri(b"two")], "userPrompt": "be brief"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["index"], 0);
    assert_eq!(results[0]["analysis"]["content"], "desk_photo");
    assert_eq!(results[0]["analysis"]["category"], "office");
    assert_eq!(results[0]["analysis"]["extractedText"], "Monday");
    assert_eq!(results[0]["status"], "success");
    assert_eq!(body["categories"]["office"]["images"], json!([0, 1]));
    assert_eq!(body["userPrompt"], "be brief");
}

#[tokio::test]
async fn test_analyze_empty_batch_is_rejected() {
    let client = MockInferenceClient::new();
    let response = app(&client)
        .oneshot(json_request("/api/v1/analyze", json!({"images": []})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await, json!({"error": "No images provided"}));
    assert_eq!(client.call_count(), 0);
}

#[tokio::test]
async fn test_analyze_oversized_batch_is_rejected() {
    let client = MockInferenceClient::new();
    let images: Vec<String> = (0..11).map(|i| data_uri(&[i as u8 + 1])).collect();
    let response = app(&client)
        .oneshot(json_request("/api/v1/analyze", json!({ "images": images })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        json!({"error": "Maximum 10 images allowed per request"})
    );
    assert_eq!(client.call_count(), 0);
}

#[tokio::test]
async fn test_analyze_malformed_json_is_rejected() {
    let client = MockInferenceClient::new();
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/analyze")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app(&client).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await,
        json!({"error": "Internal server error"})
    );
    assert_eq!(client.call_count(), 0);
}

#[tokio::test]
async fn test_analyze_malformed_multipart_field_is_generic_error() {
    let client = MockInferenceClient::new();
    let boundary = "snapsort-bad-field";
    let body = multipart_body(boundary, &[("images", None, b"[\"data:image/png")]);
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/analyze")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap();
    let response = app(&client).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await,
        json!({"error": "Internal server error"})
    );
    assert_eq!(client.call_count(), 0);
}

#[tokio::test]
async fn test_analyze_unsupported_content_type() {
    let client = MockInferenceClient::new();
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/analyze")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from("hello"))
        .unwrap();
    let response = app(&client).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_analyze_multipart_files_and_payloads() {
    let client = MockInferenceClient::new()
        .with_fixed_response(ANALYSIS)
        .respond_without_image("no categories today");
    let boundary = "snapsort-test-boundary";
    let encoded = data_uri(b"third");
    let body = multipart_body(
        boundary,
        &[
            ("files", Some("first.png"), b"\x89PNG\r\n\x1a\nfirst"),
            ("files", Some("second.png"), b"\x89PNG\r\n\x1a\nsecond"),
            ("images", None, encoded.as_bytes()),
            ("userPrompt", None, b"sort by project"),
        ],
    );
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/analyze")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap();

    let response = app(&client).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0]["originalName"], "first.png");
    assert_eq!(results[1]["originalName"], "second.png");
    assert!(results[2].get("originalName").is_none());
    assert_eq!(body["userPrompt"], "sort by project");
    // Categorization response was unusable, so items are grouped by theme.
    assert_eq!(body["categories"]["office"]["images"], json!([0, 1, 2]));
    assert_eq!(client.image_call_count(), 3);
}

#[tokio::test]
async fn test_analyze_item_failure_is_reported_per_item() {
    let client = MockInferenceClient::new()
        .with_fixed_response(ANALYSIS)
        .fail_for_image(b"broken".to_vec(), "upstream timeout")
        .respond_without_image("{}");
    let response = app(&client)
        .oneshot(json_request(
            "/api/v1/analyze",
            json!({"images": [data_uri(b"fine"), data_uri(b"broken")]}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["results"][0]["status"], "success");
    assert_eq!(body["results"][1]["status"], "error");
    assert_eq!(body["results"][1]["analysis"]["confidence"], 0);
    assert!(body["results"][1]["errorMessage"]
        .as_str()
        .unwrap()
        .contains("upstream timeout"));
}

#[tokio::test]
async fn test_body_over_limit_is_rejected() {
    let client = MockInferenceClient::new();
    let config = ServerConfig {
        max_upload_bytes: 64,
        ..ServerConfig::default()
    };
    let body = json!({ "images": [data_uri(&[7u8; 256])] }).to_string();
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/analyze")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::CONTENT_LENGTH, body.len())
        .body(Body::from(body))
        .unwrap();
    let response = app_with_config(&client, config).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(client.call_count(), 0);
}

// ============================================================================
// EXPORT
// ============================================================================

fn result_json(index: usize, content: &str, category: &str) -> Value {
    json!({
        "index": index,
        "analysis": {
            "content": content,
            "category": category,
            "extractedText": "",
            "confidence": 90
        },
        "status": "success"
    })
}

#[tokio::test]
async fn test_export_builds_archive() {
    let client = MockInferenceClient::new();
    let response = app(&client)
        .oneshot(json_request(
            "/api/v1/export",
            json!({
                "images": [data_uri(b"alpha"), data_uri(b"beta")],
                "results": [result_json(0, "first shot", "pets"), result_json(1, "second", "travel")],
                "categories": {"pets": {"description": "Animals", "images": [0]}}
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/gzip"
    );
    let disposition = response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment; filename=\"snapsort-"));

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let mut archive = tar::Archive::new(flate2::read::GzDecoder::new(&bytes[..]));
    let mut names = Vec::new();
    let mut summary = String::new();
    for entry in archive.entries().unwrap() {
        let mut entry = entry.unwrap();
        let path = entry.path().unwrap().to_string_lossy().into_owned();
        if path == "summary.txt" {
            entry.read_to_string(&mut summary).unwrap();
        }
        names.push(path);
    }

    assert_eq!(names.len(), 3);
    assert!(names[0].starts_with("pets/first_shot_"));
    assert!(names[0].ends_with(".png"));
    assert!(names[1].starts_with("travel/second_"));
    assert_eq!(names[2], "summary.txt");
    assert!(summary.contains("pets (1 image): Animals"));
    assert_eq!(client.call_count(), 0);
}

#[tokio::test]
async fn test_export_rejects_mismatched_results() {
    let client = MockInferenceClient::new();
    let response = app(&client)
        .oneshot(json_request(
            "/api/v1/export",
            json!({
                "images": [data_uri(b"alpha"), data_uri(b"beta")],
                "results": [result_json(0, "only", "one")]
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"]
        .as_str()
        .unwrap()
        .contains("2 images but 1 results"));
}

#[tokio::test]
async fn test_export_rejects_out_of_range_index() {
    let client = MockInferenceClient::new();
    let response = app(&client)
        .oneshot(json_request(
            "/api/v1/export",
            json!({
                "images": [data_uri(b"alpha")],
                "results": [result_json(5, "x", "y")]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
