//! End-to-end pipeline tests against the scripted mock client.
//!
//! Covers:
//! - result count, order, and index coverage for every valid batch size
//! - batch validation with zero inference calls
//! - category partition invariant under bad synthesizer output
//! - per-item failure isolation
//! - theme fallback when categorization fails
//! - determinism for a fixed stub
//! - confidence clamping and text truncation

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use snapsort_core::{AnalyzeResponse, Error, ImageTranscoder, Result, ResultStatus};
use snapsort_inference::MockInferenceClient;
use snapsort_pipeline::{PipelineConfig, RawImage, SortPipeline};

// ============================================================================
// HELPERS
// ============================================================================

struct NoTranscoder;

#[async_trait]
impl ImageTranscoder for NoTranscoder {
    async fn to_jpeg(&self, _data: &[u8], _media_type: &str) -> Result<Vec<u8>> {
        Err(Error::Transcode("not available in tests".to_string()))
    }

    fn name(&self) -> &str {
        "none"
    }
}

fn pipeline(client: &MockInferenceClient) -> SortPipeline {
    SortPipeline::new(Arc::new(client.clone()), Arc::new(NoTranscoder))
}

fn image_bytes(i: usize) -> Vec<u8> {
    format!("image-{}", i).into_bytes()
}

fn batch(n: usize) -> Vec<RawImage> {
    (0..n)
        .map(|i| {
            RawImage::encoded(format!(
                "data:image/png;base64,{}",
                base64::engine::general_purpose::STANDARD.encode(image_bytes(i))
            ))
        })
        .collect()
}

fn analysis(content: &str, theme: &str, confidence: i64) -> String {
    serde_json::json!({
        "content": content,
        "extractedText": format!("text for {}", content),
        "theme": theme,
        "confidence": confidence,
    })
    .to_string()
}

fn assert_partition(response: &AnalyzeResponse, n: usize) {
    let mut seen = BTreeSet::new();
    for category in response.categories.iter() {
        assert!(!category.member_indices.is_empty(), "empty category {}", category.name);
        for &index in &category.member_indices {
            assert!(seen.insert(index), "index {} in two categories", index);
        }
    }
    assert_eq!(seen, (0..n).collect::<BTreeSet<_>>());

    for result in &response.results {
        let category = response
            .categories
            .get(&result.analysis.category)
            .expect("result category must exist");
        assert!(category.contains(result.index));
    }
}

// ============================================================================
// BATCH SHAPE
// ============================================================================

#[tokio::test]
async fn test_every_valid_batch_size_yields_ordered_results() {
    for n in 1..=10 {
        let client = MockInferenceClient::new()
            .with_fixed_response(analysis("photo", "misc", 70))
            .respond_without_image("not json");
        let response = pipeline(&client).run(batch(n), None).await.unwrap();

        assert_eq!(response.results.len(), n);
        let indices: Vec<usize> = response.results.iter().map(|r| r.index).collect();
        assert_eq!(indices, (0..n).collect::<Vec<_>>());
        assert_partition(&response, n);
        assert_eq!(client.image_call_count(), n);
        assert_eq!(client.text_call_count(), 1);
    }
}

#[tokio::test]
async fn test_invalid_batch_sizes_make_no_calls() {
    let client = MockInferenceClient::new();
    let pipeline = pipeline(&client);

    let err = pipeline.run(batch(0), None).await.unwrap_err();
    assert_eq!(err.to_string(), "Invalid input: No images provided");

    let err = pipeline.run(batch(11), None).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invalid input: Maximum 10 images allowed per request"
    );

    assert_eq!(client.call_count(), 0);
}

#[tokio::test]
async fn test_malformed_payload_makes_no_calls() {
    let client = MockInferenceClient::new();
    let mut raw = batch(2);
    raw.push(RawImage::encoded("data:image/png;base64,@@@"));

    let err = pipeline(&client).run(raw, None).await.unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
    assert_eq!(client.call_count(), 0);
}

// ============================================================================
// CATEGORIES
// ============================================================================

#[tokio::test]
async fn test_partition_holds_for_inconsistent_synthesis() {
    let client = MockInferenceClient::new()
        .with_fixed_response(analysis("doc", "documents", 80))
        .respond_without_image(
            r#"{"first": {"description": "A", "images": [0, 1, 1, 42]},
                "second": {"description": "B", "images": [1, 2]},
                "ghost": {"description": "C", "images": [99]}}"#,
        );
    let response = pipeline(&client).run(batch(5), None).await.unwrap();

    assert_partition(&response, 5);
    assert!(response.categories.get("ghost").is_none());
    assert_eq!(response.categories.category_of(1).unwrap().name, "first");
    assert_eq!(response.categories.get("second").unwrap().member_indices.len(), 1);
    let last = response.categories.iter().last().unwrap();
    assert_eq!(last.name, "uncategorized");
    assert_eq!(
        last.member_indices.iter().copied().collect::<Vec<_>>(),
        vec![3, 4]
    );
    assert_eq!(response.results[3].analysis.category, "uncategorized");
}

#[tokio::test]
async fn test_categorization_failure_falls_back_to_themes() {
    let client = MockInferenceClient::new()
        .respond_to_image(image_bytes(0), analysis("cat", "pets", 90))
        .respond_to_image(image_bytes(1), analysis("receipt", "Receipts", 90))
        .respond_to_image(image_bytes(2), analysis("dog", "pets", 90))
        .fail_without_image("categorizer unavailable");
    let response = pipeline(&client).run(batch(3), None).await.unwrap();

    assert!(!response.categories.is_empty());
    assert_partition(&response, 3);
    let pets = response.categories.get("pets").unwrap();
    assert_eq!(pets.description, "Images related to pets");
    assert_eq!(pets.member_indices.iter().copied().collect::<Vec<_>>(), vec![0, 2]);
    assert_eq!(response.results[1].analysis.category, "receipts");
}

#[tokio::test]
async fn test_smart_categories_disabled_skips_aggregate_call() {
    let client = MockInferenceClient::new().with_fixed_response(analysis("x", "stuff", 60));
    let pipeline = pipeline(&client).with_config(PipelineConfig::default().with_smart_categories(false));

    let response = pipeline.run(batch(3), None).await.unwrap();
    assert_eq!(client.text_call_count(), 0);
    assert_eq!(response.categories.len(), 1);
    assert_eq!(response.categories.get("stuff").unwrap().member_indices.len(), 3);
}

// ============================================================================
// FAILURE ISOLATION
// ============================================================================

#[tokio::test]
async fn test_item_failure_is_isolated() {
    let client = MockInferenceClient::new()
        .with_fixed_response(analysis("fine", "ok", 85))
        .fail_for_image(image_bytes(1), "quota exceeded")
        .respond_to_image(image_bytes(2), "total nonsense")
        .respond_without_image(r#"{"all": {"description": "Everything", "images": [0, 1, 2, 3]}}"#);
    let response = pipeline(&client).run(batch(4), None).await.unwrap();

    let failed = &response.results[1];
    assert_eq!(failed.status, ResultStatus::Error);
    assert_eq!(failed.analysis.confidence, 0);
    assert_eq!(failed.analysis.content, "error_image_2");
    assert!(failed.error_message.as_deref().unwrap().contains("quota exceeded"));

    let unparsed = &response.results[2];
    assert_eq!(unparsed.status, ResultStatus::Error);
    assert_eq!(unparsed.analysis.confidence, 20);
    assert_eq!(unparsed.analysis.content, "image_document_3");

    for i in [0, 3] {
        assert_eq!(response.results[i].status, ResultStatus::Success);
        assert_eq!(response.results[i].analysis.confidence, 85);
    }
    assert_partition(&response, 4);
}

#[tokio::test]
async fn test_all_items_failing_still_returns_results() {
    let client = MockInferenceClient::new().with_default_failure("offline");
    let response = pipeline(&client).run(batch(3), None).await.unwrap();

    assert_eq!(response.results.len(), 3);
    assert!(response.results.iter().all(|r| r.status == ResultStatus::Error));
    assert_eq!(response.categories.len(), 1);
    assert_eq!(response.categories.get("misc").unwrap().member_indices.len(), 3);
}

// ============================================================================
// DETERMINISM & NORMALIZATION
// ============================================================================

#[tokio::test]
async fn test_repeated_runs_are_byte_identical() {
    let client = MockInferenceClient::new()
        .respond_to_image(image_bytes(0), analysis("a", "alpha", 10))
        .respond_to_image(image_bytes(1), analysis("b", "beta", 20))
        .respond_to_image(image_bytes(2), analysis("c", "alpha", 30))
        .respond_without_image(r#"{"z": {"description": "Z", "images": [2]}, "a": {"description": "A", "images": [0, 1]}}"#);
    let pipeline = pipeline(&client);

    let first = serde_json::to_vec(&pipeline.run(batch(3), Some("sort".into())).await.unwrap()).unwrap();
    let second = serde_json::to_vec(&pipeline.run(batch(3), Some("sort".into())).await.unwrap()).unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_confidence_and_text_are_normalized() {
    let long_text = "y".repeat(400);
    let client = MockInferenceClient::new()
        .respond_to_image(image_bytes(0), analysis("high", "t", 150))
        .respond_to_image(image_bytes(1), analysis("low", "t", -5))
        .respond_to_image(
            image_bytes(2),
            serde_json::json!({"content": "odd", "theme": "t", "confidence": "very", "extractedText": long_text})
                .to_string(),
        )
        .respond_without_image("{}");
    let response = pipeline(&client).run(batch(3), None).await.unwrap();

    assert_eq!(response.results[0].analysis.confidence, 100);
    assert_eq!(response.results[1].analysis.confidence, 0);
    assert_eq!(response.results[2].analysis.confidence, 50);
    assert_eq!(response.results[2].analysis.extracted_text.chars().count(), 150);
    for result in &response.results {
        assert!(result.analysis.confidence <= 100);
        assert!(result.analysis.extracted_text.chars().count() <= 150);
    }
}

#[tokio::test]
async fn test_user_prompt_is_trimmed_echoed_and_forwarded() {
    let client = MockInferenceClient::new()
        .with_fixed_response(analysis("x", "y", 60))
        .respond_without_image("{}");
    let response = pipeline(&client)
        .run(batch(2), Some("  group by colour  ".to_string()))
        .await
        .unwrap();

    assert_eq!(response.user_prompt.as_deref(), Some("group by colour"));
    assert!(client
        .get_calls()
        .iter()
        .all(|call| call.instruction.ends_with("group by colour")));

    let blank = pipeline(&client).run(batch(1), Some("   ".to_string())).await.unwrap();
    assert!(blank.user_prompt.is_none());
}

#[tokio::test]
async fn test_response_serializes_with_camel_case_keys() {
    let client = MockInferenceClient::new()
        .with_fixed_response(analysis("note", "notes", 77))
        .respond_without_image(r#"{"notes": {"description": "Notes", "images": [0]}}"#);
    let response = pipeline(&client).run(batch(1), None).await.unwrap();

    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["results"][0]["analysis"]["extractedText"], "text for note");
    assert_eq!(json["results"][0]["status"], "success");
    assert_eq!(json["categories"]["notes"]["images"], serde_json::json!([0]));
    assert_eq!(json["categories"]["notes"]["description"], "Notes");
    assert!(json["userPrompt"].is_null());
}
