//! Per-item analysis: one vision call per item, run concurrently.
//!
//! Each item resolves independently to an [`AnalysisRecord`]. A failed
//! call or an unrecoverable response becomes that item's fallback record
//! and never affects its siblings.

use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use snapsort_core::{AnalysisOutcome, AnalysisRecord, Attachment, InferenceClient, Item};
use snapsort_inference::{parse_structured, ParseError};

use crate::normalize::{category_key, clamp_confidence, slugify, truncate_text, value_text};
use crate::prompts::analysis_prompt;

/// Runs the per-item vision step.
pub struct Analyzer {
    client: Arc<dyn InferenceClient>,
}

impl Analyzer {
    pub fn new(client: Arc<dyn InferenceClient>) -> Self {
        Self { client }
    }

    /// Analyze every item concurrently; output order matches `items`.
    #[instrument(skip(self, items, user_prompt), fields(subsystem = "pipeline", component = "analyzer", op = "analyze_all", batch_size = items.len()))]
    pub async fn analyze_all(&self, items: &[Item], user_prompt: Option<&str>) -> Vec<AnalysisRecord> {
        let instruction = analysis_prompt(user_prompt);
        join_all(items.iter().map(|item| self.analyze_one(item, &instruction))).await
    }

    /// Analyze one item. Never fails; errors become fallback records.
    #[instrument(skip(self, item, instruction), fields(subsystem = "pipeline", component = "analyzer", op = "analyze_one", item_index = item.index, media_type = %item.media_type))]
    pub async fn analyze_one(&self, item: &Item, instruction: &str) -> AnalysisRecord {
        let start = Instant::now();
        let attachment = Attachment::new(&item.data, &item.media_type);

        match self.client.submit(instruction, Some(attachment)).await {
            Ok(raw) => {
                let record = record_from_response(item.index, &raw);
                debug!(
                    response_len = raw.len(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    success = record.is_analyzed(),
                    "Item analyzed"
                );
                record
            }
            Err(e) => {
                warn!(
                    error = %e,
                    duration_ms = start.elapsed().as_millis() as u64,
                    fallback = true,
                    "Inference call failed, using error record"
                );
                AnalysisRecord::failed(item.index, e.to_string())
            }
        }
    }
}

/// Turn a raw model response into a normalized record.
///
/// Unrecoverable responses yield [`AnalysisRecord::unparsed`].
pub fn record_from_response(index: usize, raw: &str) -> AnalysisRecord {
    match parse_analysis(raw) {
        Ok(fields) => normalize_record(index, &fields),
        Err(e) => {
            warn!(item_index = index, error = %e, fallback = true, "Could not parse analysis response");
            AnalysisRecord::unparsed(index)
        }
    }
}

fn parse_analysis(raw: &str) -> Result<Map<String, Value>, ParseError> {
    parse_structured::<Map<String, Value>>(raw)
}

static MISSING: Value = Value::Null;

fn field<'a>(fields: &'a Map<String, Value>, names: &[&str]) -> &'a Value {
    names
        .iter()
        .find_map(|name| fields.get(*name))
        .unwrap_or(&MISSING)
}

fn normalize_record(index: usize, fields: &Map<String, Value>) -> AnalysisRecord {
    let content = slugify(&value_text(field(fields, &["content", "filename"])));
    let content = if content.is_empty() {
        format!("image_document_{}", index + 1)
    } else {
        content
    };

    AnalysisRecord {
        index,
        content,
        extracted_text: truncate_text(&value_text(field(
            fields,
            &["extractedText", "extracted_text", "text"],
        ))),
        theme: category_key(&value_text(field(fields, &["theme", "category"]))),
        confidence: clamp_confidence(field(fields, &["confidence"])),
        outcome: AnalysisOutcome::Analyzed,
    }
}
