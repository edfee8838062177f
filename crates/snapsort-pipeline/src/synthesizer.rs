//! Category synthesis: one aggregate call that groups analyzed items.
//!
//! When the call fails or its response yields no usable categories, items
//! are partitioned by their theme instead. Synthesis never fails.

use std::sync::Arc;
use std::time::Instant;

use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

use snapsort_core::{AnalysisRecord, CategorySet, InferenceClient, Item};
use snapsort_inference::{parse_structured, ParseError};

use crate::normalize::category_key;
use crate::prompts::categorize_prompt;

/// Where a category set came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategorySource {
    /// Grouped by the model.
    Synthesized,
    /// Partitioned by record theme.
    ThemeFallback,
}

/// Output of the synthesis stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Synthesis {
    pub categories: CategorySet,
    pub source: CategorySource,
}

impl Synthesis {
    fn fallback(records: &[AnalysisRecord]) -> Self {
        Self {
            categories: theme_partition(records),
            source: CategorySource::ThemeFallback,
        }
    }
}

/// Runs the aggregate grouping call.
pub struct Synthesizer {
    client: Arc<dyn InferenceClient>,
}

impl Synthesizer {
    pub fn new(client: Arc<dyn InferenceClient>) -> Self {
        Self { client }
    }

    /// Group `records` into categories with a single inference call.
    #[instrument(skip(self, items, records, user_prompt), fields(subsystem = "pipeline", component = "synthesizer", op = "synthesize", batch_size = records.len()))]
    pub async fn synthesize(
        &self,
        items: &[Item],
        records: &[AnalysisRecord],
        user_prompt: Option<&str>,
    ) -> Synthesis {
        let start = Instant::now();
        let instruction = categorize_prompt(items, records, user_prompt);

        let raw = match self.client.submit(&instruction, None).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, fallback = true, "Categorization call failed, grouping by theme");
                return Synthesis::fallback(records);
            }
        };

        match categories_from_response(&raw) {
            Ok(categories) => {
                info!(
                    category_count = categories.len(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Categories synthesized"
                );
                Synthesis {
                    categories,
                    source: CategorySource::Synthesized,
                }
            }
            Err(e) => {
                warn!(
                    error = %e,
                    response_len = raw.len(),
                    fallback = true,
                    "Could not parse categorization response, grouping by theme"
                );
                Synthesis::fallback(records)
            }
        }
    }
}

/// One category per distinct theme, in first-seen order.
pub fn theme_partition(records: &[AnalysisRecord]) -> CategorySet {
    let mut categories = CategorySet::new();
    for record in records {
        let theme = category_key(&record.theme);
        let description = format!("Images related to {}", theme);
        categories.merge(&theme, &description, [record.index]);
    }
    debug!(category_count = categories.len(), "Partitioned by theme");
    categories
}

/// Parse a categorization response.
///
/// Accepts `{name: {description, images}}` or the same map under a single
/// `"categories"` key. Member lists may also be called `indices` or
/// `members`; non-integer members are ignored. Names are normalized and
/// repeated names merge into the first occurrence. A response with no
/// usable category is an error.
pub fn categories_from_response(raw: &str) -> Result<CategorySet, ParseError> {
    let parsed = parse_structured::<Map<String, Value>>(raw)?;
    let map = unwrap_categories(parsed);

    let mut categories = CategorySet::new();
    for (name, entry) in &map {
        let Some(entry) = entry.as_object() else {
            continue;
        };
        let key = category_key(name);
        let description = entry
            .get("description")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Images related to {}", key));
        let members = ["images", "indices", "members"]
            .iter()
            .find_map(|k| entry.get(*k).and_then(Value::as_array))
            .map(|list| {
                list.iter()
                    .filter_map(Value::as_u64)
                    .filter_map(|i| usize::try_from(i).ok())
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        categories.merge(&key, &description, members);
    }

    if categories.is_empty() {
        return Err(ParseError::Invalid(
            "response contained no categories".to_string(),
        ));
    }
    Ok(categories)
}

fn unwrap_categories(mut parsed: Map<String, Value>) -> Map<String, Value> {
    if parsed.len() == 1 {
        if let Some(Value::Object(inner)) = parsed.remove("categories") {
            return inner;
        }
    }
    parsed
}
