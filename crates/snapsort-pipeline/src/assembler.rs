//! Result assembly: join analysis records with categories.
//!
//! After [`normalize_categories`] every batch index belongs to exactly one
//! category, whatever the synthesizer produced.

use std::collections::BTreeSet;

use tracing::debug;

use snapsort_core::defaults::{UNCATEGORIZED, UNCATEGORIZED_DESCRIPTION, UNPARSED_ERROR_MESSAGE};
use snapsort_core::{
    AnalysisOutcome, AnalysisRecord, AnalyzeResponse, Category, CategorySet, ImageResult, Item,
    ResultAnalysis, ResultStatus,
};

/// Make `categories` an exact partition of `0..count`.
///
/// Categories are visited in order and each index goes to the first one
/// that lists it. Out-of-range indices are dropped, categories left empty
/// are removed, and unclaimed indices go to `uncategorized`.
pub fn normalize_categories(categories: CategorySet, count: usize) -> CategorySet {
    let mut claimed = BTreeSet::new();
    let mut normalized = CategorySet::new();

    for category in categories {
        let members: BTreeSet<usize> = category
            .member_indices
            .iter()
            .copied()
            .filter(|&i| i < count && !claimed.contains(&i))
            .collect();
        if members.is_empty() {
            debug!(category = %category.name, "Dropping empty category");
            continue;
        }
        claimed.extend(members.iter().copied());
        normalized.merge(&category.name, &category.description, members);
    }

    let unclaimed: Vec<usize> = (0..count).filter(|i| !claimed.contains(i)).collect();
    if !unclaimed.is_empty() {
        debug!(count = unclaimed.len(), "Assigning unclaimed items to uncategorized");
        normalized.merge(UNCATEGORIZED, UNCATEGORIZED_DESCRIPTION, unclaimed);
    }

    normalized
}

/// Build the externally visible result for one record.
pub fn result_for(record: &AnalysisRecord, item: Option<&Item>, category: &str) -> ImageResult {
    let (status, error_message) = match &record.outcome {
        AnalysisOutcome::Analyzed => (ResultStatus::Success, None),
        AnalysisOutcome::Unparsed => (
            ResultStatus::Error,
            Some(UNPARSED_ERROR_MESSAGE.to_string()),
        ),
        AnalysisOutcome::Failed(message) => (ResultStatus::Error, Some(message.clone())),
    };

    ImageResult {
        index: record.index,
        original_name: item.and_then(|i| i.original_name.clone()),
        analysis: ResultAnalysis {
            content: record.content.clone(),
            category: category.to_string(),
            extracted_text: record.extracted_text.clone(),
            confidence: record.confidence,
        },
        status,
        error_message,
    }
}

/// Assemble the final response.
///
/// `records` must hold one record per item, in index order.
pub fn assemble(
    items: &[Item],
    records: &[AnalysisRecord],
    categories: CategorySet,
    user_prompt: Option<String>,
) -> AnalyzeResponse {
    let categories = normalize_categories(categories, records.len());

    let results = records
        .iter()
        .map(|record| {
            let category = categories
                .category_of(record.index)
                .map(|c: &Category| c.name.as_str())
                .unwrap_or(UNCATEGORIZED);
            result_for(record, items.get(record.index), category)
        })
        .collect();

    AnalyzeResponse {
        results,
        categories,
        user_prompt,
    }
}
