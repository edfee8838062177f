//! Data model shared by the pipeline and the HTTP layer.
//!
//! Nothing here outlives a single request. Items are created by the
//! ingestor, analysis records by the analyzer, categories by the
//! synthesizer, and results by the assembler.

use std::collections::BTreeSet;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

// =============================================================================
// ITEM
// =============================================================================

/// One uploaded image, tracked by its batch position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    /// 0-based batch position, stable across the pipeline.
    pub index: usize,
    pub data: Vec<u8>,
    pub media_type: String,
    pub original_name: Option<String>,
}

impl Item {
    pub fn new(
        index: usize,
        data: Vec<u8>,
        media_type: impl Into<String>,
        original_name: Option<String>,
    ) -> Self {
        Self {
            index,
            data,
            media_type: media_type.into(),
            original_name,
        }
    }
}

// =============================================================================
// ANALYSIS RECORD
// =============================================================================

/// How an analysis record came to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisOutcome {
    /// The model response parsed into a record.
    Analyzed,
    /// The model answered but nothing structured could be recovered.
    Unparsed,
    /// The inference call itself failed.
    Failed(String),
}

/// Structured description of an item produced by the per-item analyzer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRecord {
    pub index: usize,
    /// Filename-safe content slug.
    pub content: String,
    /// Text snippet visible in the image, at most 150 characters.
    pub extracted_text: String,
    /// Lowercase single-word theme.
    pub theme: String,
    /// Clamped to [0, 100].
    pub confidence: u8,
    pub outcome: AnalysisOutcome,
}

impl AnalysisRecord {
    /// Fallback for a response that could not be parsed.
    pub fn unparsed(index: usize) -> Self {
        Self {
            index,
            content: format!("image_document_{}", index + 1),
            extracted_text: crate::defaults::UNPARSED_TEXT.to_string(),
            theme: crate::defaults::FALLBACK_THEME.to_string(),
            confidence: crate::defaults::UNPARSED_CONFIDENCE,
            outcome: AnalysisOutcome::Unparsed,
        }
    }

    /// Fallback for an inference call that failed.
    pub fn failed(index: usize, error: impl Into<String>) -> Self {
        Self {
            index,
            content: format!("error_image_{}", index + 1),
            extracted_text: crate::defaults::FAILED_TEXT.to_string(),
            theme: crate::defaults::FALLBACK_THEME.to_string(),
            confidence: 0,
            outcome: AnalysisOutcome::Failed(error.into()),
        }
    }

    pub fn is_analyzed(&self) -> bool {
        self.outcome == AnalysisOutcome::Analyzed
    }
}

// =============================================================================
// CATEGORY
// =============================================================================

/// Named group of item indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub name: String,
    pub description: String,
    pub member_indices: BTreeSet<usize>,
}

impl Category {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            member_indices: BTreeSet::new(),
        }
    }

    pub fn with_members(mut self, members: impl IntoIterator<Item = usize>) -> Self {
        self.member_indices.extend(members);
        self
    }

    pub fn contains(&self, index: usize) -> bool {
        self.member_indices.contains(&index)
    }
}

/// Ordered list of categories.
///
/// Kept as a list so iteration order is deterministic; serialized as the
/// `{ name: { description, images } }` map the HTTP response exposes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategorySet(pub Vec<Category>);

impl CategorySet {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Category> {
        self.0.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Category> {
        self.0.iter().find(|c| c.name == name)
    }

    /// First category (in order) whose members include `index`.
    pub fn category_of(&self, index: usize) -> Option<&Category> {
        self.0.iter().find(|c| c.contains(index))
    }

    /// Add members to the category called `name`, creating it at the end
    /// if it does not exist yet. An existing category keeps its description.
    pub fn merge(
        &mut self,
        name: &str,
        description: &str,
        members: impl IntoIterator<Item = usize>,
    ) {
        match self.0.iter_mut().find(|c| c.name == name) {
            Some(existing) => existing.member_indices.extend(members),
            None => self
                .0
                .push(Category::new(name, description).with_members(members)),
        }
    }
}

impl From<Vec<Category>> for CategorySet {
    fn from(categories: Vec<Category>) -> Self {
        Self(categories)
    }
}

impl IntoIterator for CategorySet {
    type Item = Category;
    type IntoIter = std::vec::IntoIter<Category>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[derive(Serialize)]
struct CategoryEntry<'a> {
    description: &'a str,
    images: &'a BTreeSet<usize>,
}

impl Serialize for CategorySet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for category in &self.0 {
            map.serialize_entry(
                &category.name,
                &CategoryEntry {
                    description: &category.description,
                    images: &category.member_indices,
                },
            )?;
        }
        map.end()
    }
}

// =============================================================================
// RESULT
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Success,
    Error,
}

/// Analysis fields exposed to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultAnalysis {
    pub content: String,
    pub category: String,
    pub extracted_text: String,
    pub confidence: u8,
}

/// Final per-item unit returned to the caller, one per input item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageResult {
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_name: Option<String>,
    pub analysis: ResultAnalysis,
    pub status: ResultStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ImageResult {
    pub fn is_success(&self) -> bool {
        self.status == ResultStatus::Success
    }
}

/// Response body of the analyze endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub results: Vec<ImageResult>,
    pub categories: CategorySet,
    pub user_prompt: Option<String>,
}
