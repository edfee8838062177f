//! Analyze-then-categorize orchestration.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, instrument};

use snapsort_core::{AnalyzeResponse, ImageTranscoder, InferenceClient, Item, Result};

use crate::analyzer::Analyzer;
use crate::assembler::assemble;
use crate::ingest::{validate_batch_size, Ingestor, RawImage};
use crate::synthesizer::{theme_partition, CategorySource, Synthesis, Synthesizer};
use crate::transcode::CommandTranscoder;

/// Pipeline settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Ask the model to group items; otherwise group by theme directly.
    pub smart_categories: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            smart_categories: true,
        }
    }
}

impl PipelineConfig {
    /// Read `SMART_CATEGORIES` (default true).
    pub fn from_env() -> Self {
        let smart_categories = std::env::var("SMART_CATEGORIES")
            .map(|v| !matches!(v.trim().to_lowercase().as_str(), "0" | "false" | "no" | "off"))
            .unwrap_or(true);
        Self { smart_categories }
    }

    pub fn with_smart_categories(mut self, enabled: bool) -> Self {
        self.smart_categories = enabled;
        self
    }
}

/// Ingest → analyze (parallel) → synthesize → assemble.
pub struct SortPipeline {
    ingestor: Ingestor,
    analyzer: Analyzer,
    synthesizer: Synthesizer,
    config: PipelineConfig,
}

impl SortPipeline {
    pub fn new(client: Arc<dyn InferenceClient>, transcoder: Arc<dyn ImageTranscoder>) -> Self {
        Self {
            ingestor: Ingestor::new(transcoder),
            analyzer: Analyzer::new(client.clone()),
            synthesizer: Synthesizer::new(client),
            config: PipelineConfig::default(),
        }
    }

    /// Build with the command-line HEIC transcoder from environment.
    pub fn from_env(client: Arc<dyn InferenceClient>) -> Self {
        Self::new(client, Arc::new(CommandTranscoder::from_env()))
            .with_config(PipelineConfig::from_env())
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> PipelineConfig {
        self.config
    }

    /// Run the full pipeline over raw uploads.
    ///
    /// Fails only for request-level problems (batch size, malformed
    /// payloads), and always before any inference call.
    #[instrument(skip(self, raw, user_prompt), fields(subsystem = "pipeline", component = "pipeline", op = "run", batch_size = raw.len()))]
    pub async fn run(
        &self,
        raw: Vec<RawImage>,
        user_prompt: Option<String>,
    ) -> Result<AnalyzeResponse> {
        let items = self.ingestor.ingest(raw).await?;
        self.analyze_items(items, user_prompt).await
    }

    /// Run analysis, synthesis and assembly over already ingested items.
    pub async fn analyze_items(
        &self,
        items: Vec<Item>,
        user_prompt: Option<String>,
    ) -> Result<AnalyzeResponse> {
        validate_batch_size(items.len())?;
        let start = Instant::now();
        let user_prompt = user_prompt
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());
        let directive = user_prompt.as_deref();

        let records = self.analyzer.analyze_all(&items, directive).await;

        let synthesis = if self.config.smart_categories {
            self.synthesizer.synthesize(&items, &records, directive).await
        } else {
            Synthesis {
                categories: theme_partition(&records),
                source: CategorySource::ThemeFallback,
            }
        };

        let response = assemble(&items, &records, synthesis.categories, user_prompt);

        info!(
            batch_size = items.len(),
            failed = response.results.iter().filter(|r| !r.is_success()).count(),
            category_count = response.categories.len(),
            smart = synthesis.source == CategorySource::Synthesized,
            duration_ms = start.elapsed().as_millis() as u64,
            "Batch analyzed"
        );
        Ok(response)
    }
}
