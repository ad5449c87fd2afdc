//! Runtime configuration for the matching engine.
//!
//! Mirrors the teacher's `env_base`/default-constant pattern: every knob has
//! a hardcoded default and can be overridden programmatically; nothing here
//! reads environment variables directly (that's the CLI's job).

use std::path::PathBuf;
use std::time::Duration;

/// Tunable parameters for `Engine`. Construct with `EngineConfig::default()`
/// and override individual fields, or use the builder methods.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Floor applied to a fuzzy match's selected score before it's accepted.
    pub fuzzy_threshold: f64,
    /// Post-filter applied in `batch_map_terms`: results below this
    /// confidence are dropped from a term's result list.
    pub min_confidence: f64,
    /// Maximum number of results returned per vocabulary.
    pub max_per_system: usize,
    /// Number of terms processed concurrently per batch chunk.
    pub batch_chunk_size: usize,
    /// Delay between batch chunks (not applied after the final chunk).
    pub batch_chunk_delay: Duration,
    /// Path to the JSON file backing `SynonymStore`. A missing file is
    /// treated as an empty store, not an error.
    pub synonyms_path: PathBuf,
    /// Timeout applied to each external lookup adapter call.
    pub adapter_timeout: Duration,
    /// Bypass the HTTP cache middleware for external lookups.
    pub bypass_cache: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: 0.70,
            min_confidence: 0.6,
            max_per_system: 5,
            batch_chunk_size: 5,
            batch_chunk_delay: Duration::from_millis(500),
            synonyms_path: PathBuf::from("synonyms.json"),
            adapter_timeout: Duration::from_secs(10),
            bypass_cache: false,
        }
    }
}

impl EngineConfig {
    pub fn with_synonyms_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.synonyms_path = path.into();
        self
    }

    pub fn with_fuzzy_threshold(mut self, threshold: f64) -> Self {
        self.fuzzy_threshold = threshold;
        self
    }

    pub fn with_min_confidence(mut self, min_confidence: f64) -> Self {
        self.min_confidence = min_confidence;
        self
    }
}
