//! C8: batch driver — bounded concurrent fan-out with per-term isolation.

use std::collections::HashMap;

use futures::future::join_all;
use tracing::info;

use crate::config::EngineConfig;
use crate::dispatcher::ResultRow;
use crate::index::VocabularyIndex;
use crate::sources::ExternalLookup;
use crate::synonyms::SynonymStore;
use crate::vocabulary::Vocabulary;

/// Outcome of mapping a single batch term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TermStatus {
    Success,
    NoMappings,
    Failed,
}

/// One term's mapping outcome within a batch (spec.md §4.8).
#[derive(Debug, Clone)]
pub struct TermResult {
    pub term: String,
    pub results: HashMap<Vocabulary, Vec<ResultRow>>,
    pub status: TermStatus,
    pub error: Option<String>,
}

/// Partitions `terms` into fixed-size chunks, schedules each chunk
/// concurrently, and waits a fixed delay between chunks (not after the
/// last). Order-preserving; one term's failure never aborts the batch.
#[allow(clippy::too_many_arguments)]
pub async fn batch_map_terms(
    terms: &[String],
    vocabularies: &[Vocabulary],
    indexes: &HashMap<Vocabulary, VocabularyIndex>,
    synonyms: &SynonymStore,
    adapters: &HashMap<Vocabulary, Box<dyn ExternalLookup>>,
    config: &EngineConfig,
    context: Option<&str>,
    max_per_system: usize,
) -> Vec<TermResult> {
    let mut results = Vec::with_capacity(terms.len());
    let chunks: Vec<&[String]> = terms.chunks(config.batch_chunk_size).collect();
    let chunk_count = chunks.len();

    for (i, chunk) in chunks.into_iter().enumerate() {
        let futures = chunk.iter().map(|term| {
            map_one_term(term, vocabularies, indexes, synonyms, adapters, config, context, max_per_system)
        });
        let chunk_results = join_all(futures).await;
        info!(chunk = i + 1, of = chunk_count, terms = chunk.len(), "batch chunk complete");
        results.extend(chunk_results);

        if i + 1 < chunk_count {
            tokio::time::sleep(config.batch_chunk_delay).await;
        }
    }

    results
}

async fn map_one_term(
    term: &str,
    vocabularies: &[Vocabulary],
    indexes: &HashMap<Vocabulary, VocabularyIndex>,
    synonyms: &SynonymStore,
    adapters: &HashMap<Vocabulary, Box<dyn ExternalLookup>>,
    config: &EngineConfig,
    context: Option<&str>,
    max_per_system: usize,
) -> TermResult {
    // An empty/blank term falls through to `dispatcher::map_term`, which
    // already returns an empty map for it, yielding `NoMappings` below.
    let mut results = crate::dispatcher::map_term(
        term, vocabularies, indexes, synonyms, adapters, config, context, max_per_system,
    )
    .await;

    apply_min_confidence(&mut results, config.min_confidence);
    let status = if results.is_empty() { TermStatus::NoMappings } else { TermStatus::Success };
    TermResult { term: term.to_string(), results, status, error: None }
}

fn apply_min_confidence(results: &mut HashMap<Vocabulary, Vec<ResultRow>>, min_confidence: f64) {
    results.retain(|_, rows| {
        rows.retain(|row| row.confidence >= min_confidence);
        !rows.is_empty()
    });
}
