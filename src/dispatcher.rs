//! C7: per-vocabulary dispatcher — fuses external lookup with local matching.

use std::collections::HashMap;

use rapidfuzz::distance::indel;
use rapidfuzz::fuzz;
use tracing::warn;

use crate::config::EngineConfig;
use crate::index::VocabularyIndex;
use crate::matcher::find_fuzzy_match;
use crate::sources::{ExternalLookup, LookupHit};
use crate::synonyms::SynonymStore;
use crate::vocabulary::Vocabulary;

/// One row of a `map_term` result: a single candidate code for one vocabulary.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub code: String,
    pub display: String,
    pub vocabulary: Vocabulary,
    pub confidence: f64,
    pub match_type: String,
    pub source: String,
    pub context_enhanced: bool,
    pub context_term: Option<String>,
}

/// `recompute_confidence`: independent of the §4.5 scorer thresholds.
/// Exact equality (trimmed, case-insensitive) -> 1.0; containment either
/// way -> `max(0.85, ratio/100)`; else the best of the three whole-string
/// scorers, rounded to two decimals.
pub fn recompute_confidence(term: &str, display: &str) -> f64 {
    let a = term.trim().to_lowercase();
    let b = display.trim().to_lowercase();

    if a == b {
        return 1.0;
    }

    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let ratio = indel::normalized_similarity(a_chars.iter().copied(), b_chars.iter().copied()) * 100.0;

    if !a.is_empty() && !b.is_empty() && (a.contains(&b) || b.contains(&a)) {
        return (ratio / 100.0).max(0.85);
    }

    let token_sort = fuzz::token_sort_ratio(a_chars.iter().copied(), b_chars.iter().copied());
    let token_set = fuzz::token_set_ratio(a_chars.iter().copied(), b_chars.iter().copied());
    let best = ratio.max(token_sort).max(token_set) / 100.0;
    (best * 100.0).round() / 100.0
}

/// Dispatches a single term against each requested vocabulary, isolating
/// per-vocabulary failures (an error on one never affects the others).
pub async fn map_term(
    term: &str,
    vocabularies: &[Vocabulary],
    indexes: &HashMap<Vocabulary, VocabularyIndex>,
    synonyms: &SynonymStore,
    adapters: &HashMap<Vocabulary, Box<dyn ExternalLookup>>,
    config: &EngineConfig,
    context: Option<&str>,
    max_per_system: usize,
) -> HashMap<Vocabulary, Vec<ResultRow>> {
    if term.trim().is_empty() {
        return HashMap::new();
    }

    let mut out = HashMap::new();
    for &vocabulary in vocabularies {
        let rows = map_term_one_vocabulary(
            term, vocabulary, indexes, synonyms, adapters, config, context, max_per_system,
        )
        .await;
        if !rows.is_empty() {
            out.insert(vocabulary, rows);
        }
    }
    out
}

async fn map_term_one_vocabulary(
    term: &str,
    vocabulary: Vocabulary,
    indexes: &HashMap<Vocabulary, VocabularyIndex>,
    synonyms: &SynonymStore,
    adapters: &HashMap<Vocabulary, Box<dyn ExternalLookup>>,
    config: &EngineConfig,
    context: Option<&str>,
    max_per_system: usize,
) -> Vec<ResultRow> {
    // 1. External lookup.
    if let Some(adapter) = adapters.get(&vocabulary) {
        let hits = adapter.search(term, max_per_system).await;
        if !hits.is_empty() {
            let mut rows = compose_api_rows(term, vocabulary, hits);
            rows.truncate(max_per_system);
            return rows;
        }
    }

    // 2. Fall back to local matching.
    let Some(index) = indexes.get(&vocabulary) else {
        warn!(%vocabulary, "vocabulary index unavailable, skipping");
        return Vec::new();
    };

    match find_fuzzy_match(term, vocabulary, index, synonyms, config.fuzzy_threshold, context) {
        Some(m) => vec![ResultRow {
            code: m.code,
            display: m.display,
            vocabulary,
            confidence: m.score_0_100 / 100.0,
            match_type: m.match_type.to_string(),
            source: "local_database".to_string(),
            context_enhanced: m.context_enhanced,
            context_term: m.context_term,
        }],
        None => Vec::new(),
    }
}

fn compose_api_rows(term: &str, vocabulary: Vocabulary, hits: Vec<LookupHit>) -> Vec<ResultRow> {
    let mut rows: Vec<ResultRow> = hits
        .into_iter()
        .map(|hit| ResultRow {
            confidence: recompute_confidence(term, &hit.display),
            code: hit.code,
            display: hit.display,
            vocabulary,
            match_type: "api".to_string(),
            source: hit.source,
            context_enhanced: false,
            context_term: None,
        })
        .collect();
    rows.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_equality_is_confidence_one() {
        assert_eq!(recompute_confidence("Diabetes Mellitus", "diabetes mellitus"), 1.0);
    }

    #[test]
    fn containment_floors_at_0_85() {
        let confidence = recompute_confidence("diabetes", "diabetes mellitus type 2");
        assert!(confidence >= 0.85);
    }

    #[test]
    fn unrelated_strings_score_low() {
        let confidence = recompute_confidence("asthma", "myocardial infarction");
        assert!(confidence < 0.5);
    }
}
