//! C5: similarity matchers — five parallel scorers with best-of selection.

use crate::context;
use crate::index::VocabularyIndex;
use crate::normalize::normalize;
use crate::synonyms::SynonymStore;
use crate::variation::variations;
use crate::vocabulary::Vocabulary;

/// One scored candidate returned by `find_fuzzy_match`.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    pub code: String,
    pub display: String,
    pub match_type: &'static str,
    pub score_0_100: f64,
    pub context_enhanced: bool,
    pub context_term: Option<String>,
}

const RATIO_THRESHOLD: f64 = 90.0;
const PARTIAL_RATIO_THRESHOLD: f64 = 95.0;
const TOKEN_SORT_THRESHOLD: f64 = 85.0;
const TOKEN_SET_THRESHOLD: f64 = 85.0;
const COSINE_THRESHOLD: f64 = 0.70;
const PARTIAL_RATIO_LENGTH_GATE: f64 = 0.30;

#[cfg(feature = "fallback-scorers")]
const LCS_RATIO_THRESHOLD: f64 = 80.0;
#[cfg(feature = "fallback-scorers")]
const JACCARD_THRESHOLD: f64 = 70.0;

struct Candidate {
    key: String,
    score: f64,
    threshold: f64,
    match_type: &'static str,
}

/// Local fuzzy matching against one vocabulary's index. `fuzzy_threshold`
/// is a floor applied to the winning scorer's selected score (§9 open
/// question resolution); it does not override the per-scorer thresholds.
pub fn find_fuzzy_match(
    term: &str,
    vocabulary: Vocabulary,
    index: &VocabularyIndex,
    synonyms: &SynonymStore,
    fuzzy_threshold: f64,
    context: Option<&str>,
) -> Option<Match> {
    let normalized = normalize(term);
    if normalized.is_empty() {
        return None;
    }
    let variants = variations(&normalized, synonyms);

    // 1. Exact probe: deterministic order over variations, first hit short-circuits.
    let mut ordered: Vec<&String> = variants.iter().collect();
    ordered.sort();
    for variant in ordered {
        if let Some(entry) = index.exact.get(variant) {
            let mut result = Match {
                code: entry.code.clone(),
                display: entry.display.clone(),
                match_type: "variation",
                score_0_100: 100.0,
                context_enhanced: false,
                context_term: None,
            };
            apply_context(&mut result, vocabulary, context);
            return Some(result);
        }
    }

    // 2. Multi-scorer run against the full variation-augmented key set.
    let candidates: Vec<Candidate> = score_all(&normalized, &variants, index);

    // 3. Best-of selection among scorers that cleared their threshold.
    let winner = candidates
        .into_iter()
        .filter(|c| c.score >= c.threshold)
        .max_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(std::cmp::Ordering::Equal))?;

    if winner.score < fuzzy_threshold * 100.0 {
        return None;
    }

    let entry = index.exact.get(&winner.key)?;
    let mut result = Match {
        code: entry.code.clone(),
        display: entry.display.clone(),
        match_type: winner.match_type,
        score_0_100: winner.score,
        context_enhanced: false,
        context_term: None,
    };

    // 4. Context adjustment.
    apply_context(&mut result, vocabulary, context);

    Some(result)
}

fn apply_context(result: &mut Match, vocabulary: Vocabulary, context: Option<&str>) {
    let Some(ctx) = context else { return };
    if ctx.trim().is_empty() {
        return;
    }
    if let Some(adjustment) = context::apply(vocabulary, &result.display, ctx) {
        result.score_0_100 = (result.score_0_100 + 10.0).min(100.0);
        result.context_enhanced = true;
        result.context_term = Some(adjustment.cue);
    }
}

#[cfg(not(feature = "fallback-scorers"))]
fn score_all(normalized: &str, variants: &std::collections::HashSet<String>, index: &VocabularyIndex) -> Vec<Candidate> {
    use rapidfuzz::distance::indel;
    use rapidfuzz::fuzz;

    let query_chars: Vec<char> = normalized.chars().collect();
    let mut out = Vec::new();

    let mut best_ratio: Option<(String, f64)> = None;
    let mut best_partial: Option<(String, f64)> = None;
    let mut best_token_sort: Option<(String, f64)> = None;
    let mut best_token_set: Option<(String, f64)> = None;

    for key in index.exact.keys() {
        let key_chars: Vec<char> = key.chars().collect();

        let ratio = indel::normalized_similarity(query_chars.iter().copied(), key_chars.iter().copied()) * 100.0;
        update_best(&mut best_ratio, key, ratio);

        let length_ratio = query_chars.len().min(key_chars.len()) as f64
            / query_chars.len().max(key_chars.len()).max(1) as f64;
        if length_ratio >= PARTIAL_RATIO_LENGTH_GATE {
            let partial = fuzz::partial_ratio(query_chars.iter().copied(), key_chars.iter().copied());
            update_best(&mut best_partial, key, partial);
        }

        let token_sort = fuzz::token_sort_ratio(query_chars.iter().copied(), key_chars.iter().copied());
        update_best(&mut best_token_sort, key, token_sort);

        let token_set = fuzz::token_set_ratio(query_chars.iter().copied(), key_chars.iter().copied());
        update_best(&mut best_token_set, key, token_set);
    }

    if let Some((key, score)) = best_ratio {
        out.push(Candidate { key, score, threshold: RATIO_THRESHOLD, match_type: "ratio" });
    }
    if let Some((key, score)) = best_partial {
        out.push(Candidate { key, score, threshold: PARTIAL_RATIO_THRESHOLD, match_type: "partial_ratio" });
    }
    if let Some((key, score)) = best_token_sort {
        out.push(Candidate { key, score, threshold: TOKEN_SORT_THRESHOLD, match_type: "token_sort_ratio" });
    }
    if let Some((key, score)) = best_token_set {
        out.push(Candidate { key, score, threshold: TOKEN_SET_THRESHOLD, match_type: "token_set_ratio" });
    }

    if let Some(cosine) = best_cosine(normalized, index) {
        out.push(Candidate {
            key: cosine.0,
            score: cosine.1 * 100.0,
            threshold: COSINE_THRESHOLD * 100.0,
            match_type: "cosine",
        });
    }

    let _ = variants;
    out
}

#[cfg(feature = "fallback-scorers")]
fn score_all(normalized: &str, variants: &std::collections::HashSet<String>, index: &VocabularyIndex) -> Vec<Candidate> {
    let query_tokens: std::collections::HashSet<&str> = normalized.split_whitespace().collect();

    let mut best_lcs: Option<(String, f64)> = None;
    let mut best_jaccard: Option<(String, f64)> = None;

    for key in index.exact.keys() {
        let lcs = lcs_ratio(normalized, key) * 100.0;
        update_best(&mut best_lcs, key, lcs);

        let key_tokens: std::collections::HashSet<&str> = key.split_whitespace().collect();
        let jaccard = jaccard_similarity(&query_tokens, &key_tokens) * 100.0;
        update_best(&mut best_jaccard, key, jaccard);
    }

    let mut out = Vec::new();
    if let Some((key, score)) = best_lcs {
        out.push(Candidate { key, score, threshold: LCS_RATIO_THRESHOLD, match_type: "ratio" });
    }
    if let Some((key, score)) = best_jaccard {
        out.push(Candidate { key, score, threshold: JACCARD_THRESHOLD, match_type: "token_set_ratio" });
    }
    let _ = variants;
    out
}

fn update_best(slot: &mut Option<(String, f64)>, key: &str, score: f64) {
    let better = match slot {
        Some((_, current)) => score > *current,
        None => true,
    };
    if better {
        *slot = Some((key.to_string(), score));
    }
}

fn best_cosine(normalized: &str, index: &VocabularyIndex) -> Option<(String, f64)> {
    let query_vector = index.vectorizer.transform(normalized);
    if query_vector.is_empty() {
        return None;
    }
    index
        .terms
        .iter()
        .zip(index.tfidf_rows.iter())
        .map(|((_, term_lower, _), row)| {
            (term_lower.clone(), crate::tfidf::cosine_similarity(&query_vector, row))
        })
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
}

#[cfg(feature = "fallback-scorers")]
fn lcs_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let mut dp = vec![vec![0usize; b.len() + 1]; a.len() + 1];
    for i in 1..=a.len() {
        for j in 1..=b.len() {
            dp[i][j] = if a[i - 1] == b[j - 1] {
                dp[i - 1][j - 1] + 1
            } else {
                dp[i - 1][j].max(dp[i][j - 1])
            };
        }
    }
    let lcs_len = dp[a.len()][b.len()] as f64;
    (2.0 * lcs_len) / (a.len() + b.len()) as f64
}

#[cfg(feature = "fallback-scorers")]
fn jaccard_similarity(a: &std::collections::HashSet<&str>, b: &std::collections::HashSet<&str>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count() as f64;
    let union = a.union(b).count() as f64;
    if union == 0.0 {
        0.0
    } else {
        intersection / union
    }
}

/// Alternative path for a caller holding a vocabulary store handle but no
/// in-memory index (§4.5 `fuzzy_search_db`).
pub async fn fuzzy_search_db(
    term: &str,
    store: &dyn crate::vocabulary::VocabularyStore,
    vocabulary: crate::vocabulary::Vocabulary,
    synonyms: &SynonymStore,
) -> Vec<Match> {
    #[cfg(not(feature = "fallback-scorers"))]
    use rapidfuzz::distance::indel;

    let normalized = normalize(term);
    if normalized.is_empty() {
        return Vec::new();
    }
    let variants = variations(&normalized, synonyms);

    let mut by_code: std::collections::HashMap<String, Match> = std::collections::HashMap::new();
    for variant in variants.iter().filter(|v| v.chars().count() >= 3) {
        let Ok(rows) = store.search_like(vocabulary, variant, 20).await else {
            continue;
        };
        for row in rows {
            #[cfg(not(feature = "fallback-scorers"))]
            let similarity = indel::normalized_similarity(
                normalized.chars(),
                normalize(&row.term).chars(),
            ) * 100.0;
            #[cfg(feature = "fallback-scorers")]
            let similarity = lcs_ratio(&normalized, &normalize(&row.term)) * 100.0;

            #[cfg(not(feature = "fallback-scorers"))]
            let threshold = RATIO_THRESHOLD;
            #[cfg(feature = "fallback-scorers")]
            let threshold = LCS_RATIO_THRESHOLD;

            if similarity < threshold {
                continue;
            }

            let candidate = Match {
                code: row.code.clone(),
                display: row.display,
                match_type: "ratio",
                score_0_100: similarity,
                context_enhanced: false,
                context_term: None,
            };

            let better = by_code
                .get(&row.code)
                .map(|existing| candidate.score_0_100 > existing.score_0_100)
                .unwrap_or(true);
            if better {
                by_code.insert(row.code, candidate);
            }
        }
    }

    let mut results: Vec<Match> = by_code.into_values().collect();
    results.sort_by(|a, b| b.score_0_100.partial_cmp(&a.score_0_100).unwrap_or(std::cmp::Ordering::Equal));
    results.truncate(10);
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::build_all;
    use crate::vocabulary::{Concept, InMemoryVocabularyStore, Vocabulary};

    fn concept(code: &str, term: &str) -> Concept {
        Concept {
            code: code.to_string(),
            term: term.to_string(),
            display: term.to_string(),
        }
    }

    #[tokio::test]
    async fn exact_variation_hit_scores_100() {
        let store = InMemoryVocabularyStore::new()
            .with_rows(Vocabulary::Snomed, vec![concept("22298006", "Myocardial Infarction")]);
        let synonyms = SynonymStore::empty();
        let built = build_all(&store, &synonyms).await;
        let index = built.get(&Vocabulary::Snomed).unwrap().as_ref().unwrap();

        let result = find_fuzzy_match("MI", Vocabulary::Snomed, index, &synonyms, 0.0, None).unwrap();
        assert_eq!(result.code, "22298006");
        assert_eq!(result.match_type, "variation");
        assert_eq!(result.score_0_100, 100.0);
    }

    #[tokio::test]
    async fn typo_resolves_via_ratio() {
        let store = InMemoryVocabularyStore::new()
            .with_rows(Vocabulary::Loinc, vec![concept("4548-4", "Hemoglobin A1c")]);
        let synonyms = SynonymStore::empty();
        let built = build_all(&store, &synonyms).await;
        let index = built.get(&Vocabulary::Loinc).unwrap().as_ref().unwrap();

        let result = find_fuzzy_match("hemaglobin a1c", Vocabulary::Loinc, index, &synonyms, 0.0, None);
        assert!(result.is_some());
        assert!(result.unwrap().score_0_100 >= 90.0);
    }

    #[tokio::test]
    async fn partial_ratio_length_gate_rejects_short_query_against_long_candidate() {
        let store = InMemoryVocabularyStore::new().with_rows(
            Vocabulary::Snomed,
            vec![
                concept("999", "pneumonoultramicroscopicsilicovolcanoconiosis"),
                concept("69896004", "Rheumatoid arthritis"),
            ],
        );
        let synonyms = SynonymStore::empty();
        let built = build_all(&store, &synonyms).await;
        let index = built.get(&Vocabulary::Snomed).unwrap().as_ref().unwrap();

        // "ra" expands to "rheumatoid arthritis" via abbreviation, an exact
        // variation hit, so the length-gated partial-ratio candidate never
        // gets a chance to win.
        let result = find_fuzzy_match("ra", Vocabulary::Snomed, index, &synonyms, 0.0, None).unwrap();
        assert_eq!(result.code, "69896004");
    }
}
