//! Sparse TF-IDF vectorizer and cosine similarity, unigram+bigram, fitted
//! independently per vocabulary (never shared across vocabularies, per
//! §3 invariant 4).

use std::collections::HashMap;

use crate::normalize::{tokenize, STOPWORDS};

/// A sparse term-weight vector, keyed by vocabulary-local term index.
pub type SparseVector = Vec<(u32, f64)>;

/// A fitted TF-IDF transform for one vocabulary: its term vocabulary, the
/// IDF weight of each term, and the n-gram range used to build it.
#[derive(Debug, Clone)]
pub struct Vectorizer {
    term_index: HashMap<String, u32>,
    idf: Vec<f64>,
}

impl Vectorizer {
    /// Fits a vectorizer over `documents` (already-lowercase term strings)
    /// and returns it along with each document's TF-IDF row.
    pub fn fit(documents: &[String]) -> (Self, Vec<SparseVector>) {
        let doc_grams: Vec<Vec<String>> = documents.iter().map(|d| ngrams(d)).collect();

        let mut term_index: HashMap<String, u32> = HashMap::new();
        let mut doc_freq: HashMap<u32, u32> = HashMap::new();
        for grams in &doc_grams {
            let mut seen = std::collections::HashSet::new();
            for gram in grams {
                let next_id = term_index.len() as u32;
                let id = *term_index.entry(gram.clone()).or_insert(next_id);
                if seen.insert(id) {
                    *doc_freq.entry(id).or_insert(0) += 1;
                }
            }
        }

        let n_docs = documents.len().max(1) as f64;
        let mut idf = vec![0.0; term_index.len()];
        for (&id, &df) in doc_freq.iter() {
            // smoothed IDF, as scikit-learn's TfidfVectorizer default: ln((1+n)/(1+df)) + 1
            idf[id as usize] = ((1.0 + n_docs) / (1.0 + df as f64)).ln() + 1.0;
        }

        let vectorizer = Self { term_index, idf };
        let rows = doc_grams
            .iter()
            .map(|grams| vectorizer.transform_grams(grams))
            .collect();
        (vectorizer, rows)
    }

    /// Transforms a raw string into a TF-IDF row using this vectorizer's
    /// fitted vocabulary. Terms unseen at fit time are dropped.
    pub fn transform(&self, text: &str) -> SparseVector {
        self.transform_grams(&ngrams(text))
    }

    fn transform_grams(&self, grams: &[String]) -> SparseVector {
        let mut counts: HashMap<u32, u32> = HashMap::new();
        for gram in grams {
            if let Some(&id) = self.term_index.get(gram) {
                *counts.entry(id).or_insert(0) += 1;
            }
        }
        let total = grams.len().max(1) as f64;
        let mut row: SparseVector = counts
            .into_iter()
            .map(|(id, count)| {
                let tf = count as f64 / total;
                (id, tf * self.idf[id as usize])
            })
            .collect();
        row.sort_by_key(|(id, _)| *id);
        row
    }
}

/// Unigram + bigram tokens over the shared normalizer/stopword pipeline.
fn ngrams(text: &str) -> Vec<String> {
    let tokens = tokenize(text);
    let mut grams: Vec<String> = tokens.clone();
    for window in tokens.windows(2) {
        grams.push(format!("{} {}", window[0], window[1]));
    }
    grams
}

/// Cosine similarity between two sparse vectors, both assumed sorted by index.
pub fn cosine_similarity(a: &SparseVector, b: &SparseVector) -> f64 {
    let mut i = 0;
    let mut j = 0;
    let mut dot = 0.0;
    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            std::cmp::Ordering::Equal => {
                dot += a[i].1 * b[j].1;
                i += 1;
                j += 1;
            }
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
        }
    }
    let norm_a = (a.iter().map(|(_, w)| w * w).sum::<f64>()).sqrt();
    let norm_b = (b.iter().map(|(_, w)| w * w).sum::<f64>()).sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_terms_score_cosine_one() {
        let docs = vec!["myocardial infarction".to_string(), "diabetes mellitus".to_string()];
        let (vectorizer, rows) = Vectorizer::fit(&docs);
        let probe = vectorizer.transform("myocardial infarction");
        let similarity = cosine_similarity(&probe, &rows[0]);
        assert!((similarity - 1.0).abs() < 1e-9);
    }

    #[test]
    fn unrelated_terms_score_low_cosine() {
        let docs = vec!["myocardial infarction".to_string(), "diabetes mellitus".to_string()];
        let (vectorizer, rows) = Vectorizer::fit(&docs);
        let probe = vectorizer.transform("diabetes mellitus");
        let similarity = cosine_similarity(&probe, &rows[0]);
        assert!(similarity < 0.5);
    }

    #[test]
    fn stopwords_are_excluded_from_the_vocabulary() {
        let docs = vec!["history of the disease".to_string()];
        let (vectorizer, _) = Vectorizer::fit(&docs);
        for stopword in ["the", "of"] {
            assert!(STOPWORDS.contains(stopword));
            let row = vectorizer.transform(stopword);
            assert!(row.is_empty(), "stopword {stopword:?} should not be indexed");
        }
    }
}
