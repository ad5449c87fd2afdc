//! C4: index builder — the exact-lookup map and TF-IDF matrix per vocabulary.

use std::collections::HashMap;

use tracing::{info, warn};

use crate::error::EngineError;
use crate::normalize::normalize;
use crate::synonyms::SynonymStore;
use crate::tfidf::{SparseVector, Vectorizer};
use crate::variation::variations;
use crate::vocabulary::{Concept, Vocabulary, VocabularyStore};

/// A `{code, display}` pair, the value type of `VocabularyIndex::exact`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExactEntry {
    pub code: String,
    pub display: String,
}

/// One vocabulary's built index. Immutable after construction; only
/// `SynonymStore` may change at runtime (§3 invariant 3).
pub struct VocabularyIndex {
    /// Lowercased variation string -> code/display. Last-writer-wins on collision.
    pub exact: HashMap<String, ExactEntry>,
    /// `(code, term_lower, display)`, aligned with `tfidf_rows`.
    pub terms: Vec<(String, String, String)>,
    pub vectorizer: Vectorizer,
    pub tfidf_rows: Vec<SparseVector>,
}

impl VocabularyIndex {
    pub fn row_count(&self) -> usize {
        self.terms.len()
    }
}

/// Builds one `VocabularyIndex` per vocabulary; a failure for one
/// vocabulary never prevents the others from being built (§4.4).
pub async fn build_all(
    store: &dyn VocabularyStore,
    synonyms: &SynonymStore,
) -> HashMap<Vocabulary, Result<VocabularyIndex, EngineError>> {
    let mut out = HashMap::new();
    for vocabulary in Vocabulary::ALL {
        let result = build_one(store, vocabulary, synonyms).await;
        match &result {
            Ok(index) => info!(%vocabulary, rows = index.row_count(), "vocabulary index built"),
            Err(err) => warn!(%vocabulary, error = %err, "vocabulary index build failed"),
        }
        out.insert(vocabulary, result);
    }
    out
}

async fn build_one(
    store: &dyn VocabularyStore,
    vocabulary: Vocabulary,
    synonyms: &SynonymStore,
) -> Result<VocabularyIndex, EngineError> {
    let rows: Vec<Concept> = store.rows(vocabulary).await?;

    let mut exact: HashMap<String, ExactEntry> = HashMap::new();
    let mut terms = Vec::with_capacity(rows.len());
    let mut term_strings = Vec::with_capacity(rows.len());

    for concept in rows {
        let term_lower = normalize(&concept.term);
        let entry = ExactEntry {
            code: concept.code.clone(),
            display: concept.display.clone(),
        };

        exact.insert(term_lower.clone(), entry.clone());
        for variation in variations(&term_lower, synonyms) {
            exact.insert(variation, entry.clone());
        }

        terms.push((concept.code, term_lower.clone(), concept.display));
        term_strings.push(term_lower);
    }

    let (vectorizer, tfidf_rows) = Vectorizer::fit(&term_strings);

    Ok(VocabularyIndex {
        exact,
        terms,
        vectorizer,
        tfidf_rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocabulary::InMemoryVocabularyStore;

    fn concept(code: &str, term: &str) -> Concept {
        Concept {
            code: code.to_string(),
            term: term.to_string(),
            display: term.to_string(),
        }
    }

    #[tokio::test]
    async fn exact_resolves_variations_to_the_source_concept() {
        let store = InMemoryVocabularyStore::new()
            .with_rows(Vocabulary::Snomed, vec![concept("22298006", "Myocardial Infarction")]);
        let synonyms = SynonymStore::empty();

        let built = build_all(&store, &synonyms).await;
        let index = built.get(&Vocabulary::Snomed).unwrap().as_ref().unwrap();

        assert_eq!(index.exact.get("mi").unwrap().code, "22298006");
        assert_eq!(index.exact.get("myocardial infarction").unwrap().code, "22298006");
    }

    #[tokio::test]
    async fn empty_vocabulary_builds_an_empty_index_not_an_error() {
        let store = InMemoryVocabularyStore::new();
        let synonyms = SynonymStore::empty();

        let built = build_all(&store, &synonyms).await;
        let index = built.get(&Vocabulary::Rxnorm).unwrap().as_ref().unwrap();
        assert_eq!(index.row_count(), 0);
    }
}
