use std::collections::HashMap;

use async_trait::async_trait;

use super::{Concept, Vocabulary, VocabularyStore};
use crate::error::EngineError;

/// An in-memory `VocabularyStore`, used by the CLI demo and by tests.
///
/// Rows are held verbatim; `search_like` does a case-insensitive substring
/// scan, which is adequate for fixture-sized vocabularies and mirrors the
/// semantics of a SQL `LIKE '%pattern%'` query without requiring a database.
#[derive(Debug, Default, Clone)]
pub struct InMemoryVocabularyStore {
    rows: HashMap<Vocabulary, Vec<Concept>>,
}

impl InMemoryVocabularyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(mut self, vocabulary: Vocabulary, rows: Vec<Concept>) -> Self {
        self.rows.insert(vocabulary, rows);
        self
    }

    pub fn insert(&mut self, vocabulary: Vocabulary, concept: Concept) {
        self.rows.entry(vocabulary).or_default().push(concept);
    }
}

#[async_trait]
impl VocabularyStore for InMemoryVocabularyStore {
    async fn rows(&self, vocabulary: Vocabulary) -> Result<Vec<Concept>, EngineError> {
        Ok(self.rows.get(&vocabulary).cloned().unwrap_or_default())
    }

    async fn search_like(
        &self,
        vocabulary: Vocabulary,
        pattern: &str,
        limit: usize,
    ) -> Result<Vec<Concept>, EngineError> {
        let needle = pattern.to_lowercase();
        let hits = self
            .rows
            .get(&vocabulary)
            .into_iter()
            .flatten()
            .filter(|c| c.term.to_lowercase().contains(&needle))
            .take(limit)
            .cloned()
            .collect();
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn concept(code: &str, term: &str) -> Concept {
        Concept {
            code: code.to_string(),
            term: term.to_string(),
            display: term.to_string(),
        }
    }

    #[tokio::test]
    async fn rows_are_scoped_per_vocabulary() {
        let store = InMemoryVocabularyStore::new()
            .with_rows(Vocabulary::Snomed, vec![concept("1", "diabetes")])
            .with_rows(Vocabulary::Loinc, vec![concept("2", "glucose")]);

        assert_eq!(store.rows(Vocabulary::Snomed).await.unwrap().len(), 1);
        assert_eq!(store.rows(Vocabulary::Rxnorm).await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn search_like_matches_substring_case_insensitively() {
        let store = InMemoryVocabularyStore::new().with_rows(
            Vocabulary::Snomed,
            vec![concept("1", "Myocardial infarction"), concept("2", "asthma")],
        );

        let hits = store
            .search_like(Vocabulary::Snomed, "MYOCARDIAL", 10)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].code, "1");
    }
}
