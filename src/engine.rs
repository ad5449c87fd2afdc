//! The public `Engine` handle tying together the index, synonym store,
//! external adapters, and dispatch/batch logic.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use crate::batch::{batch_map_terms, TermResult};
use crate::config::EngineConfig;
use crate::dispatcher::{map_term as dispatch_map_term, ResultRow};
use crate::index::{build_all, VocabularyIndex};
use crate::sources::{ClinicalTablesAdapter, ExternalLookup, RxNormAdapter, SnomedBrowserAdapter};
use crate::synonyms::SynonymStore;
use crate::vocabulary::{Vocabulary, VocabularyStore};

/// Per-vocabulary readiness summary for `get_systems_info`.
#[derive(Debug, Clone)]
pub struct SystemInfo {
    pub uri: &'static str,
    pub ready: bool,
    pub row_count: usize,
}

/// The engine handle: an immutable, shared vocabulary index plus a
/// mutable `SynonymStore`, constructed once and passed to callers (§9:
/// "explicit engine handle" replacing a source-level singleton).
pub struct Engine {
    indexes: Arc<HashMap<Vocabulary, VocabularyIndex>>,
    unready: HashMap<Vocabulary, String>,
    synonyms: SynonymStore,
    adapters: HashMap<Vocabulary, Box<dyn ExternalLookup>>,
    config: EngineConfig,
}

impl Engine {
    /// Builds the index once (C4) and wires up external adapters. Index
    /// build failures for individual vocabularies are recorded, not fatal.
    pub async fn build(store: &dyn VocabularyStore, config: EngineConfig) -> Self {
        let synonyms = match SynonymStore::load(&config.synonyms_path) {
            Ok(store) => store,
            Err(err) => {
                tracing::warn!(error = %err, "failed to load synonyms file, starting empty");
                SynonymStore::empty()
            }
        };

        let built = build_all(store, &synonyms).await;
        let mut indexes = HashMap::new();
        let mut unready = HashMap::new();
        for (vocabulary, result) in built {
            match result {
                Ok(index) => {
                    indexes.insert(vocabulary, index);
                }
                Err(err) => {
                    unready.insert(vocabulary, err.to_string());
                }
            }
        }

        let adapters: HashMap<Vocabulary, Box<dyn ExternalLookup>> = [
            (
                Vocabulary::Snomed,
                Box::new(SnomedBrowserAdapter::new(config.bypass_cache, config.adapter_timeout)) as Box<dyn ExternalLookup>,
            ),
            (
                Vocabulary::Loinc,
                Box::new(ClinicalTablesAdapter::loinc(config.bypass_cache, config.adapter_timeout)) as Box<dyn ExternalLookup>,
            ),
            (
                Vocabulary::Rxnorm,
                Box::new(RxNormAdapter::new(config.bypass_cache, config.adapter_timeout)) as Box<dyn ExternalLookup>,
            ),
        ]
        .into_iter()
        .collect();

        info!(ready = indexes.len(), unready = unready.len(), "engine built");

        Self {
            indexes: Arc::new(indexes),
            unready,
            synonyms,
            adapters,
            config,
        }
    }

    /// Maps a single term against the requested vocabularies.
    pub async fn map_term(
        &self,
        term: &str,
        vocabularies: &[Vocabulary],
        context: Option<&str>,
        max_per_system: usize,
    ) -> HashMap<Vocabulary, Vec<ResultRow>> {
        dispatch_map_term(
            term,
            vocabularies,
            &self.indexes,
            &self.synonyms,
            &self.adapters,
            &self.config,
            context,
            max_per_system,
        )
        .await
    }

    /// Maps a batch of terms with bounded concurrent fan-out (C8).
    pub async fn batch_map_terms(
        &self,
        terms: &[String],
        vocabularies: &[Vocabulary],
        context: Option<&str>,
        max_per_system: usize,
    ) -> Vec<TermResult> {
        batch_map_terms(
            terms,
            vocabularies,
            &self.indexes,
            &self.synonyms,
            &self.adapters,
            &self.config,
            context,
            max_per_system,
        )
        .await
    }

    /// Adds `term` and `synonyms` as a mutually-visible cluster. Returns
    /// `false` if the in-memory update succeeded but persisting to disk
    /// failed (spec.md §7 `SynonymPersistFailed`); the update is kept either way.
    pub fn add_synonym(&self, term: &str, synonyms: &[String]) -> bool {
        self.synonyms.add_synonym(term, synonyms)
    }

    /// Per-vocabulary readiness and row counts.
    pub fn get_systems_info(&self) -> HashMap<Vocabulary, SystemInfo> {
        Vocabulary::ALL
            .into_iter()
            .map(|vocabulary| {
                let info = match self.indexes.get(&vocabulary) {
                    Some(index) => SystemInfo {
                        uri: vocabulary.system_uri(),
                        ready: index.row_count() > 0,
                        row_count: index.row_count(),
                    },
                    None => SystemInfo {
                        uri: vocabulary.system_uri(),
                        ready: false,
                        row_count: 0,
                    },
                };
                (vocabulary, info)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocabulary::{Concept, InMemoryVocabularyStore};

    fn concept(code: &str, term: &str) -> Concept {
        Concept {
            code: code.to_string(),
            term: term.to_string(),
            display: term.to_string(),
        }
    }

    #[tokio::test]
    async fn empty_vocabulary_is_reported_unready() {
        let store = InMemoryVocabularyStore::new()
            .with_rows(Vocabulary::Snomed, vec![concept("22298006", "Myocardial infarction")]);
        let config = EngineConfig::default().with_synonyms_path("/nonexistent/synonyms.json");
        let engine = Engine::build(&store, config).await;

        let info = engine.get_systems_info();
        assert!(info[&Vocabulary::Snomed].ready);
        assert!(!info[&Vocabulary::Rxnorm].ready);
    }

    #[tokio::test]
    async fn add_synonym_affects_subsequent_lookups() {
        let store = InMemoryVocabularyStore::new()
            .with_rows(Vocabulary::Snomed, vec![concept("840539006", "COVID-19")]);
        let config = EngineConfig::default()
            .with_synonyms_path("/nonexistent/synonyms.json")
            .with_fuzzy_threshold(0.0);
        let engine = Engine::build(&store, config).await;

        engine.add_synonym("covid-19", &["sars-cov-2".to_string()]);

        let by_synonym = engine.map_term("sars-cov-2", &[Vocabulary::Snomed], None, 5).await;
        let by_original = engine.map_term("covid-19", &[Vocabulary::Snomed], None, 5).await;

        assert_eq!(
            by_synonym[&Vocabulary::Snomed][0].code,
            by_original[&Vocabulary::Snomed][0].code
        );
    }
}
