//! Mutable synonym clusters, the only shared state the index itself doesn't own.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use tracing::warn;

use crate::error::EngineError;
use crate::normalize::normalize;

/// A set of unordered synonym clusters, persisted as `cluster_id -> members`.
/// Membership in any cluster pulls that cluster's other members into a
/// term's `VariationSet`. Reads take a read lock; writes go through a
/// writer lock and are flushed to disk.
#[derive(Clone)]
pub struct SynonymStore {
    clusters: Arc<RwLock<HashMap<String, HashSet<String>>>>,
    path: Option<PathBuf>,
}

impl SynonymStore {
    /// An empty, unbacked store (used by tests and as a default).
    pub fn empty() -> Self {
        Self {
            clusters: Arc::new(RwLock::new(HashMap::new())),
            path: None,
        }
    }

    /// Loads clusters from `path`. A missing file is treated as an empty
    /// store, not an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref().to_path_buf();
        let clusters = match std::fs::read_to_string(&path) {
            Ok(contents) => {
                let raw: HashMap<String, Vec<String>> =
                    serde_json::from_str(&contents).map_err(|err| EngineError::InputInvalid {
                        message: format!("malformed synonyms file: {err}"),
                    })?;
                raw.into_iter()
                    .map(|(id, members)| {
                        let normalized = members.iter().map(|m| normalize(m)).collect();
                        (id, normalized)
                    })
                    .collect()
            }
            Err(_) => HashMap::new(),
        };
        Ok(Self {
            clusters: Arc::new(RwLock::new(clusters)),
            path: Some(path),
        })
    }

    /// Every other member of any cluster `term` (already normalized) belongs to.
    pub fn cluster_members(&self, term: &str) -> HashSet<String> {
        let clusters = self.clusters.read().expect("synonym store lock poisoned");
        let mut out = HashSet::new();
        for members in clusters.values() {
            if members.contains(term) {
                out.extend(members.iter().cloned());
            }
        }
        out.remove(term);
        out
    }

    /// Adds `term` and `synonyms` as members of a single cluster keyed by
    /// `term`, merging into any existing cluster `term` already belongs to.
    /// Persists to disk; on persist failure the in-memory update is kept,
    /// the error is logged, and `false` is returned (spec.md §7 `SynonymPersistFailed`).
    pub fn add_synonym(&self, term: &str, synonyms: &[String]) -> bool {
        let t = normalize(term);
        let mut members: HashSet<String> = synonyms.iter().map(|s| normalize(s)).collect();
        members.insert(t.clone());

        {
            let mut clusters = self.clusters.write().expect("synonym store lock poisoned");
            let existing_key = clusters
                .iter()
                .find(|(_, existing)| existing.contains(&t))
                .map(|(id, _)| id.clone());

            match existing_key {
                Some(id) => {
                    clusters.entry(id).or_default().extend(members);
                }
                None => {
                    clusters.insert(t.clone(), members);
                }
            }
        }

        match self.persist() {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "failed to persist synonyms");
                false
            }
        }
    }

    fn persist(&self) -> Result<(), EngineError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let clusters = self.clusters.read().expect("synonym store lock poisoned");
        let serializable: HashMap<&String, Vec<&String>> = clusters
            .iter()
            .map(|(id, members)| (id, members.iter().collect()))
            .collect();
        let json = serde_json::to_string_pretty(&serializable).map_err(|err| {
            EngineError::SynonymPersistFailed {
                message: err.to_string(),
            }
        })?;

        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, json).map_err(|err| EngineError::SynonymPersistFailed {
            message: err.to_string(),
        })?;
        std::fs::rename(&tmp_path, path).map_err(|err| EngineError::SynonymPersistFailed {
            message: err.to_string(),
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_an_empty_store() {
        let store = SynonymStore::load("/nonexistent/path/synonyms.json").unwrap();
        assert!(store.cluster_members("covid-19").is_empty());
    }

    #[test]
    fn add_synonym_makes_members_mutually_visible() {
        let store = SynonymStore::empty();
        let ok = store.add_synonym(
            "covid-19",
            &["sars-cov-2".to_string(), "coronavirus disease 2019".to_string()],
        );
        assert!(ok); // no backing path configured, persist is a no-op
        let members = store.cluster_members("covid-19");
        assert!(members.contains("sars-cov-2"));
        assert!(members.contains("coronavirus disease 2019"));
    }
}
