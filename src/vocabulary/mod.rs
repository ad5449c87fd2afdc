//! C1: read-only accessor over the three controlled vocabularies.

mod memory;
#[cfg(feature = "sqlite")]
mod sqlite;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;

pub use memory::InMemoryVocabularyStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteVocabularyStore;

use crate::error::EngineError;

/// One of the three controlled medical vocabularies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Vocabulary {
    Snomed,
    Loinc,
    Rxnorm,
}

impl Vocabulary {
    pub const ALL: [Vocabulary; 3] = [Vocabulary::Snomed, Vocabulary::Loinc, Vocabulary::Rxnorm];

    /// Canonical terminology URI (spec.md §3 `system_uri`).
    pub fn system_uri(self) -> &'static str {
        match self {
            Vocabulary::Snomed => "http://snomed.info/sct",
            Vocabulary::Loinc => "http://loinc.org",
            Vocabulary::Rxnorm => "http://www.nlm.nih.gov/research/umls/rxnorm",
        }
    }

    /// Name of the backing table, per the vocabulary store contract.
    pub fn table_name(self) -> &'static str {
        match self {
            Vocabulary::Snomed => "snomed_concepts",
            Vocabulary::Loinc => "loinc_concepts",
            Vocabulary::Rxnorm => "rxnorm_concepts",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Vocabulary::Snomed => "snomed",
            Vocabulary::Loinc => "loinc",
            Vocabulary::Rxnorm => "rxnorm",
        }
    }
}

impl fmt::Display for Vocabulary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Vocabulary {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "snomed" | "snomed-ct" | "snomed_ct" | "sct" => Ok(Vocabulary::Snomed),
            "loinc" => Ok(Vocabulary::Loinc),
            "rxnorm" => Ok(Vocabulary::Rxnorm),
            other => Err(EngineError::InputInvalid {
                message: format!("unknown vocabulary: {other}"),
            }),
        }
    }
}

/// A `(code, term, display)` row from one vocabulary's table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Concept {
    pub code: String,
    pub term: String,
    pub display: String,
}

/// Read-only access to vocabulary rows. No schema assumptions beyond the
/// three columns (spec.md §4.1); implementations may back onto a database,
/// a flat file, or an in-memory fixture.
#[async_trait]
pub trait VocabularyStore: Send + Sync {
    /// All rows for a vocabulary, in arbitrary order.
    async fn rows(&self, vocabulary: Vocabulary) -> Result<Vec<Concept>, EngineError>;

    /// Substring (`LIKE %pattern%`) lookup used by `fuzzy_search_db`.
    /// `limit` bounds the number of rows returned.
    async fn search_like(
        &self,
        vocabulary: Vocabulary,
        pattern: &str,
        limit: usize,
    ) -> Result<Vec<Concept>, EngineError>;
}
