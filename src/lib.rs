//! `termmap`: a fuzzy matching engine mapping free-text clinical terms to
//! SNOMED CT, LOINC, and RxNorm codes.
//!
//! The public surface is [`engine::Engine`]; everything else is the
//! machinery it composes (vocabulary access, normalization, variation
//! generation, TF-IDF/rapidfuzz scoring, context adjustment, external
//! lookup adapters, and the batch driver).

pub mod batch;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod index;
pub mod matcher;
pub mod normalize;
pub mod sources;
pub mod synonyms;
pub mod tfidf;
pub mod variation;
pub mod vocabulary;

pub use batch::{TermResult, TermStatus};
pub use config::EngineConfig;
pub use dispatcher::ResultRow;
pub use engine::{Engine, SystemInfo};
pub use error::EngineError;
pub use vocabulary::{Concept, InMemoryVocabularyStore, Vocabulary, VocabularyStore};

#[cfg(feature = "sqlite")]
pub use vocabulary::SqliteVocabularyStore;
