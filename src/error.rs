//! Error taxonomy for the matching engine.
//!
//! Per the error-handling design: the engine never raises to callers for
//! data-quality or transient-I/O reasons. `EngineError` exists so internal
//! paths can be precise about *why* something degraded to an empty result,
//! but the public API (`Engine::map_term`, `batch_map_terms`, `add_synonym`)
//! only ever surfaces it via logging, never as a propagated `Err`.

use crate::vocabulary::Vocabulary;

#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error("vocabulary {vocabulary} is not initialized")]
    NotInitialized { vocabulary: Vocabulary },

    #[error("external lookup via {source} failed: {message}")]
    ExternalLookupFailed { source: String, message: String },

    #[error("local search failed: {message}")]
    LocalSearchFailed { message: String },

    #[error("mapping term {term:?} failed: {message}")]
    BatchTermFailed { term: String, message: String },

    #[error("failed to persist synonyms: {message}")]
    SynonymPersistFailed { message: String },

    #[error("invalid input: {message}")]
    InputInvalid { message: String },

    #[error("failed to build HTTP client: {0}")]
    HttpClientInit(#[source] reqwest::Error),
}
