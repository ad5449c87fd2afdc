//! C9: external lookup adapters — a uniform view over three remote
//! code-lookup services, each wrapped so no adapter error ever propagates.

mod clinical_tables;
mod rxnorm;
mod snomed_browser;

pub use clinical_tables::ClinicalTablesAdapter;
pub use rxnorm::RxNormAdapter;
pub use snomed_browser::SnomedBrowserAdapter;

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use http_cache_reqwest::{Cache, CacheMode, HttpCache, HttpCacheOptions, MokaManager};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, RequestBuilder};
use reqwest_retry::policies::ExponentialBackoff;
use reqwest_retry::RetryTransientMiddleware;

use crate::error::EngineError;

/// One candidate returned by an adapter's `search`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupHit {
    pub code: String,
    pub display: String,
    pub source: String,
}

/// Uniform interface over the three remote code-lookup services.
#[async_trait]
pub trait ExternalLookup: Send + Sync {
    /// Never propagates: all I/O, parse, and status errors are converted
    /// into an empty result plus a logged warning (spec.md §4.9).
    async fn search(&self, term: &str, max_results: usize) -> Vec<LookupHit>;
}

/// Builds the shared HTTP client middleware stack: response caching plus
/// exponential-backoff retry on transient failures. One client is reused
/// by every adapter.
pub fn shared_client() -> Result<ClientWithMiddleware, EngineError> {
    static SHARED: OnceLock<ClientWithMiddleware> = OnceLock::new();
    if let Some(client) = SHARED.get() {
        return Ok(client.clone());
    }

    let base = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(5))
        .user_agent(concat!("termmap/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(EngineError::HttpClientInit)?;

    let retry_policy = ExponentialBackoff::builder().build_with_max_retries(2);
    let client = ClientBuilder::new(base)
        .with(Cache(HttpCache {
            mode: CacheMode::Default,
            manager: MokaManager::default(),
            options: HttpCacheOptions::default(),
        }))
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build();

    match SHARED.set(client.clone()) {
        Ok(()) => Ok(client),
        Err(_) => Ok(SHARED.get().expect("set just above").clone()),
    }
}

/// Resolves a base URL: `override_env` wins, else `default`.
pub fn env_base(default: &'static str, override_env: &'static str) -> String {
    std::env::var(override_env)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Forces a no-cache fetch when the caller's config requests it; otherwise
/// leaves the middleware's default caching behavior untouched.
pub fn apply_cache_mode(req: RequestBuilder, bypass_cache: bool) -> RequestBuilder {
    if bypass_cache {
        req.with_extension(CacheMode::NoCache)
    } else {
        req
    }
}

/// First ~2KB of a failed response body, for log context without flooding logs.
pub fn body_excerpt(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    text.chars().take(2048).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_base_falls_back_to_default_when_unset() {
        std::env::remove_var("TERMMAP_TEST_BASE_UNSET");
        assert_eq!(env_base("https://default.example", "TERMMAP_TEST_BASE_UNSET"), "https://default.example");
    }
}
