use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use super::{apply_cache_mode, body_excerpt, env_base, shared_client, ExternalLookup, LookupHit};

const SNOMED_API: &str = "snomed-browser";
const SNOMED_BASE: &str = "https://browser.ihtsdotools.org/snowstorm/snomed-ct";
const SNOMED_BASE_ENV: &str = "TERMMAP_SNOMED_BASE";
const SNOMED_BRANCH: &str = "MAIN";

/// Authoritative SNOMED browser REST lookup.
pub struct SnomedBrowserAdapter {
    base: String,
    bypass_cache: bool,
    timeout: Duration,
}

impl SnomedBrowserAdapter {
    pub fn new(bypass_cache: bool, timeout: Duration) -> Self {
        Self {
            base: env_base(SNOMED_BASE, SNOMED_BASE_ENV),
            bypass_cache,
            timeout,
        }
    }

    #[cfg(test)]
    fn new_for_test(base: String) -> Self {
        Self { base, bypass_cache: false, timeout: Duration::from_secs(5) }
    }
}

#[derive(Debug, Deserialize)]
struct SnomedSearchResponse {
    #[serde(default)]
    items: Vec<SnomedConcept>,
}

#[derive(Debug, Deserialize)]
struct SnomedConcept {
    #[serde(rename = "conceptId")]
    concept_id: String,
    #[serde(rename = "pt")]
    preferred_term: Option<SnomedTerm>,
    #[serde(rename = "fsn")]
    fully_specified_name: Option<SnomedTerm>,
}

#[derive(Debug, Deserialize)]
struct SnomedTerm {
    term: String,
}

#[async_trait]
impl ExternalLookup for SnomedBrowserAdapter {
    async fn search(&self, term: &str, max_results: usize) -> Vec<LookupHit> {
        let Ok(client) = shared_client() else {
            warn!(api = SNOMED_API, "failed to build HTTP client");
            return Vec::new();
        };

        let url = format!("{}/browser/{}/concepts", self.base.trim_end_matches('/'), SNOMED_BRANCH);
        let req = client
            .get(&url)
            .query(&[("term", term), ("activeFilter", "true")])
            .query(&[("limit", &max_results.to_string())]);
        let req = apply_cache_mode(req, self.bypass_cache);

        let resp = match tokio::time::timeout(self.timeout, req.send()).await {
            Ok(Ok(resp)) => resp,
            Ok(Err(err)) => {
                warn!(api = SNOMED_API, error = %err, "request failed");
                return Vec::new();
            }
            Err(_) => {
                warn!(api = SNOMED_API, timeout_secs = self.timeout.as_secs(), "request timed out");
                return Vec::new();
            }
        };

        let status = resp.status();
        let body = match resp.bytes().await {
            Ok(body) => body,
            Err(err) => {
                warn!(api = SNOMED_API, error = %err, "failed to read response body");
                return Vec::new();
            }
        };

        if !status.is_success() {
            warn!(api = SNOMED_API, status = %status, body = %body_excerpt(&body), "non-success response");
            return Vec::new();
        }

        let parsed: SnomedSearchResponse = match serde_json::from_slice(&body) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(api = SNOMED_API, error = %err, body = %body_excerpt(&body), "failed to parse response");
                return Vec::new();
            }
        };

        parsed
            .items
            .into_iter()
            .take(max_results)
            .map(|concept| {
                let display = concept
                    .preferred_term
                    .or(concept.fully_specified_name)
                    .map(|t| t.term)
                    .unwrap_or_default();
                LookupHit {
                    code: concept.concept_id,
                    display,
                    source: SNOMED_API.to_string(),
                }
            })
            .collect()
    }
}
