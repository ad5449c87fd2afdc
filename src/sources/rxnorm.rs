use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use super::{apply_cache_mode, body_excerpt, env_base, shared_client, ClinicalTablesAdapter, ExternalLookup, LookupHit};

const RXNORM_API: &str = "rxnorm";
const RXNORM_BASE: &str = "https://rxnav.nlm.nih.gov/REST";
const RXNORM_BASE_ENV: &str = "TERMMAP_RXNORM_BASE";

/// Native RxNorm REST. On error or empty result, retries via Clinical
/// Tables' `rxterms` table; each attempt is independently try-guarded
/// (spec.md §4.9).
pub struct RxNormAdapter {
    base: String,
    bypass_cache: bool,
    timeout: Duration,
    fallback: ClinicalTablesAdapter,
}

impl RxNormAdapter {
    pub fn new(bypass_cache: bool, timeout: Duration) -> Self {
        Self {
            base: env_base(RXNORM_BASE, RXNORM_BASE_ENV),
            bypass_cache,
            timeout,
            fallback: ClinicalTablesAdapter::rxterms(bypass_cache, timeout),
        }
    }

    #[cfg(test)]
    fn new_for_test(base: String, fallback: ClinicalTablesAdapter) -> Self {
        Self { base, bypass_cache: false, timeout: Duration::from_secs(5), fallback }
    }

    async fn search_native(&self, term: &str, max_results: usize) -> Vec<LookupHit> {
        let Ok(client) = shared_client() else {
            warn!(api = RXNORM_API, "failed to build HTTP client");
            return Vec::new();
        };

        let url = format!("{}/drugs.json", self.base.trim_end_matches('/'));
        let req = client.get(&url).query(&[("name", term)]);
        let req = apply_cache_mode(req, self.bypass_cache);

        let resp = match tokio::time::timeout(self.timeout, req.send()).await {
            Ok(Ok(resp)) => resp,
            Ok(Err(err)) => {
                warn!(api = RXNORM_API, error = %err, "request failed");
                return Vec::new();
            }
            Err(_) => {
                warn!(api = RXNORM_API, timeout_secs = self.timeout.as_secs(), "request timed out");
                return Vec::new();
            }
        };

        let status = resp.status();
        let body = match resp.bytes().await {
            Ok(body) => body,
            Err(err) => {
                warn!(api = RXNORM_API, error = %err, "failed to read response body");
                return Vec::new();
            }
        };

        if !status.is_success() {
            warn!(api = RXNORM_API, status = %status, body = %body_excerpt(&body), "non-success response");
            return Vec::new();
        }

        let parsed: RxNormDrugsResponse = match serde_json::from_slice(&body) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(api = RXNORM_API, error = %err, body = %body_excerpt(&body), "failed to parse response");
                return Vec::new();
            }
        };

        parsed
            .drug_group
            .and_then(|g| g.concept_group)
            .unwrap_or_default()
            .into_iter()
            .flat_map(|group| group.concept_properties.unwrap_or_default())
            .take(max_results)
            .map(|concept| LookupHit {
                code: concept.rxcui,
                display: concept.name,
                source: RXNORM_API.to_string(),
            })
            .collect()
    }
}

#[async_trait]
impl ExternalLookup for RxNormAdapter {
    async fn search(&self, term: &str, max_results: usize) -> Vec<LookupHit> {
        let native = self.search_native(term, max_results).await;
        if !native.is_empty() {
            return native;
        }
        self.fallback.search(term, max_results).await
    }
}

#[derive(Debug, Deserialize)]
struct RxNormDrugsResponse {
    #[serde(rename = "drugGroup")]
    drug_group: Option<RxNormDrugGroup>,
}

#[derive(Debug, Deserialize)]
struct RxNormDrugGroup {
    #[serde(rename = "conceptGroup")]
    concept_group: Option<Vec<RxNormConceptGroup>>,
}

#[derive(Debug, Deserialize)]
struct RxNormConceptGroup {
    #[serde(rename = "conceptProperties")]
    concept_properties: Option<Vec<RxNormConceptProperties>>,
}

#[derive(Debug, Deserialize)]
struct RxNormConceptProperties {
    rxcui: String,
    name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn native_hit_skips_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/drugs.json"))
            .and(query_param("name", "metformin"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "drugGroup": {
                    "conceptGroup": [{
                        "conceptProperties": [{"rxcui": "6809", "name": "metformin"}]
                    }]
                }
            })))
            .mount(&server)
            .await;

        let fallback = ClinicalTablesAdapter::rxterms(false, Duration::from_secs(5));
        let adapter = RxNormAdapter::new_for_test(server.uri(), fallback);
        let hits = adapter.search("metformin", 5).await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].code, "6809");
    }

    #[tokio::test]
    async fn empty_native_result_falls_back_to_clinical_tables() {
        let rxnorm_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/drugs.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "drugGroup": { "conceptGroup": null }
            })))
            .mount(&rxnorm_server)
            .await;

        let fallback_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rxterms/v3/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                1,
                ["6809"],
                {},
                [["metformin"]]
            ])))
            .mount(&fallback_server)
            .await;

        let fallback = ClinicalTablesAdapter::new_for_test(fallback_server.uri(), "rxterms");
        let adapter = RxNormAdapter::new_for_test(rxnorm_server.uri(), fallback);
        let hits = adapter.search("metformin", 5).await;

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].code, "6809");
    }
}
