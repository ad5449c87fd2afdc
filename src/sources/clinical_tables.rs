use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use super::{apply_cache_mode, body_excerpt, env_base, shared_client, ExternalLookup, LookupHit};

const CLINICAL_TABLES_API: &str = "clinical-tables";
const CLINICAL_TABLES_BASE: &str = "https://clinicaltables.nlm.nih.gov/api";
const CLINICAL_TABLES_BASE_ENV: &str = "TERMMAP_CLINICAL_TABLES_BASE";

/// Generic HTTP JSON endpoint used for LOINC and `rxterms` lookups. The
/// NLM Clinical Tables API returns a fixed 4-element array:
/// `[total, codes, extra_fields, display_strings]`.
pub struct ClinicalTablesAdapter {
    base: String,
    table: &'static str,
    bypass_cache: bool,
    timeout: Duration,
}

impl ClinicalTablesAdapter {
    pub fn loinc(bypass_cache: bool, timeout: Duration) -> Self {
        Self {
            base: env_base(CLINICAL_TABLES_BASE, CLINICAL_TABLES_BASE_ENV),
            table: "loinc_items",
            bypass_cache,
            timeout,
        }
    }

    pub fn rxterms(bypass_cache: bool, timeout: Duration) -> Self {
        Self {
            base: env_base(CLINICAL_TABLES_BASE, CLINICAL_TABLES_BASE_ENV),
            table: "rxterms",
            bypass_cache,
            timeout,
        }
    }

    #[cfg(test)]
    pub(crate) fn new_for_test(base: String, table: &'static str) -> Self {
        Self { base, table, bypass_cache: false, timeout: Duration::from_secs(5) }
    }
}

#[derive(Debug, Deserialize)]
struct ClinicalTablesResponse(u32, Vec<String>, serde_json::Value, Vec<Vec<String>>);

#[async_trait]
impl ExternalLookup for ClinicalTablesAdapter {
    async fn search(&self, term: &str, max_results: usize) -> Vec<LookupHit> {
        let Ok(client) = shared_client() else {
            warn!(api = CLINICAL_TABLES_API, table = self.table, "failed to build HTTP client");
            return Vec::new();
        };

        let url = format!("{}/{}/v3/search", self.base.trim_end_matches('/'), self.table);
        let max = max_results.to_string();
        let req = client.get(&url).query(&[("terms", term), ("maxList", max.as_str())]);
        let req = apply_cache_mode(req, self.bypass_cache);

        let resp = match tokio::time::timeout(self.timeout, req.send()).await {
            Ok(Ok(resp)) => resp,
            Ok(Err(err)) => {
                warn!(api = CLINICAL_TABLES_API, table = self.table, error = %err, "request failed");
                return Vec::new();
            }
            Err(_) => {
                warn!(api = CLINICAL_TABLES_API, table = self.table, timeout_secs = self.timeout.as_secs(), "request timed out");
                return Vec::new();
            }
        };

        let status = resp.status();
        let body = match resp.bytes().await {
            Ok(body) => body,
            Err(err) => {
                warn!(api = CLINICAL_TABLES_API, table = self.table, error = %err, "failed to read response body");
                return Vec::new();
            }
        };

        if !status.is_success() {
            warn!(api = CLINICAL_TABLES_API, table = self.table, status = %status, body = %body_excerpt(&body), "non-success response");
            return Vec::new();
        }

        let parsed: ClinicalTablesResponse = match serde_json::from_slice(&body) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(api = CLINICAL_TABLES_API, table = self.table, error = %err, body = %body_excerpt(&body), "failed to parse response");
                return Vec::new();
            }
        };

        let ClinicalTablesResponse(_total, codes, _extra, displays) = parsed;
        codes
            .into_iter()
            .zip(displays)
            .take(max_results)
            .map(|(code, display_row)| LookupHit {
                code,
                display: display_row.into_iter().next().unwrap_or_default(),
                source: CLINICAL_TABLES_API.to_string(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn parses_four_element_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/loinc_items/v3/search"))
            .and(query_param("terms", "hemoglobin a1c"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                1,
                ["4548-4"],
                {},
                [["Hemoglobin A1c/Hemoglobin.total in Blood"]]
            ])))
            .mount(&server)
            .await;

        let adapter = ClinicalTablesAdapter::new_for_test(server.uri(), "loinc_items");
        let hits = adapter.search("hemoglobin a1c", 5).await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].code, "4548-4");
        assert_eq!(hits[0].display, "Hemoglobin A1c/Hemoglobin.total in Blood");
    }

    #[tokio::test]
    async fn malformed_response_yields_empty_result() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rxterms/v3/search"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let adapter = ClinicalTablesAdapter::new_for_test(server.uri(), "rxterms");
        let hits = adapter.search("metformin", 5).await;
        assert!(hits.is_empty());
    }
}
