//! Client for the NLM Clinical Tables conditions search
//!
//! The service answers `GET /api/conditions/v3/search?terms=..&maxList=N`
//! with a positional array:
//!
//! ```text
//! [total, [names...], null, [[name, icd10, description], ...]]
//! ```
//!
//! Parsing is lenient about the rows; only a malformed top level is an error.

mod retry;

pub use retry::RetryConfig;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::{
    CoreError, Result,
    triage::{self, Urgency},
};
use retry::{RetryOutcome, send_with_retry};

pub const DEFAULT_BASE_URL: &str = "https://clinicaltables.nlm.nih.gov";
const SEARCH_PATH: &str = "/api/conditions/v3/search";
/// Fields requested per row: display name, ICD-10 code, description
const DISPLAY_FIELDS: &str = "consumer_name,icd10cm_codes,primary_name";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ConditionsConfig {
    pub base_url: String,
    pub max_results: u32,
    pub timeout_secs: u64,
    pub retry: RetryConfig,
}

impl Default for ConditionsConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            max_results: 10,
            timeout_secs: 10,
            retry: RetryConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ConditionMatch {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icd10: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Urgency the triage rules give the code, when it has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_urgency: Option<Urgency>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ConditionSearch {
    pub terms: String,
    /// Total matches known to the service, which may exceed `matches.len()`
    pub total: u64,
    pub matches: Vec<ConditionMatch>,
}

#[derive(Debug, Clone)]
pub struct ConditionsClient {
    http: reqwest::Client,
    config: ConditionsConfig,
}

impl ConditionsClient {
    pub fn new(config: ConditionsConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("patient-triage/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CoreError::ConditionLookupFailed {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ConditionsConfig {
        &self.config
    }

    fn search_url(&self) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), SEARCH_PATH)
    }

    pub async fn search(&self, terms: &str) -> Result<ConditionSearch> {
        let terms = terms.trim();
        if terms.is_empty() {
            return Err(CoreError::validation("terms", "must not be empty"));
        }

        let url = self.search_url();
        let max_list = self.config.max_results.to_string();
        let outcome = send_with_retry(
            || {
                self.http.get(&url).query(&[
                    ("terms", terms),
                    ("maxList", max_list.as_str()),
                    ("df", DISPLAY_FIELDS),
                ])
            },
            &self.config.retry,
        )
        .await;

        let response = match outcome {
            RetryOutcome::Success(response) => response,
            RetryOutcome::HttpError { attempts, response } => {
                let status = response.status();
                return Err(if retry::is_retryable_status(status) {
                    self.unavailable(attempts, format!("service responded with {status}").into())
                } else {
                    CoreError::ConditionLookupFailed {
                        message: format!("service responded with {status}"),
                    }
                });
            }
            RetryOutcome::Transport { attempts, source } => {
                return Err(self.unavailable(attempts, Box::new(source)));
            }
        };

        let body: Value = response
            .json()
            .await
            .map_err(|e| CoreError::ConditionLookupFailed {
                message: format!("response is not JSON: {e}"),
            })?;
        let search = parse_search(terms, &body)?;
        tracing::debug!(
            terms,
            total = search.total,
            returned = search.matches.len(),
            "condition search"
        );
        Ok(search)
    }

    /// Single-attempt reachability check for readiness probes
    pub async fn probe(&self) -> bool {
        let request = self
            .http
            .get(self.search_url())
            .query(&[("terms", "a"), ("maxList", "1")]);
        match request.send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!(error = %e, "condition service probe failed");
                false
            }
        }
    }

    fn unavailable(
        &self,
        attempts: u32,
        cause: Box<dyn std::error::Error + Send + Sync>,
    ) -> CoreError {
        tracing::warn!(
            base_url = %self.config.base_url,
            attempts,
            error = %cause,
            "condition lookup unavailable"
        );
        CoreError::ConditionLookupUnavailable {
            base_url: self.config.base_url.clone(),
            attempts,
            cause,
        }
    }
}

fn parse_search(terms: &str, body: &Value) -> Result<ConditionSearch> {
    let malformed = |what: &str| CoreError::ConditionLookupFailed {
        message: format!("malformed response: {what}"),
    };

    let top = body.as_array().ok_or_else(|| malformed("expected a JSON array"))?;
    let total = top
        .first()
        .and_then(Value::as_u64)
        .ok_or_else(|| malformed("missing result count"))?;

    let names: Vec<&str> = top
        .get(1)
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let rows = top.get(3).and_then(Value::as_array);
    let matches = match rows {
        Some(rows) => rows.iter().filter_map(parse_row).collect(),
        // no display rows; fall back to the bare names
        None => names
            .into_iter()
            .map(|name| ConditionMatch {
                name: name.to_string(),
                icd10: None,
                description: None,
                suggested_urgency: None,
            })
            .collect(),
    };

    Ok(ConditionSearch {
        terms: terms.to_string(),
        total,
        matches,
    })
}

fn parse_row(row: &Value) -> Option<ConditionMatch> {
    let cell = |i: usize| {
        row.get(i)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let name = cell(0)?;
    // the service may list several codes separated by commas
    let icd10 = cell(1).and_then(|codes| {
        codes
            .split(',')
            .map(str::trim)
            .find(|code| !code.is_empty())
            .map(str::to_string)
    });
    let suggested_urgency = icd10
        .as_deref()
        .and_then(triage::classify_code)
        .map(|c| c.urgency);

    Some(ConditionMatch {
        name,
        icd10,
        description: cell(2),
        suggested_urgency,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> ConditionsClient {
        ConditionsClient::new(ConditionsConfig {
            base_url: server.uri(),
            max_results: 5,
            timeout_secs: 5,
            retry: RetryConfig {
                max_retries: 2,
                initial_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(10),
                jitter_factor: 0.0,
            },
        })
        .unwrap()
    }

    fn chest_pain_body() -> Value {
        json!([
            2,
            ["Chest pain", "Angina"],
            null,
            [
                ["Chest pain", "R07.9", "Chest pain, unspecified"],
                ["Angina", "I20.9", "Angina pectoris, unspecified"]
            ]
        ])
    }

    #[tokio::test]
    async fn test_search_parses_rows() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/conditions/v3/search"))
            .and(query_param("terms", "chest"))
            .and(query_param("maxList", "5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chest_pain_body()))
            .expect(1)
            .mount(&server)
            .await;

        let search = client_for(&server).search("  chest ").await.unwrap();
        assert_eq!(search.terms, "chest");
        assert_eq!(search.total, 2);
        assert_eq!(
            search.matches[0],
            ConditionMatch {
                name: "Chest pain".to_string(),
                icd10: Some("R07.9".to_string()),
                description: Some("Chest pain, unspecified".to_string()),
                suggested_urgency: Some(Urgency::High),
            }
        );
        assert_eq!(search.matches[1].suggested_urgency, Some(Urgency::Medium));
    }

    #[tokio::test]
    async fn test_empty_terms_rejected_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chest_pain_body()))
            .expect(0)
            .mount(&server)
            .await;

        let err = client_for(&server).search("   ").await.unwrap_err();
        assert!(matches!(err, CoreError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_lenient_rows() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                3,
                ["Fever", "Rash", ""],
                null,
                [["Fever"], ["Rash", "R21, L30.9"], [null, "X00"]]
            ])))
            .mount(&server)
            .await;

        let search = client_for(&server).search("f").await.unwrap();
        assert_eq!(search.total, 3);
        assert_eq!(search.matches.len(), 2);
        assert_eq!(search.matches[0].icd10, None);
        assert_eq!(search.matches[0].suggested_urgency, None);
        assert_eq!(search.matches[1].icd10.as_deref(), Some("R21"));
        assert_eq!(search.matches[1].suggested_urgency, Some(Urgency::Low));
    }

    #[tokio::test]
    async fn test_malformed_top_level() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": "nope"})))
            .mount(&server)
            .await;

        let err = client_for(&server).search("chest").await.unwrap_err();
        assert!(matches!(err, CoreError::ConditionLookupFailed { .. }));
    }

    #[tokio::test]
    async fn test_retries_then_succeeds() {
        let server = MockServer::start().await;
        let attempt = AtomicU32::new(0);
        Mock::given(method("GET"))
            .respond_with(move |_: &wiremock::Request| {
                if attempt.fetch_add(1, Ordering::SeqCst) < 2 {
                    ResponseTemplate::new(503)
                } else {
                    ResponseTemplate::new(200).set_body_json(chest_pain_body())
                }
            })
            .expect(3)
            .mount(&server)
            .await;

        let search = client_for(&server).search("chest").await.unwrap();
        assert_eq!(search.total, 2);
    }

    #[tokio::test]
    async fn test_exhausted_retries_are_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&server)
            .await;

        let err = client_for(&server).search("chest").await.unwrap_err();
        match err {
            CoreError::ConditionLookupUnavailable { attempts, .. } => assert_eq!(attempts, 3),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(400))
            .expect(1)
            .mount(&server)
            .await;

        let err = client_for(&server).search("chest").await.unwrap_err();
        assert!(matches!(err, CoreError::ConditionLookupFailed { .. }));
    }

    #[tokio::test]
    async fn test_unreachable_service() {
        // nothing listens on the discard port
        let client = ConditionsClient::new(ConditionsConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 1,
            retry: RetryConfig {
                max_retries: 1,
                initial_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(1),
                jitter_factor: 0.0,
            },
            ..Default::default()
        })
        .unwrap();

        let err = client.search("chest").await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::ConditionLookupUnavailable { attempts: 2, .. }
        ));
        assert!(!client.probe().await);
    }
}
