//! Backoff policy for the condition lookup client
//!
//! - 3 attempts in total by default
//! - Exponential backoff from `initial_delay`, capped at `max_delay`
//! - Down-jitter: the delay is scaled by a factor in `[1 - jitter_factor, 1.0]`
//! - Retryable: 408, 429, 5xx and transport failures (connect, timeout)

use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the initial attempt
    pub max_retries: u32,
    #[serde(with = "millis", rename = "initial_delay_ms")]
    #[schemars(with = "u64")]
    pub initial_delay: Duration,
    #[serde(with = "millis", rename = "max_delay_ms")]
    #[schemars(with = "u64")]
    pub max_delay: Duration,
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            jitter_factor: 0.25,
        }
    }
}

impl RetryConfig {
    pub fn attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Delay before retry number `step + 1`
    pub fn delay(&self, step: u32) -> Duration {
        let base = self.initial_delay.as_secs_f64() * 2.0_f64.powi(step as i32);
        let capped = base.min(self.max_delay.as_secs_f64());
        let jitter = 1.0 - rand::random::<f64>() * self.jitter_factor.clamp(0.0, 1.0);
        Duration::from_secs_f64(capped * jitter)
    }
}

pub fn is_retryable_status(status: StatusCode) -> bool {
    matches!(status.as_u16(), 408 | 429 | 500..=599)
}

fn is_retryable_error(error: &reqwest::Error) -> bool {
    error.is_connect() || error.is_timeout()
}

#[derive(Debug)]
pub enum RetryOutcome {
    /// A 2xx response
    Success(Response),
    /// A non-retryable status, or a retryable one on the last attempt
    HttpError { attempts: u32, response: Response },
    /// Transport failure on the last attempt, or one that cannot be retried
    Transport {
        attempts: u32,
        source: reqwest::Error,
    },
}

/// Send the request built by `build_request`, retrying per `config`
pub async fn send_with_retry<F>(build_request: F, config: &RetryConfig) -> RetryOutcome
where
    F: Fn() -> RequestBuilder,
{
    let attempts = config.attempts();
    let mut attempt = 1;
    loop {
        let last = attempt >= attempts;
        match build_request().send().await {
            Ok(response) if response.status().is_success() => {
                return RetryOutcome::Success(response);
            }
            Ok(response) => {
                let status = response.status();
                if last || !is_retryable_status(status) {
                    return RetryOutcome::HttpError {
                        attempts: attempt,
                        response,
                    };
                }
                let delay = config.delay(attempt - 1);
                tracing::warn!(
                    status = %status,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "retrying request after error status"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                if last || !is_retryable_error(&e) {
                    return RetryOutcome::Transport {
                        attempts: attempt,
                        source: e,
                    };
                }
                let delay = config.delay(attempt - 1);
                tracing::warn!(
                    error = %e,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "retrying request after connection error"
                );
                tokio::time::sleep(delay).await;
            }
        }
        attempt += 1;
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable_status(StatusCode::REQUEST_TIMEOUT));
        assert!(is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable_status(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(is_retryable_status(StatusCode::SERVICE_UNAVAILABLE));

        assert!(!is_retryable_status(StatusCode::BAD_REQUEST));
        assert!(!is_retryable_status(StatusCode::NOT_FOUND));
        assert!(!is_retryable_status(StatusCode::CONFLICT));
    }

    #[test]
    fn test_delay_bounds() {
        let config = RetryConfig::default();
        for _ in 0..100 {
            let first = config.delay(0);
            assert!(first >= Duration::from_millis(375));
            assert!(first <= Duration::from_millis(500));

            let second = config.delay(1);
            assert!(second >= Duration::from_millis(750));
            assert!(second <= Duration::from_millis(1000));
        }
    }

    #[test]
    fn test_delay_is_capped() {
        let config = RetryConfig {
            jitter_factor: 0.0,
            ..Default::default()
        };
        assert_eq!(config.delay(10), Duration::from_secs(8));
    }

    #[test]
    fn test_config_in_milliseconds() {
        let config: RetryConfig =
            toml::from_str("max_retries = 4\ninitial_delay_ms = 100").unwrap();
        assert_eq!(config.max_retries, 4);
        assert_eq!(config.attempts(), 5);
        assert_eq!(config.initial_delay, Duration::from_millis(100));
        assert_eq!(config.max_delay, Duration::from_secs(8));
    }

    #[tokio::test]
    async fn test_dropped_response_is_not_retried() {
        // accepts then hangs up without answering
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accepted = std::sync::Arc::new(std::sync::atomic::AtomicU32::new(0));
        let counter = accepted.clone();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                drop(socket);
            }
        });

        let client = reqwest::Client::new();
        let url = format!("http://{addr}/search");
        let config = RetryConfig {
            max_retries: 3,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            jitter_factor: 0.0,
        };
        match send_with_retry(|| client.get(&url), &config).await {
            RetryOutcome::Transport { attempts, source } => {
                assert_eq!(attempts, 1);
                assert!(!source.is_connect() && !source.is_timeout());
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(accepted.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
