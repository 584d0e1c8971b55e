//! HTTP boundary for source adapters.
//!
//! Adapters only see the [`Fetch`] capability so they can be driven by an
//! in-memory fake in tests; [`HttpFetcher`] is the reqwest-backed
//! implementation used at runtime.

use crate::config::HttpConfig;
use anyhow::{Context, Result};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Failure of a single fetch call.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} timed out after {seconds}s")]
    Timeout { url: String, seconds: u64 },

    #[error("cannot connect to {url}")]
    Connect { url: String },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("could not decode response from {url}: {message}")]
    Decode { url: String, message: String },
}

impl FetchError {
    /// Whether retrying the same call may succeed.
    ///
    /// Only server errors and rate limiting are worth another attempt among
    /// HTTP statuses. Decode failures mean the payload itself is bad; they
    /// are dropped instead of retried.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Status { status, .. } => *status >= 500 || *status == 429,
            FetchError::Decode { .. } => false,
            _ => true,
        }
    }

    pub fn decode(url: &str, err: impl std::fmt::Display) -> Self {
        FetchError::Decode {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}

/// Something that can GET a URL and return its body as text.
#[allow(async_fn_in_trait)]
pub trait Fetch {
    async fn get(&self, url: &str, query: &[(&str, String)]) -> Result<String, FetchError>;
}

/// reqwest-backed fetcher with a fixed per-call timeout.
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout_seconds: u64,
}

impl HttpFetcher {
    /// Build a fetcher from the HTTP settings.
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(config.user_agent.clone())
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            timeout_seconds: config.timeout_seconds,
        })
    }
}

impl Fetch for HttpFetcher {
    async fn get(&self, url: &str, query: &[(&str, String)]) -> Result<String, FetchError> {
        debug!("GET {} {:?}", url, query);

        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout {
                        url: url.to_string(),
                        seconds: self.timeout_seconds,
                    }
                } else if e.is_connect() {
                    FetchError::Connect {
                        url: url.to_string(),
                    }
                } else {
                    FetchError::Request {
                        url: url.to_string(),
                        message: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| FetchError::Request {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_is_not_transient() {
        let err = FetchError::decode("https://example.org", "expected value");
        assert!(!err.is_transient());
        assert!(err.to_string().contains("could not decode"));
    }

    #[test]
    fn test_network_errors_are_transient() {
        let timeout = FetchError::Timeout {
            url: "https://example.org".to_string(),
            seconds: 30,
        };
        let status = FetchError::Status {
            url: "https://example.org".to_string(),
            status: 503,
        };
        assert!(timeout.is_transient());
        assert!(status.is_transient());
        assert!(FetchError::Status {
            url: "https://example.org".to_string(),
            status: 429,
        }
        .is_transient());
        assert_eq!(status.to_string(), "https://example.org returned HTTP 503");
    }

    #[test]
    fn test_client_errors_are_permanent() {
        for status in [400, 403, 404] {
            let err = FetchError::Status {
                url: "https://example.org".to_string(),
                status,
            };
            assert!(!err.is_transient(), "HTTP {} should not be retried", status);
        }
    }

    #[test]
    fn test_http_fetcher_builds_from_defaults() {
        let fetcher = HttpFetcher::new(&HttpConfig::default()).unwrap();
        assert_eq!(fetcher.timeout_seconds, 30);
    }
}
