//! Bounded retry with exponential backoff around a single fetch.

use super::http::FetchError;
use crate::config::HttpConfig;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// How many times a batch is attempted and how long to wait between tries.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_secs(5),
        }
    }
}

impl From<&HttpConfig> for RetryPolicy {
    fn from(config: &HttpConfig) -> Self {
        Self {
            attempts: config.retries.max(1),
            base_delay: Duration::from_millis(config.backoff_base_ms),
        }
    }
}

impl RetryPolicy {
    /// Policy that retries without sleeping.
    #[cfg(test)]
    pub fn immediate(attempts: u32) -> Self {
        Self {
            attempts,
            base_delay: Duration::ZERO,
        }
    }

    /// Delay after the given failed attempt (0-based): base, 2x base, 4x base...
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// Run `op` until it succeeds or the policy is exhausted.
///
/// Returns `None` when every attempt failed or the failure was not
/// transient; the caller treats that as a skipped batch.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, label: &str, mut op: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    for attempt in 0..policy.attempts {
        match op().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!("{} succeeded on attempt {}", label, attempt + 1);
                }
                return Some(value);
            }
            Err(err) if !err.is_transient() => {
                warn!("Dropping {}: {}", label, err);
                return None;
            }
            Err(err) => {
                warn!(
                    "Attempt {} of {} failed for {}: {}",
                    attempt + 1,
                    policy.attempts,
                    label,
                    err
                );
                if attempt + 1 < policy.attempts {
                    tokio::time::sleep(policy.delay_for(attempt)).await;
                }
            }
        }
    }

    warn!(
        "Skipping {} after {} failed attempts",
        label, policy.attempts
    );
    None
}
