//! Retry with exponential backoff for idempotent venue calls.
//!
//! Only reads may go through here. Order placement is never retried: a
//! duplicated open or close is a real trade.

use std::{future::Future, time::Duration};

use tracing::{debug, warn};

use crate::common::errors::{GatewayError, Result};

/// Retry settings
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    /// Growth factor between consecutive delays
    pub backoff_multiplier: f64,
}

/// Exponent cap; larger attempts already sit at `max_delay`
const MAX_BACKOFF_EXPONENT: u32 = 32;

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Single attempt
    pub fn none() -> Self {
        Self::default()
    }

    fn delay_for(&self, attempt: u32, error: &GatewayError) -> Duration {
        if let GatewayError::RateLimit {
            retry_after_seconds: Some(secs),
            ..
        } = error
        {
            return Duration::from_secs(*secs).min(self.max_delay);
        }

        let exponent = attempt.min(MAX_BACKOFF_EXPONENT) as i32;
        let secs = self.base_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        Duration::try_from_secs_f64(secs)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// runs out of retries. The last error is returned.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!(attempts = attempt + 1, "succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) if !e.is_retryable() || attempt >= policy.max_retries => return Err(e),
            Err(e) => {
                let delay = policy.delay_for(attempt, &e);
                warn!(
                    error = %e,
                    attempt = attempt + 1,
                    max_retries = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    "retrying venue call"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            backoff_multiplier: 2.0,
        }
    }

    #[tokio::test]
    async fn test_retries_transport_errors() {
        let calls = AtomicU32::new(0);
        let result = with_retry(&fast(2), || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(GatewayError::Transport("reset".into()))
            } else {
                Ok(7)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_retry(&fast(1), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(GatewayError::Timeout("slow".into()))
        })
        .await;

        assert!(matches!(result, Err(GatewayError::Timeout(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_venue_rejection_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_retry(&fast(3), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(GatewayError::Venue {
                code: "40034".into(),
                message: "param error".into(),
            })
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_delay_is_capped() {
        let policy = fast(10);
        let err = GatewayError::Transport("x".into());
        assert_eq!(policy.delay_for(0, &err), Duration::from_millis(1));
        assert_eq!(policy.delay_for(8, &err), Duration::from_millis(5));
    }

    #[test]
    fn test_backoff_capped_for_huge_attempts() {
        let policy = RetryPolicy {
            max_retries: u32::MAX,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
        };
        let err = GatewayError::Transport("reset".into());
        assert_eq!(policy.delay_for(0, &err), Duration::from_millis(250));
        assert_eq!(policy.delay_for(2000, &err), Duration::from_secs(5));
        assert_eq!(policy.delay_for(u32::MAX, &err), Duration::from_secs(5));

        let runaway = RetryPolicy {
            backoff_multiplier: f64::MAX,
            ..policy
        };
        assert_eq!(runaway.delay_for(3, &err), Duration::from_secs(5));
    }
}
