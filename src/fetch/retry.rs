//! Bounded retry with randomized delays, and request pacing.
//!
//! Every failure is retried the same way: a non-success status, a dropped
//! connection and an empty download all count as one failed attempt. The
//! delay between attempts is drawn uniformly from a [`DelayRange`].
//!
//! # Example
//!
//! ```
//! use harvester_core::config::DelayRange;
//! use harvester_core::fetch::{RetryDecision, RetryPolicy};
//!
//! let policy = RetryPolicy::new(3, DelayRange::new(2.0, 5.0));
//! match policy.should_retry(1) {
//!     RetryDecision::Retry { delay, attempt } => {
//!         println!("Retrying in {:?} (attempt {})", delay, attempt);
//!     }
//!     RetryDecision::DoNotRetry { reason } => {
//!         println!("Not retrying: {}", reason);
//!     }
//! }
//! ```

use std::future::Future;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use super::{FetchError, FetchFailure};
use crate::config::{DEFAULT_MAX_ATTEMPTS, DelayRange};

/// Decision on whether to retry a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the specified delay.
    Retry {
        /// How long to wait before retrying.
        delay: Duration,
        /// Which attempt number this will be (1-indexed, so first retry is attempt 2).
        attempt: u32,
    },

    /// Stop retrying.
    DoNotRetry {
        /// Human-readable reason.
        reason: String,
    },
}

/// Attempt limit plus the range retry delays are drawn from.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial attempt).
    max_attempts: u32,
    /// Range each inter-attempt delay is sampled from.
    delay: DelayRange,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DelayRange::new(2.0, 5.0))
    }
}

impl RetryPolicy {
    /// Creates a policy; `max_attempts` is clamped to at least 1.
    #[must_use]
    pub fn new(max_attempts: u32, delay: DelayRange) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Returns the maximum number of attempts configured.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Decides what happens after attempt number `attempt` (1-indexed) failed.
    #[instrument(level = "trace", skip(self), fields(max_attempts = self.max_attempts))]
    pub fn should_retry(&self, attempt: u32) -> RetryDecision {
        if attempt >= self.max_attempts {
            debug!(attempt, max = self.max_attempts, "max attempts reached");
            return RetryDecision::DoNotRetry {
                reason: format!("max attempts ({}) exhausted", self.max_attempts),
            };
        }

        RetryDecision::Retry {
            delay: self.delay.sample(),
            attempt: attempt + 1,
        }
    }

    /// Runs `op` until it succeeds or the attempt budget is spent.
    ///
    /// `op` receives the 1-indexed attempt number. The loop is explicit and
    /// bounded by `max_attempts`; between attempts it sleeps for a sampled delay.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchFailure`] carrying the last attempt's error once all
    /// attempts have failed.
    pub async fn run<T, F, Fut>(&self, target: &str, mut op: F) -> Result<T, FetchFailure>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let mut attempt = 1;
        loop {
            let error = match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            warn!(
                unit = %target,
                attempt,
                max_attempts = self.max_attempts,
                error = %error,
                "attempt failed"
            );

            match self.should_retry(attempt) {
                RetryDecision::Retry {
                    delay,
                    attempt: next,
                } => {
                    info!(
                        unit = %target,
                        delay_ms = delay.as_millis(),
                        next_attempt = next,
                        "waiting before retry"
                    );
                    tokio::time::sleep(delay).await;
                    attempt = next;
                }
                RetryDecision::DoNotRetry { reason } => {
                    debug!(unit = %target, %reason, "not retrying");
                    return Err(FetchFailure {
                        target: target.to_string(),
                        attempts: attempt,
                        last_error: error,
                    });
                }
            }
        }
    }
}

/// Spaces out consecutive operations by a randomized delay.
///
/// The first call to [`pause`](Self::pause) returns immediately; every later
/// call sleeps for a delay sampled from the range.
#[derive(Debug)]
pub struct Pacer {
    delay: DelayRange,
    started: bool,
}

impl Pacer {
    /// Creates a pacer that has not yet let anything through.
    #[must_use]
    pub fn new(delay: DelayRange) -> Self {
        Self {
            delay,
            started: false,
        }
    }

    /// Waits before the next operation and returns how long it slept.
    pub async fn pause(&mut self) -> Duration {
        if !self.started {
            self.started = true;
            return Duration::ZERO;
        }
        let delay = self.delay.sample();
        if !delay.is_zero() {
            info!(delay_ms = delay.as_millis(), "pacing before next request");
            tokio::time::sleep(delay).await;
        }
        delay
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn instant_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, DelayRange::ZERO)
    }

    #[test]
    fn test_max_attempts_minimum_is_one() {
        assert_eq!(instant_policy(0).max_attempts(), 1);
    }

    #[test]
    fn test_default_policy_matches_pipeline_defaults() {
        assert_eq!(RetryPolicy::default().max_attempts(), 3);
    }

    #[test]
    fn test_should_retry_until_budget_spent() {
        let policy = instant_policy(3);
        assert_eq!(
            policy.should_retry(1),
            RetryDecision::Retry {
                delay: Duration::ZERO,
                attempt: 2
            }
        );
        assert!(matches!(
            policy.should_retry(2),
            RetryDecision::Retry { attempt: 3, .. }
        ));
        match policy.should_retry(3) {
            RetryDecision::DoNotRetry { reason } => assert!(reason.contains("3")),
            other => panic!("expected DoNotRetry, got {other:?}"),
        }
    }

    #[test]
    fn test_retry_delay_drawn_from_range() {
        let policy = RetryPolicy::new(5, DelayRange::new(0.5, 1.0));
        for _ in 0..20 {
            let RetryDecision::Retry { delay, .. } = policy.should_retry(1) else {
                panic!("expected retry");
            };
            assert!(delay >= Duration::from_millis(499), "{delay:?}");
            assert!(delay <= Duration::from_millis(1001), "{delay:?}");
        }
    }

    #[tokio::test]
    async fn test_run_returns_first_success() {
        let calls = AtomicU32::new(0);
        let result = instant_policy(3)
            .run("unit", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, FetchError>(7) }
            })
            .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_run_retries_any_failure_then_succeeds() {
        let result = instant_policy(3)
            .run("unit", |attempt| async move {
                if attempt < 3 {
                    Err(FetchError::http_status("https://example.com", 404))
                } else {
                    Ok(attempt)
                }
            })
            .await;
        assert_eq!(result.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_run_exhausts_attempts_and_keeps_last_error() {
        let calls = AtomicU32::new(0);
        let failure = instant_policy(3)
            .run("https://example.com/search", |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    Err::<(), _>(FetchError::http_status(
                        "https://example.com/search",
                        500 + u16::try_from(attempt).unwrap(),
                    ))
                }
            })
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(failure.attempts, 3);
        assert_eq!(failure.target, "https://example.com/search");
        assert!(matches!(
            failure.last_error,
            FetchError::HttpStatus { status: 503, .. }
        ));
    }

    #[tokio::test]
    async fn test_pacer_skips_first_pause() {
        let mut pacer = Pacer::new(DelayRange::new(0.001, 0.002));
        assert_eq!(pacer.pause().await, Duration::ZERO);
        let second = pacer.pause().await;
        assert!(second > Duration::ZERO);
    }
}
