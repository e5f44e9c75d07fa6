//! Retry executor for transient failures
//!
//! Wraps an arbitrary unit of work with bounded retry and exponential
//! backoff. Failures are classified by case-insensitive keyword match
//! against the failure message; a policy without a keyword list retries
//! every failure. Attempts run strictly sequentially with the backoff
//! delay inserted between consecutive attempts.

use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Retry policy configuration
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first
    pub max_attempts: u32,

    /// Delay before the second attempt
    pub initial_delay: Duration,

    /// Multiplier applied to the delay after each failed attempt
    pub backoff_multiplier: f64,

    /// Upper bound on the inter-attempt delay
    pub max_delay: Duration,

    /// Keywords identifying transient failures; `None` retries everything
    pub retryable_errors: Option<Vec<String>>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(250),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_secs(10),
            retryable_errors: None,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Policy for automation-driver calls: retries only transient
    /// transport and timeout failures.
    pub fn for_driver() -> Self {
        Self {
            retryable_errors: Some(
                [
                    "timed out",
                    "timeout",
                    "connection refused",
                    "connection reset",
                    "temporarily unavailable",
                    "network",
                    "stale element",
                ]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ),
            ..Self::default()
        }
    }

    /// Delay to insert after the given (1-based) failed attempt
    ///
    /// `min(initial_delay * multiplier^(attempt-1), max_delay)` - strictly
    /// increasing while under the cap.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let delay = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        Duration::from_secs_f64(delay.min(self.max_delay.as_secs_f64()))
    }

    /// Whether a failure message identifies a transient, retryable failure
    pub fn is_retryable(&self, message: &str) -> bool {
        match &self.retryable_errors {
            None => true,
            Some(keywords) => {
                let message = message.to_lowercase();
                keywords.iter().any(|k| message.contains(&k.to_lowercase()))
            }
        }
    }
}

/// Final failure of a retried operation, annotated with the attempt count
#[derive(Debug, thiserror::Error)]
#[error("{message} (after {attempts} attempt(s))")]
pub struct RetryError {
    pub message: String,
    pub attempts: u32,
}

/// Outcome of [`retry_safe`]: never propagates, always reports attempts
#[derive(Debug)]
pub struct RetryOutcome<T> {
    /// The success value, when any attempt succeeded
    pub value: Option<T>,

    /// The final failure message, when every attempt failed
    pub error: Option<String>,

    /// Number of invocations actually made
    pub attempts: u32,
}

impl<T> RetryOutcome<T> {
    pub fn success(&self) -> bool {
        self.value.is_some()
    }
}

/// Invoke `operation` with bounded retry and exponential backoff
///
/// Returns the success value and the number of attempts made. The first
/// success returns immediately; a non-retryable failure surfaces at once;
/// exhaustion surfaces the final failure annotated with the attempt count.
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Result<(T, u32), RetryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, String>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => return Ok((value, attempt)),
            Err(message) => {
                if attempt >= max_attempts || !policy.is_retryable(&message) {
                    return Err(RetryError { message, attempts: attempt });
                }
                let delay = policy.delay_for_attempt(attempt);
                debug!(
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %message,
                    "Attempt failed, backing off before retry"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Like [`retry`], but never propagates: the final failure is returned in
/// the outcome instead of raised.
pub async fn retry_safe<T, F, Fut>(policy: &RetryPolicy, operation: F) -> RetryOutcome<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, String>>,
{
    match retry(policy, operation).await {
        Ok((value, attempts)) => RetryOutcome {
            value: Some(value),
            error: None,
            attempts,
        },
        Err(e) => RetryOutcome {
            value: None,
            error: Some(e.message),
            attempts: e.attempts,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Instant;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            initial_delay: Duration::from_millis(10),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_millis(100),
            retryable_errors: None,
        }
    }

    #[test]
    fn test_delay_growth_is_capped() {
        let policy = RetryPolicy {
            initial_delay: Duration::from_millis(100),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_millis(250),
            ..RetryPolicy::default()
        };

        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(200));
        // 400ms would exceed the cap
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(250));
        assert_eq!(policy.delay_for_attempt(10), Duration::from_millis(250));
    }

    #[test]
    fn test_delays_strictly_increasing_under_cap() {
        let policy = fast_policy();
        let mut previous = Duration::ZERO;
        for attempt in 1..=3 {
            let delay = policy.delay_for_attempt(attempt);
            assert!(delay > previous, "attempt {} delay not increasing", attempt);
            previous = delay;
        }
    }

    #[test]
    fn test_keyword_classification_case_insensitive() {
        let policy = RetryPolicy {
            retryable_errors: Some(vec!["Timeout".to_string(), "ECONNRESET".to_string()]),
            ..RetryPolicy::default()
        };

        assert!(policy.is_retryable("request TIMEOUT after 30s"));
        assert!(policy.is_retryable("socket error: econnreset"));
        assert!(!policy.is_retryable("element not found"));
    }

    #[test]
    fn test_no_keyword_list_retries_everything() {
        let policy = RetryPolicy::default();
        assert!(policy.is_retryable("anything at all"));
    }

    #[tokio::test]
    async fn test_success_on_first_attempt_invokes_once() {
        let calls = AtomicU32::new(0);
        let (value, attempts) = retry(&fast_policy(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, String>(42) }
        })
        .await
        .unwrap();

        assert_eq!(value, 42);
        assert_eq!(attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fails_twice_then_succeeds() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let (value, attempts) = retry(&fast_policy(), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err("connection reset".to_string())
                } else {
                    Ok("done")
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(value, "done");
        assert_eq!(attempts, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 10ms + 20ms of inserted backoff delay
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[tokio::test]
    async fn test_exhaustion_reports_final_error_and_count() {
        let calls = AtomicU32::new(0);
        let result: Result<((), u32), RetryError> = retry(&fast_policy(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("still broken".to_string()) }
        })
        .await;

        let err = result.unwrap_err();
        assert_eq!(err.attempts, 3);
        assert_eq!(err.message, "still broken");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_fails_immediately() {
        let policy = RetryPolicy {
            retryable_errors: Some(vec!["timeout".to_string()]),
            ..fast_policy()
        };

        let calls = AtomicU32::new(0);
        let result: Result<((), u32), RetryError> = retry(&policy, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("assertion mismatch".to_string()) }
        })
        .await;

        let err = result.unwrap_err();
        assert_eq!(err.attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_safe_never_raises() {
        let outcome: RetryOutcome<()> = retry_safe(&fast_policy(), || async {
            Err("boom".to_string())
        })
        .await;

        assert!(!outcome.success());
        assert_eq!(outcome.attempts, 3);
        assert_eq!(outcome.error.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn test_retry_safe_success() {
        let outcome = retry_safe(&fast_policy(), || async { Ok::<_, String>(7) }).await;
        assert!(outcome.success());
        assert_eq!(outcome.value, Some(7));
        assert_eq!(outcome.attempts, 1);
        assert!(outcome.error.is_none());
    }
}
