//! Retry-with-backoff for transient plugin I/O failures.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{EngineError, EngineResult};

/// Error-message fragments that mark a failure as transient and worth
/// retrying.
const TRANSIENT_SIGNALS: &[&str] = &[
    "timeout",
    "timed out",
    "connection reset",
    "unreachable",
    "throttl",
    "rate limit",
    "too many requests",
    "service unavailable",
    "503",
];

/// Exponential backoff parameters, jittered ±25 % by default.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
    /// Growth factor between attempts.
    pub multiplier: f64,
    /// Fractional jitter applied to each delay.
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
            jitter: 0.25,
        }
    }
}

impl RetryPolicy {
    fn delay_for(&self, retry: u32) -> Duration {
        let base = self.initial_delay.as_secs_f64() * self.multiplier.powi(retry as i32);
        let capped = base.min(self.max_delay.as_secs_f64());
        let jitter = if self.jitter > 0.0 {
            rand::thread_rng().gen_range(-self.jitter..=self.jitter)
        } else {
            0.0
        };
        Duration::from_secs_f64((capped * (1.0 + jitter)).max(0.0))
    }
}

/// True if the error carries one of the fixed transient signals.
/// Cancellation is never transient.
pub(crate) fn is_transient(err: &EngineError) -> bool {
    if err.is_cancelled() {
        return false;
    }
    let message = err.to_string().to_lowercase();
    TRANSIENT_SIGNALS.iter().any(|signal| message.contains(signal))
}

/// Runs `op` until it succeeds, the error is not transient, the attempts
/// are exhausted, or the cancellation token fires during a backoff delay.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    token: &CancellationToken,
    mut op: F,
) -> EngineResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = EngineResult<T>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt + 1 < attempts && is_transient(&err) => {
                let delay = policy.delay_for(attempt);
                attempt += 1;
                debug!(attempt, delay_ms = delay.as_millis() as u64, "retrying after backoff");
                tokio::select! {
                    _ = token.cancelled() => return Err(err),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn transient() -> EngineError {
        EngineError::plugin("aws", "Query failed", "connection reset by peer")
    }

    fn permanent() -> EngineError {
        EngineError::plugin("aws", "Query failed", "access denied")
    }

    fn quick_policy() -> RetryPolicy {
        RetryPolicy {
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            ..RetryPolicy::default()
        }
    }

    #[test]
    fn transient_signals_are_recognised() {
        assert!(is_transient(&transient()));
        assert!(is_transient(&EngineError::plugin("k8s", "Query failed", "429 Too Many Requests")));
        assert!(!is_transient(&permanent()));
        assert!(!is_transient(&EngineError::Cancelled {
            plugin: "aws".into(),
            operation: "Query failed".into(),
            message: "timed out after 10ms".into(),
        }));
    }

    #[tokio::test]
    async fn retries_until_success() {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff(&quick_policy(), &CancellationToken::new(), || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(transient())
            } else {
                Ok(42)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_errors_fail_fast() {
        let calls = AtomicU32::new(0);
        let result: EngineResult<()> =
            retry_with_backoff(&quick_policy(), &CancellationToken::new(), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(permanent())
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn attempts_are_bounded() {
        let calls = AtomicU32::new(0);
        let result: EngineResult<()> =
            retry_with_backoff(&quick_policy(), &CancellationToken::new(), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(transient())
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn cancellation_stops_the_backoff() {
        let token = CancellationToken::new();
        token.cancel();
        let calls = AtomicU32::new(0);
        let result: EngineResult<()> =
            retry_with_backoff(&RetryPolicy::default(), &token, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(transient())
            })
            .await;
        assert!(result.is_err());
        // the first attempt runs, the backoff before the second is aborted
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
