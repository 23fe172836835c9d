//! Bounded retry with exponential backoff for connector calls.
//!
//! The executor's job is to convert repeated failure of one source into
//! "this source contributed nothing" - it never propagates the final error
//! and never fails the overall aggregation.

use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

use sourcing_hub_core::SourceId;

use super::SourceError;

/// Retry schedule for one connector call.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Attempts before degrading, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles each retry.
    pub base_delay: Duration,
    /// Ceiling on any single backoff delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Backoff before the retry following `attempt` failures:
    /// `base * 2^(attempt-1)`, capped at `max_delay`.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Outcome of a retry-wrapped source call.
///
/// `Degraded` records that the source exhausted its retries. Callers treat
/// it as an empty contribution, but it stays distinguishable from a source
/// that genuinely found nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceOutcome<T> {
    Complete(T),
    Degraded,
}

impl<T> SourceOutcome<T> {
    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded)
    }

    #[must_use]
    pub fn into_inner(self) -> Option<T> {
        match self {
            Self::Complete(value) => Some(value),
            Self::Degraded => None,
        }
    }
}

/// Run `op` with bounded retries, absorbing repeated failure.
///
/// Every attempt and its outcome is traced with the attempt number and
/// latency - that is the observability contract for diagnosing slow or
/// flaky upstreams, not decoration.
pub async fn run_with_retries<T, F, Fut>(
    policy: &RetryPolicy,
    source: SourceId,
    mut op: F,
) -> SourceOutcome<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SourceError>>,
{
    let max_attempts = policy.max_attempts.max(1);

    for attempt in 1..=max_attempts {
        let started = Instant::now();
        match op().await {
            Ok(value) => {
                debug!(
                    %source,
                    attempt,
                    latency = ?started.elapsed(),
                    "source call succeeded"
                );
                return SourceOutcome::Complete(value);
            }
            Err(err) => {
                warn!(
                    %source,
                    attempt,
                    max_attempts,
                    latency = ?started.elapsed(),
                    error = %err,
                    "source call failed"
                );
                if attempt < max_attempts {
                    sleep(policy.delay_for(attempt)).await;
                }
            }
        }
    }

    warn!(%source, attempts = max_attempts, "retries exhausted, degrading to empty result");
    SourceOutcome::Degraded
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn flaky_error() -> SourceError {
        SourceError::Source {
            source: SourceId::Alibaba,
            message: "upstream hiccup".to_string(),
        }
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(4000));
        // 2^4 * 1000ms = 16s, capped at 10s
        assert_eq!(policy.delay_for(5), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_follow_backoff_schedule() {
        let attempt_times = Mutex::new(Vec::new());

        let outcome = run_with_retries(&RetryPolicy::default(), SourceId::Alibaba, || {
            attempt_times.lock().unwrap().push(Instant::now());
            async { Err::<(), _>(flaky_error()) }
        })
        .await;

        assert!(outcome.is_degraded());

        let times = attempt_times.into_inner().unwrap();
        assert_eq!(times.len(), 3, "attempt 3's failure must not trigger a 4th");
        assert_eq!(times[1] - times[0], Duration::from_millis(1000));
        assert_eq!(times[2] - times[1], Duration::from_millis(2000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_on_second_attempt_stops_retrying() {
        let attempts = AtomicU32::new(0);

        let outcome = run_with_retries(&RetryPolicy::default(), SourceId::CjDropshipping, || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(flaky_error())
                } else {
                    Ok("products")
                }
            }
        })
        .await;

        assert_eq!(outcome, SourceOutcome::Complete("products"));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_immediate_success_makes_one_attempt() {
        let attempts = AtomicU32::new(0);

        let outcome = run_with_retries(&RetryPolicy::default(), SourceId::MadeInChina, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Ok(42) }
        })
        .await;

        assert_eq!(outcome.into_inner(), Some(42));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
