use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tracing::warn;

use crate::error::{FetchError, NamespaceScanError};

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Throttling backs off linearly with jitter, timeouts for a fixed second,
/// anything else is returned on the spot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Added once per attempt number on a throttle signal.
    pub throttle_step: Duration,
    /// Upper bound (exclusive) of the random part of a throttle backoff.
    pub throttle_jitter: Duration,
    pub timeout_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            throttle_step: Duration::from_millis(500),
            throttle_jitter: Duration::from_millis(500),
            timeout_backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Deterministic backoffs, for tests and reproducible runs.
    pub fn without_jitter(mut self) -> Self {
        self.throttle_jitter = Duration::ZERO;
        self
    }

    /// How long to wait after `attempt` (1-based) failed with `err`, or
    /// `None` when the error must not be retried.
    pub fn backoff(&self, err: &FetchError, attempt: u32, jitter: Duration) -> Option<Duration> {
        match err {
            FetchError::RateLimited(_) => Some(jitter + self.throttle_step * attempt),
            FetchError::DeadlineExceeded => Some(self.timeout_backoff),
            FetchError::Other(_) => None,
        }
    }

    fn sample_jitter(&self) -> Duration {
        let max = self.throttle_jitter.as_millis() as u64;
        if max == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::rng().random_range(0..max))
    }

    /// Upper bound of the total time spent sleeping between attempts.
    #[cfg(test)]
    pub(crate) fn max_total_backoff(&self) -> Duration {
        (1..self.max_attempts)
            .map(|attempt| {
                let throttle = self
                    .throttle_jitter
                    .saturating_add(self.throttle_step.saturating_mul(attempt));
                throttle.max(self.timeout_backoff)
            })
            .fold(Duration::ZERO, Duration::saturating_add)
    }
}

/// Notification about a failed attempt that is about to be retried.
#[derive(Debug, Clone)]
pub struct RetryEvent<'a> {
    pub attempt: u32,
    pub max_attempts: u32,
    pub error: &'a FetchError,
    pub backoff: Duration,
}

/// Run `op` until it succeeds, hits a non-retryable error, or runs out of attempts.
///
/// `op` receives the 1-based attempt number. No sleep follows the final attempt.
pub async fn retry_fetch<T, F, Fut, N>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    mut op: F,
    mut on_retry: N,
) -> Result<T, NamespaceScanError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
    N: FnMut(RetryEvent<'_>),
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        let err = match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        let Some(backoff) = policy.backoff(&err, attempt, policy.sample_jitter()) else {
            return Err(NamespaceScanError::NonRetryable(err));
        };
        if attempt >= max_attempts {
            return Err(NamespaceScanError::RetriesExhausted {
                attempts: attempt,
                last: err,
            });
        }

        warn!(attempt, max_attempts, backoff_ms = backoff.as_millis() as u64, error = %err, "Retrying list call");
        on_retry(RetryEvent {
            attempt,
            max_attempts,
            error: &err,
            backoff,
        });
        sleeper.sleep(backoff).await;
        attempt += 1;
    }
}
