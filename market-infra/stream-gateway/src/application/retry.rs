//! Bounded retry with exponential backoff.
//!
//! Stateless control-flow combinator: runs an async operation up to
//! `max_attempts` times, doubling the delay after every transient failure
//! (capped at `max_delay`). A terminal failure is returned immediately.

use std::fmt;
use std::future::Future;
use std::time::Duration;

/// How a failed attempt should be treated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryError<E> {
    /// Sleep and try again
    Transient(E),
    /// Abort now and surface the error
    Terminal(E),
}

impl<E> RetryError<E> {
    pub fn into_inner(self) -> E {
        match self {
            RetryError::Transient(e) | RetryError::Terminal(e) => e,
        }
    }
}

/// Attempt budget and backoff shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total tries, including the first one
    pub max_attempts: u32,
    /// Delay after the first failure
    pub initial_delay: Duration,
    /// Backoff ceiling
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        RetryPolicy {
            max_attempts,
            initial_delay,
            max_delay: Duration::from_secs(60),
        }
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Delay to wait after the given failed attempt (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.initial_delay
            .saturating_mul(2u32.saturating_pow(exponent))
            .min(self.max_delay)
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

impl Default for RetryPolicy {
    /// 3 tries starting at 5s: waits 5s then 10s
    fn default() -> Self {
        RetryPolicy::new(3, Duration::from_secs(5))
    }
}

/// Run `operation` under `policy`, returning its first success or last error.
///
/// `label` only feeds log output.
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, label: &str, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RetryError<E>>>,
    E: fmt::Display,
{
    let attempts = policy.attempts();
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(%label, attempt, "operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(RetryError::Terminal(e)) => {
                tracing::error!(%label, attempt, error = %e, "terminal failure, not retrying");
                return Err(e);
            }
            Err(RetryError::Transient(e)) => {
                if attempt >= attempts {
                    tracing::error!(%label, attempts, error = %e, "retry budget exhausted");
                    return Err(e);
                }

                let delay = policy.delay_after(attempt);
                tracing::warn!(
                    %label,
                    attempt,
                    max_attempts = attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
