/// Bounded retry for transient upstream failures.
///
/// A policy is built per call site. Only the catalog discovery query uses one
/// today; the model calls are single-attempt.
use std::future::Future;
use std::time::Duration;

use crate::error::AppError;

/// How the wait between attempts grows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay before every retry
    Fixed,
    /// delay * 2^(retry-1), capped
    Exponential { max_delay: Duration },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: usize,
    pub delay: Duration,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(3, Duration::from_secs(2))
    }
}

/// Terminal failure of a retried operation
#[derive(Debug)]
pub struct RetryFailure {
    pub error: AppError,
    pub attempts: usize,
    /// True when the last error was retryable and the attempt budget ran out
    pub exhausted: bool,
}

impl RetryPolicy {
    pub const fn fixed(max_attempts: usize, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
            backoff: Backoff::Fixed,
        }
    }

    pub const fn exponential(max_attempts: usize, delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
            backoff: Backoff::Exponential { max_delay },
        }
    }

    /// Always at least one attempt
    pub fn attempt_budget(&self) -> usize {
        self.max_attempts.max(1)
    }

    /// Wait before the given retry (1 = first retry)
    pub fn delay_for_retry(&self, retry: usize) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }

        match self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Exponential { max_delay } => {
                let factor = 1_u32.checked_shl((retry - 1) as u32).unwrap_or(u32::MAX);
                self.delay.saturating_mul(factor).min(max_delay)
            }
        }
    }

    /// Runs `operation` until it succeeds, fails with an error `should_retry`
    /// rejects, or the attempt budget is spent.
    pub async fn run<T, F, Fut, P>(
        &self,
        label: &str,
        mut operation: F,
        should_retry: P,
    ) -> Result<T, RetryFailure>
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
        P: Fn(&AppError) -> bool,
    {
        let budget = self.attempt_budget();
        let mut attempt = 1;

        loop {
            match operation(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!(operation = %label, attempt, "Succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(error) => {
                    let retryable = should_retry(&error);

                    if !retryable || attempt >= budget {
                        tracing::warn!(
                            operation = %label,
                            attempt,
                            max_attempts = budget,
                            retryable,
                            error = %error,
                            "Giving up"
                        );
                        return Err(RetryFailure {
                            error,
                            attempts: attempt,
                            exhausted: retryable,
                        });
                    }

                    let delay = self.delay_for_retry(attempt);
                    tracing::warn!(
                        operation = %label,
                        attempt,
                        max_attempts = budget,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
