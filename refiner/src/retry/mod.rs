//! Retry controller with bounded exponential backoff
//!
//! Wraps one orchestration attempt. Transient failures (network, rate
//! limiting, overload) are retried after a growing delay; anything else is
//! surfaced on the spot. Waiting goes through [`Sleeper`] so tests never sleep.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error, warn};

use crate::error::RefineError;
use crate::events::EventEmitter;

/// Backoff parameters
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub backoff_factor: f64,
    /// Cap for any single delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait before `attempt` (1-based). Zero for the first attempt.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt < 2 {
            return Duration::ZERO;
        }
        let exponent = i32::try_from(attempt - 2).unwrap_or(i32::MAX);
        let secs = self.base_delay.as_secs_f64() * self.backoff_factor.powi(exponent);
        let capped = secs.min(self.max_delay.as_secs_f64());
        Duration::try_from_secs_f64(capped).unwrap_or(self.max_delay)
    }
}

/// One attempt as seen by telemetry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryAttemptRecord {
    pub attempt: u32,
    /// Wait before this attempt
    pub delay: Duration,
    /// Whether the failure that caused the wait was retryable
    pub retryable: bool,
}

/// Suspends the current task between attempts
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Production sleeper backed by `tokio::time::sleep`
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Runs an operation under a [`RetryPolicy`]
#[derive(Clone)]
pub struct RetryController {
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl RetryController {
    pub fn new(policy: RetryPolicy, sleeper: Arc<dyn Sleeper>) -> Self {
        debug!(?policy, "RetryController::new: called");
        Self { policy, sleeper }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    ///
    /// `op` receives the 1-based attempt number. Every attempt and every
    /// scheduled delay is recorded before its outcome is known.
    pub async fn run<T, F, Fut>(&self, emitter: &EventEmitter, mut op: F) -> Result<T, RefineError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, RefineError>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        debug!(max_attempts, "RetryController::run: called");
        let mut attempt = 1;

        loop {
            emitter.attempt_started(attempt, max_attempts);
            debug!(attempt, max_attempts, "RetryController::run: attempt started");

            let err = match op(attempt).await {
                Ok(value) => {
                    debug!(attempt, "RetryController::run: attempt succeeded");
                    return Ok(value);
                }
                Err(err) => err,
            };

            let retryable = err.is_retryable();
            emitter.attempt_failed(attempt, err.kind().as_str(), retryable, &err.to_string());

            if !retryable {
                debug!(attempt, kind = %err.kind(), "RetryController::run: non-retryable error");
                return Err(err);
            }

            if attempt >= max_attempts {
                error!(attempts = attempt, kind = %err.kind(), "RetryController::run: retries exhausted");
                return Err(RefineError::RetriesExhausted {
                    attempts: attempt,
                    kind: err.kind(),
                });
            }

            attempt += 1;
            let record = RetryAttemptRecord {
                attempt,
                delay: self.policy.delay_before(attempt),
                retryable,
            };
            warn!(
                attempt = record.attempt,
                delay_ms = record.delay.as_millis() as u64,
                error = %err,
                "RetryController::run: retrying after transient failure"
            );
            emitter.retry_scheduled(record.attempt, record.delay.as_millis() as u64, record.retryable);
            self.sleeper.sleep(record.delay).await;
        }
    }
}

#[cfg(test)]
pub mod testing {
    use std::sync::Mutex;

    use super::*;

    /// Sleeper that records requested delays and returns immediately
    #[derive(Default)]
    pub struct RecordingSleeper {
        delays: Mutex<Vec<Duration>>,
    }

    impl RecordingSleeper {
        pub fn delays(&self) -> Vec<Duration> {
            self.delays.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.delays.lock().unwrap().push(duration);
        }
    }
}
