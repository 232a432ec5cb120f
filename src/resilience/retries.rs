//! Retry logic.
//!
//! # Responsibilities
//! - Drive a request through Attempt → (Success | Backoff → Attempt | Exhausted)
//! - Bound the number of attempts and the wall time spent on one request
//!
//! # Design Decisions
//! - Only transport failures reach this module; an HTTP error status from an
//!   origin is a successful attempt
//! - Every attempt re-selects a backend, so retries rotate through the pool
//! - The sequence is a single future: dropping it (client gone) cancels the
//!   in-flight attempt and any pending backoff

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::config::RetryConfig;
use crate::resilience::backoff::calculate_backoff;

/// Retry bounds for one request.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    max_elapsed: Duration,
    base_delay_ms: u64,
    max_delay_ms: u64,
    jitter_ratio: f64,
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Wait this long, then attempt again.
    Retry(Duration),
    /// Stop and report the failure.
    GiveUp,
}

/// Terminal state: every allowed attempt failed.
#[derive(Debug)]
pub struct RetryExhausted<E> {
    pub attempts: u32,
    pub elapsed: Duration,
    pub last_error: E,
}

impl<E: fmt::Display> fmt::Display for RetryExhausted<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "gave up after {} attempt(s) in {:?}: {}",
            self.attempts, self.elapsed, self.last_error
        )
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for RetryExhausted<E> {}

enum Phase {
    Attempt,
    Backoff(Duration),
}

impl RetryPolicy {
    pub fn new(
        max_attempts: u32,
        max_elapsed: Duration,
        base_delay_ms: u64,
        max_delay_ms: u64,
    ) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            max_elapsed,
            base_delay_ms,
            max_delay_ms,
            jitter_ratio: 0.0,
        }
    }

    pub fn with_jitter(mut self, jitter_ratio: f64) -> Self {
        self.jitter_ratio = jitter_ratio;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Decide the next step after `attempts` failures, `elapsed` into the request.
    pub fn verdict(&self, attempts: u32, elapsed: Duration) -> Verdict {
        if attempts >= self.max_attempts {
            return Verdict::GiveUp;
        }

        let delay = calculate_backoff(
            attempts,
            self.base_delay_ms,
            self.max_delay_ms,
            self.jitter_ratio,
        );
        if elapsed.saturating_add(delay) >= self.max_elapsed {
            return Verdict::GiveUp;
        }
        Verdict::Retry(delay)
    }

    /// Run `attempt` until it succeeds or the policy gives up.
    ///
    /// `attempt` receives the 1-based attempt number.
    pub async fn run<T, E, F, Fut>(&self, mut attempt: F) -> Result<T, RetryExhausted<E>>
    where
        E: fmt::Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let started = Instant::now();
        let mut attempts = 0;
        let mut phase = Phase::Attempt;

        loop {
            phase = match phase {
                Phase::Attempt => {
                    attempts += 1;
                    let error = match attempt(attempts).await {
                        Ok(value) => return Ok(value),
                        Err(error) => error,
                    };

                    let elapsed = started.elapsed();
                    match self.verdict(attempts, elapsed) {
                        Verdict::Retry(delay) => {
                            tracing::debug!(
                                attempt = attempts,
                                delay = ?delay,
                                error = %error,
                                "Retrying after upstream failure"
                            );
                            Phase::Backoff(delay)
                        }
                        Verdict::GiveUp => {
                            return Err(RetryExhausted {
                                attempts,
                                elapsed,
                                last_error: error,
                            })
                        }
                    }
                }
                Phase::Backoff(delay) => {
                    tokio::time::sleep(delay).await;
                    Phase::Attempt
                }
            };
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_secs(config.max_elapsed_secs),
            config.backoff_ms,
            config.max_backoff_ms,
        )
        .with_jitter(config.jitter_ratio)
    }
}
