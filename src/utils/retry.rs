//! Bounded retry with exponential backoff for model calls.
//!
//! Unlike a transport-level retry, every failure here is retryable: a model
//! that answers with something unparseable is treated exactly like one that
//! is unreachable. The caller decides what an exhausted retry means.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Attempt bound shared by the classification and summarization gateways
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Configuration for retry behavior
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first
    pub max_attempts: u32,
    /// Delay before the second attempt; zero disables sleeping entirely
    pub initial_delay: Duration,
    /// Maximum delay between attempts
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Set the attempt bound
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Retry immediately, without sleeping between attempts
    pub fn no_delay(mut self) -> Self {
        self.initial_delay = Duration::ZERO;
        self
    }

    /// Delay to wait after the given (1-based) failed attempt
    pub fn delay_after(&self, attempt: u32) -> Duration {
        if self.initial_delay.is_zero() {
            return Duration::ZERO;
        }
        let exp_delay = self.initial_delay.as_secs_f64()
            * self.backoff_multiplier.powf(attempt.saturating_sub(1) as f64);
        Duration::from_secs_f64(exp_delay.min(self.max_delay.as_secs_f64()))
    }
}

/// Result of a retry operation
#[derive(Debug)]
pub enum RetryResult<T, E> {
    /// Operation succeeded on the given attempt
    Success { value: T, attempts: u32 },
    /// Every attempt failed; errors are in attempt order
    Exhausted { errors: Vec<E> },
}

impl<T, E> RetryResult<T, E> {
    /// The successful value, if any
    pub fn ok(self) -> Option<T> {
        match self {
            RetryResult::Success { value, .. } => Some(value),
            RetryResult::Exhausted { .. } => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RetryResult::Success { .. })
    }
}

/// Execute an async operation until it succeeds or the attempt bound is hit.
///
/// The operation receives the 1-based attempt number.
pub async fn with_retry<T, E, F, Fut>(config: RetryConfig, mut operation: F) -> RetryResult<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let max_attempts = config.max_attempts.max(1);
    let mut errors = Vec::new();

    for attempt in 1..=max_attempts {
        match operation(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::debug!(
                        "Operation succeeded on attempt {} after {} failures",
                        attempt,
                        attempt - 1
                    );
                }
                return RetryResult::Success {
                    value,
                    attempts: attempt,
                };
            }
            Err(error) => {
                tracing::debug!("Attempt {}/{} failed: {}", attempt, max_attempts, error);
                errors.push(error);

                if attempt < max_attempts {
                    let delay = config.delay_after(attempt);
                    if !delay.is_zero() {
                        sleep(delay).await;
                    }
                }
            }
        }
    }

    RetryResult::Exhausted { errors }
}
