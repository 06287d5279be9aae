//! Bounded retry with exponential backoff.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use chronicle_core::error::DomainError;

/// Retry policy: how many attempts, and the delay before the second one.
/// The delay doubles after each failed attempt.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    /// Total attempts, including the first.
    pub attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_millis(50),
        }
    }
}

impl Backoff {
    /// A policy with no delay between attempts, for tests.
    #[must_use]
    pub fn immediate(attempts: u32) -> Self {
        Self {
            attempts,
            base_delay: Duration::ZERO,
        }
    }
}

/// Runs `operation` until it succeeds, returns a non-retryable error, or
/// the policy's attempts are exhausted; the last error is returned as-is
/// for the caller to surface or map.
///
/// # Errors
///
/// Propagates the operation's error.
pub async fn with_backoff<T, F, Fut>(policy: Backoff, mut operation: F) -> Result<T, DomainError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DomainError>>,
{
    let mut delay = policy.base_delay;
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < policy.attempts => {
                warn!(attempt, error = %err, "retryable failure, backing off");
                tokio::time::sleep(delay).await;
                delay *= 2;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
