//! Bounded retry for transient failures during network setup.
//!
//! An operation is attempted up to [`RetryPolicy::max_attempts`] times. The
//! first success is returned immediately; after the last failed attempt the
//! caller receives [`Error::RetriesExhausted`] wrapping the final error and
//! decides whether that is fatal.

use std::{error::Error as StdError, fmt::Display, future::Future, time::Duration};

use tracing::{info, warn};

use crate::{Error, Result};

/// Delay strategy between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Wait the same amount after every failure.
    Fixed(Duration),
    /// Double the wait after every failure, starting at `base`, capped at `max`.
    Exponential { base: Duration, max: Duration },
}

impl Backoff {
    /// Delay to wait after the given 1-based failed attempt.
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match *self {
            Self::Fixed(delay) => delay,
            Self::Exponential { base, max } => {
                let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
                std::cmp::min(base.saturating_mul(factor), max)
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    /// At least one attempt is always made.
    #[must_use]
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(5, Backoff::Exponential {
            base: Duration::from_secs(1),
            max: Duration::from_secs(30),
        })
    }
}

/// Run `op` until it succeeds or the policy's attempts are used up.
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, operation: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: Into<Box<dyn StdError + Send + Sync>> + Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        match op().await {
            Ok(value) => {
                if attempt > 1 {
                    info!(operation, attempt, "succeeded after retry");
                }
                return Ok(value);
            },
            Err(e) if attempt >= max_attempts => {
                return Err(Error::retries_exhausted(operation, attempt, e));
            },
            Err(e) => {
                let wait = policy.backoff.delay_after(attempt);
                warn!(
                    operation,
                    attempt,
                    max_attempts,
                    retry_in_ms = wait.as_millis() as u64,
                    error = %e,
                    "attempt failed, retrying"
                );
                tokio::time::sleep(wait).await;
            },
        }
    }
}
