//! Bounded retry with exponential backoff.

use std::path::Path;
use std::time::Duration;

use tracing::debug;

use crate::clock::Clock;
use crate::error::{ClassifiedError, Result};
use crate::taxonomy::ErrorCode;

/// How many times to repeat a failing operation and how long to wait between tries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one.
    pub retries: u32,
    /// Wait before the first retry; doubles on every later retry.
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Default number of retries.
    pub const DEFAULT_RETRIES: u32 = 3;

    /// Default base backoff.
    pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(100);

    pub const fn new(retries: u32, backoff: Duration) -> Self {
        Self { retries, backoff }
    }

    /// A single attempt and no waiting.
    pub const fn once() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Total attempts, counting the first.
    pub fn attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    /// Wait after the zero-based failed `attempt`: `backoff * 2^attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff
            .saturating_mul(2u32.saturating_pow(attempt.min(31)))
    }

    /// Run `attempt_fn` until it succeeds, fails with a non-retryable code,
    /// or runs out of attempts.
    ///
    /// Exhaustion yields `EUNKNOWN` wrapping the last failure, with the
    /// attempt count in the context.
    pub(crate) fn run<T>(
        &self,
        clock: &dyn Clock,
        operation: &str,
        path: &Path,
        mut attempt_fn: impl FnMut(u32) -> Result<T>,
    ) -> Result<T> {
        let mut last_error: Option<ClassifiedError> = None;

        for attempt in 0..self.attempts() {
            match attempt_fn(attempt) {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_retryable() => return Err(err),
                Err(err) => {
                    debug!(
                        operation,
                        path = %path.display(),
                        attempt,
                        code = %err.code(),
                        "attempt failed: {}",
                        err
                    );
                    last_error = Some(err);
                    if attempt < self.retries {
                        let wait = self.delay_for(attempt);
                        debug!(operation, wait_ms = wait.as_millis() as u64, "retrying");
                        clock.sleep(wait);
                    }
                }
            }
        }

        let attempts = self.attempts();
        let detail = last_error
            .as_ref()
            .map(|e| e.to_string())
            .unwrap_or_default();
        let err = ClassifiedError::new(
            ErrorCode::Unknown,
            format!(
                "Failed to {} {} after {} attempts: {}",
                operation,
                path.display(),
                attempts,
                detail
            ),
        )
        .with_context("path", path.display().to_string())
        .with_context("attempts", attempts);

        Err(match last_error {
            Some(cause) => err.with_cause(cause),
            None => err,
        })
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_RETRIES, Self::DEFAULT_BACKOFF)
    }
}
