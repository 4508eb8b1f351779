//! Reusable retry policy for upstream API calls.
//!
//! Both pipeline stages talk to rate-limited SaaS APIs. The segment fetch
//! retries any failed page with a linearly growing delay, while commerce
//! lookups retry only throttled (429) responses after a fixed delay. Both
//! are expressed as a [`RetryPolicy`] so the loops share one implementation.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// `step × attempt` after the n-th failed attempt.
    Linear(Duration),
    /// The same delay after every failed attempt.
    Fixed(Duration),
}

/// How many times an operation is attempted and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Always at least 1.
    pub max_attempts: u32,
    /// Delay strategy between attempts.
    pub backoff: Backoff,
}

impl RetryPolicy {
    /// Linear step used by the segment fetch (500ms, 1s, 1.5s, ...).
    pub const SEGMENT_FETCH_STEP: Duration = Duration::from_millis(500);

    /// Fixed delay after a rate-limited commerce lookup.
    pub const RATE_LIMIT_DELAY: Duration = Duration::from_secs(1);

    /// Attempt cap for rate-limited lookups (roughly one minute of throttling).
    pub const RATE_LIMIT_MAX_ATTEMPTS: u32 = 60;

    /// Create a policy; `max_attempts` is clamped to at least one attempt.
    #[must_use]
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Policy for segment page requests: `max_retries` attempts with a
    /// linear 500ms backoff.
    #[must_use]
    pub fn segment_fetch(max_retries: u32) -> Self {
        Self::new(max_retries, Backoff::Linear(Self::SEGMENT_FETCH_STEP))
    }

    /// Policy for rate-limited commerce lookups: fixed 1s delay, capped at
    /// [`Self::RATE_LIMIT_MAX_ATTEMPTS`].
    #[must_use]
    pub fn rate_limit() -> Self {
        Self::new(
            Self::RATE_LIMIT_MAX_ATTEMPTS,
            Backoff::Fixed(Self::RATE_LIMIT_DELAY),
        )
    }

    /// Delay to wait after the given (1-indexed) failed attempt.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Linear(step) => step.saturating_mul(attempt),
            Backoff::Fixed(delay) => delay,
        }
    }

    /// Run `op` until it succeeds, `should_retry` rejects its error, or the
    /// attempts are exhausted. The closure receives the 1-indexed attempt
    /// number. The last error is returned on failure.
    ///
    /// # Errors
    ///
    /// Returns the error of the final attempt.
    pub async fn run<T, E, F, Fut, P>(
        &self,
        operation: &str,
        mut op: F,
        should_retry: P,
    ) -> Result<T, E>
    where
        E: Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_attempts && should_retry(&e) => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        operation,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %e,
                        "Retrying after failure"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
