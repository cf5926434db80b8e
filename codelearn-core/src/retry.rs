//! # Retry policy
//!
//! Every call to an external collaborator runs under a deadline and gets at
//! most one more attempt when the failure is transient. When the budget is
//! spent the last error is returned marked `Persistent`.

use crate::error::{self, Result};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Timeout and retry budget applied to one external call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Deadline for a single attempt
    pub timeout: Duration,
    /// Extra attempts after the first one (clamped to 1)
    pub max_retries: u32,
    /// Pause before the retry
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
            max_retries: 1,
            backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }

    /// A policy that never retries
    pub fn no_retry(timeout: Duration) -> Self {
        Self {
            timeout,
            max_retries: 0,
            backoff: Duration::ZERO,
        }
    }

    /// Same deadline, one attempt. For calls that must not run twice.
    pub fn single_attempt(self) -> Self {
        Self::no_retry(self.timeout)
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries.min(1);
        self
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Total attempts this policy allows
    pub fn attempts(&self) -> u32 {
        1 + self.max_retries.min(1)
    }

    /// Run `call` under the policy.
    ///
    /// Permanent errors are returned immediately. A transient error (or a
    /// timeout) triggers one retry; if that also fails the error is marked
    /// persistent and annotated with the attempt count.
    pub async fn run<T, F, Fut>(&self, operation: &'static str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.attempts();
        let mut attempt = 1;
        loop {
            let outcome = match tokio::time::timeout(self.timeout, call()).await {
                Ok(result) => result,
                Err(_) => Err(error::timed_out(operation, self.timeout)),
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < attempts => {
                    warn!(operation, attempt, error = %err, "transient failure, retrying");
                    if !self.backoff.is_zero() {
                        tokio::time::sleep(self.backoff).await;
                    }
                    attempt += 1;
                }
                Err(err) if err.is_retryable() => {
                    return Err(err
                        .persist()
                        .with_context("attempts", attempt.to_string()));
                }
                Err(err) => return Err(err),
            }
        }
    }
}
