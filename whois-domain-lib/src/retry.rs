//! Retry policy for flaky registry servers.
//!
//! WHOIS servers are fussy about load and occasionally drop connections.
//! `RetryPolicy` reruns an operation over a Fibonacci delay sequence, but
//! only while a caller-supplied predicate classifies the failure as
//! transient. The policy knows nothing about WHOIS itself.

use crate::error::WhoisDomainError;
use std::future::Future;
use std::time::Duration;
use tokio_retry::strategy::FibonacciBackoff;
use tokio_retry::RetryIf;
use tracing::warn;

/// Bounded retry with Fibonacci backoff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    base_delay: Duration,
    max_attempts: usize,
}

impl RetryPolicy {
    /// Create a policy that waits `base_delay`, `base_delay`, `2*base_delay`,
    /// `3*base_delay`, `5*base_delay`, ... between attempts.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when `max_attempts` is zero, since such
    /// a policy could never run the operation.
    pub fn fibonacci(base_delay: Duration, max_attempts: usize) -> Result<Self, WhoisDomainError> {
        if max_attempts == 0 {
            return Err(WhoisDomainError::config(
                "Retry policy needs at least one attempt",
            ));
        }
        Ok(Self {
            base_delay,
            max_attempts,
        })
    }

    /// Maximum number of attempts, including the first.
    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// The sleep before each retry, in order.
    pub fn delays(&self) -> impl Iterator<Item = Duration> {
        let millis = self.base_delay.as_millis().max(1) as u64;
        FibonacciBackoff::from_millis(millis).take(self.max_attempts - 1)
    }

    /// Run `action` until it succeeds, fails with a non-retryable error, or
    /// the attempt budget runs out.
    ///
    /// Non-retryable errors are returned unchanged after the attempt that
    /// produced them. When every attempt fails with a retryable error the
    /// last one is wrapped in `RetryExhausted`.
    pub async fn run<T, A, Fut, P>(&self, action: A, is_retryable: P) -> Result<T, WhoisDomainError>
    where
        A: FnMut() -> Fut,
        Fut: Future<Output = Result<T, WhoisDomainError>>,
        P: Fn(&WhoisDomainError) -> bool,
    {
        let condition = |e: &WhoisDomainError| {
            let retry = is_retryable(e);
            if retry {
                warn!(error = %e, "Retryable failure");
            }
            retry
        };

        match RetryIf::start(self.delays(), action, condition).await {
            Ok(value) => Ok(value),
            Err(e) if is_retryable(&e) => Err(WhoisDomainError::RetryExhausted {
                attempts: self.max_attempts,
                last: Box::new(e),
            }),
            Err(e) => Err(e),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(100),
            max_attempts: 10,
        }
    }
}
