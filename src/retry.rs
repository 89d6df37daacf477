use std::future::Future;
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::classifier::{classify, is_retryable};
use crate::error::{FetchError, ResolutionError};

/// Upper bound on a single backoff delay.
pub const MAX_BACKOFF: Duration = Duration::from_secs(300);

/// How many times, how often, and for how long an upstream call is attempted.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry
    pub initial_backoff: Duration,
    /// Growth factor applied to the delay after every retry
    pub backoff_multiplier: f64,
    /// Deadline of a single attempt
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(500),
            backoff_multiplier: 2.0,
            attempt_timeout: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt.
    pub fn no_retry(attempt_timeout: Duration) -> Self {
        Self {
            max_retries: 0,
            attempt_timeout,
            ..Self::default()
        }
    }

    /// Delay to wait before retry number `retry` (1-based), capped at [`MAX_BACKOFF`].
    pub fn backoff(&self, retry: u32) -> Duration {
        let exponent = i32::try_from(retry.saturating_sub(1)).unwrap_or(i32::MAX);
        let factor = self.backoff_multiplier.max(1.0).powi(exponent);
        Duration::try_from_secs_f64(self.initial_backoff.as_secs_f64() * factor)
            .unwrap_or(MAX_BACKOFF)
            .min(MAX_BACKOFF)
    }
}

/// A result together with the number of attempts it took.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<T> {
    pub result: Result<T, ResolutionError>,
    pub attempts: u32,
}

impl<T> Outcome<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> Result<U, ResolutionError>) -> Outcome<U> {
        Outcome {
            result: self.result.and_then(f),
            attempts: self.attempts,
        }
    }

    pub fn map_err(self, f: impl FnOnce(ResolutionError) -> ResolutionError) -> Outcome<T> {
        Outcome {
            result: self.result.map_err(f),
            attempts: self.attempts,
        }
    }
}

/// Runs `call` until it succeeds, fails with a terminal error, or the policy
/// runs out of retries. Each attempt is cut off at `attempt_timeout`.
pub async fn run<T, F, Fut>(policy: &RetryPolicy, what: &str, mut call: F) -> Outcome<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let mut attempts = 0;
    loop {
        attempts += 1;
        debug!("{} (attempt {})", what, attempts);

        let failure = match tokio::time::timeout(policy.attempt_timeout, call()).await {
            Ok(Ok(value)) => {
                return Outcome {
                    result: Ok(value),
                    attempts,
                };
            }
            Ok(Err(failure)) => failure,
            Err(_) => FetchError::Timeout(policy.attempt_timeout),
        };

        if !is_retryable(&failure) {
            debug!("{} failed with a terminal error: {}", what, failure);
            return Outcome {
                result: Err(classify(&failure)),
                attempts,
            };
        }

        if attempts > policy.max_retries {
            error!("Retries exhausted for {} after {} attempts: {}", what, attempts, failure);
            return Outcome {
                result: Err(exhausted(what, &failure, attempts)),
                attempts,
            };
        }

        let delay = policy.backoff(attempts);
        warn!("Retrying {} in {:?} after error: {}", what, delay, failure);
        tokio::time::sleep(delay).await;
    }
}

fn exhausted(what: &str, last: &FetchError, attempts: u32) -> ResolutionError {
    match classify(last) {
        ResolutionError::Timeout(message) => ResolutionError::Timeout(format!(
            "{message} ({what}: retries exhausted after {attempts} attempts)"
        )),
        other => ResolutionError::UpstreamUnavailable(format!(
            "{what} failed after {attempts} attempts, retries exhausted; please try again later ({other})"
        )),
    }
}
