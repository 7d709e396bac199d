//! Retry strategies and predicates for failed attempts.
//!
//! A [`RetryStrategy`] decides how long to wait before each retry and when to
//! stop; a [`RetryPredicate`] decides whether a given error is worth retrying
//! at all. Cancellation is never retried, whatever the predicate says.

use crate::Error;
use rand::Rng;
use std::time::Duration;

/// Defines how many times and after what delay failed attempts are retried.
///
/// # Examples
///
/// ```
/// use fetchwell::RetryStrategy;
/// use std::time::Duration;
///
/// // Linear backoff: 100ms, 200ms, 300ms
/// let linear = RetryStrategy::Linear {
///     delay: Duration::from_millis(100),
///     max_retries: 3,
/// };
/// assert_eq!(linear.delay_for_attempt(2), Some(Duration::from_millis(200)));
///
/// // Exponential backoff: 100ms, 200ms, 400ms, 800ms...
/// let exponential = RetryStrategy::ExponentialBackoff {
///     initial_delay: Duration::from_millis(100),
///     max_delay: Duration::from_secs(30),
///     max_retries: 5,
///     jitter: true,
/// };
/// ```
#[derive(Debug, Clone)]
pub enum RetryStrategy {
    /// Do not retry failed requests.
    None,

    /// Retry with linearly increasing delays.
    ///
    /// Retry `n` (1-indexed) waits `delay * n`.
    Linear {
        /// The base delay.
        delay: Duration,
        /// The maximum number of retry attempts.
        max_retries: usize,
    },

    /// Retry with exponentially increasing delays.
    ///
    /// Each retry waits for `initial_delay * 2^(attempt - 1)` (capped at `max_delay`).
    /// Optional jitter scales the delay by a random factor in `0.5..=1.0`.
    ExponentialBackoff {
        /// The initial delay before the first retry.
        initial_delay: Duration,
        /// The maximum delay between retries.
        max_delay: Duration,
        /// The maximum number of retry attempts.
        max_retries: usize,
        /// Whether to add random jitter to delays.
        jitter: bool,
    },

    /// Custom retry logic.
    ///
    /// The function takes the retry number (starting from 1) and returns
    /// `Some(delay)` to retry after the delay, or `None` to stop.
    Custom {
        /// Function that determines retry delay.
        delay_fn: fn(attempt: usize) -> Option<Duration>,
    },
}

impl Default for RetryStrategy {
    /// No retries, with a one second base delay once retries are enabled.
    fn default() -> Self {
        RetryStrategy::Linear {
            delay: Duration::from_millis(1000),
            max_retries: 0,
        }
    }
}

impl RetryStrategy {
    /// Returns the delay before the given retry, or `None` if retries are exhausted.
    ///
    /// # Arguments
    ///
    /// * `attempt` - The retry number (1-indexed, so 1 = first retry)
    pub fn delay_for_attempt(&self, attempt: usize) -> Option<Duration> {
        match self {
            RetryStrategy::None => None,
            RetryStrategy::Linear { delay, max_retries } => {
                if attempt == 0 || attempt > *max_retries {
                    return None;
                }
                let factor = u32::try_from(attempt).unwrap_or(u32::MAX);
                Some(delay.saturating_mul(factor))
            }
            RetryStrategy::ExponentialBackoff {
                initial_delay,
                max_delay,
                max_retries,
                jitter,
            } => {
                if attempt == 0 || attempt > *max_retries {
                    return None;
                }

                let multiplier = 2u64.saturating_pow(attempt.saturating_sub(1) as u32);
                let base_delay =
                    initial_delay.saturating_mul(multiplier.try_into().unwrap_or(u32::MAX));
                let delay = base_delay.min(*max_delay);

                if *jitter {
                    let jitter_factor = rand::thread_rng().gen_range(0.5..=1.0);
                    Some(delay.mul_f64(jitter_factor))
                } else {
                    Some(delay)
                }
            }
            RetryStrategy::Custom { delay_fn } => delay_fn(attempt),
        }
    }

    /// Returns the maximum number of retries, if known.
    pub fn max_retries(&self) -> Option<usize> {
        match self {
            RetryStrategy::None => Some(0),
            RetryStrategy::Linear { max_retries, .. } => Some(*max_retries),
            RetryStrategy::ExponentialBackoff { max_retries, .. } => Some(*max_retries),
            RetryStrategy::Custom { .. } => None,
        }
    }
}

/// Trait for determining whether a failed attempt should be retried.
///
/// # Examples
///
/// ```
/// use fetchwell::{Error, RetryPredicate};
///
/// struct RetryOnConflict;
///
/// impl RetryPredicate for RetryOnConflict {
///     fn should_retry(&self, error: &Error, _attempt: usize) -> bool {
///         matches!(error.status(), Some(status) if status.as_u16() == 409)
///     }
/// }
/// ```
pub trait RetryPredicate: Send + Sync {
    /// Determines whether the request should be retried after `error`.
    ///
    /// `attempt` is the number of attempts made so far (1-indexed).
    fn should_retry(&self, error: &Error, attempt: usize) -> bool;
}

/// Retry every failure. This is the client's default.
#[derive(Debug, Clone, Copy)]
pub struct RetryOnFailure;

impl RetryPredicate for RetryOnFailure {
    fn should_retry(&self, error: &Error, _attempt: usize) -> bool {
        !matches!(error, Error::Cancelled)
    }
}

/// Retry only errors for which [`Error::is_transient`] holds.
#[derive(Debug, Clone, Copy)]
pub struct RetryOnTransient;

impl RetryPredicate for RetryOnTransient {
    fn should_retry(&self, error: &Error, _attempt: usize) -> bool {
        error.is_transient()
    }
}

/// Retry only on 5xx server errors.
#[derive(Debug, Clone, Copy)]
pub struct RetryOn5xx;

impl RetryPredicate for RetryOn5xx {
    fn should_retry(&self, error: &Error, _attempt: usize) -> bool {
        matches!(error, Error::HttpError { status, .. } if status.is_server_error())
    }
}

/// Retry only on timeout errors.
#[derive(Debug, Clone, Copy)]
pub struct RetryOnTimeout;

impl RetryPredicate for RetryOnTimeout {
    fn should_retry(&self, error: &Error, _attempt: usize) -> bool {
        matches!(error, Error::Timeout { .. })
    }
}

/// Retry only on network/connection errors.
#[derive(Debug, Clone, Copy)]
pub struct RetryOnConnectionError;

impl RetryPredicate for RetryOnConnectionError {
    fn should_retry(&self, error: &Error, _attempt: usize) -> bool {
        matches!(error, Error::Network(_))
    }
}

/// Combine multiple retry predicates with OR logic.
///
/// # Examples
///
/// ```
/// use fetchwell::retry::{OrPredicate, RetryOn5xx, RetryOnTimeout};
///
/// let predicate = OrPredicate::new(vec![
///     Box::new(RetryOn5xx),
///     Box::new(RetryOnTimeout),
/// ]);
/// ```
pub struct OrPredicate {
    predicates: Vec<Box<dyn RetryPredicate>>,
}

impl OrPredicate {
    /// Creates a new `OrPredicate` from a list of predicates.
    pub fn new(predicates: Vec<Box<dyn RetryPredicate>>) -> Self {
        Self { predicates }
    }
}

impl RetryPredicate for OrPredicate {
    fn should_retry(&self, error: &Error, attempt: usize) -> bool {
        self.predicates
            .iter()
            .any(|p| p.should_retry(error, attempt))
    }
}

/// Combine multiple retry predicates with AND logic.
pub struct AndPredicate {
    predicates: Vec<Box<dyn RetryPredicate>>,
}

impl AndPredicate {
    /// Creates a new `AndPredicate` from a list of predicates.
    pub fn new(predicates: Vec<Box<dyn RetryPredicate>>) -> Self {
        Self { predicates }
    }
}

impl RetryPredicate for AndPredicate {
    fn should_retry(&self, error: &Error, attempt: usize) -> bool {
        self.predicates
            .iter()
            .all(|p| p.should_retry(error, attempt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    fn http_error(status: StatusCode) -> Error {
        Error::HttpError {
            status,
            data: None,
            headers: Box::default(),
            retry_after: None,
        }
    }

    #[test]
    fn test_linear_delays_grow_with_attempt() {
        let strategy = RetryStrategy::Linear {
            delay: Duration::from_millis(100),
            max_retries: 3,
        };

        assert_eq!(strategy.delay_for_attempt(1), Some(Duration::from_millis(100)));
        assert_eq!(strategy.delay_for_attempt(2), Some(Duration::from_millis(200)));
        assert_eq!(strategy.delay_for_attempt(3), Some(Duration::from_millis(300)));
        assert_eq!(strategy.delay_for_attempt(4), None);
    }

    #[test]
    fn test_default_strategy_never_retries() {
        let strategy = RetryStrategy::default();
        assert_eq!(strategy.max_retries(), Some(0));
        assert_eq!(strategy.delay_for_attempt(1), None);
    }

    #[test]
    fn test_exponential_backoff_delays() {
        let strategy = RetryStrategy::ExponentialBackoff {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(500),
            max_retries: 4,
            jitter: false,
        };

        assert_eq!(strategy.delay_for_attempt(1), Some(Duration::from_millis(100)));
        assert_eq!(strategy.delay_for_attempt(2), Some(Duration::from_millis(200)));
        assert_eq!(strategy.delay_for_attempt(3), Some(Duration::from_millis(400)));
        assert_eq!(strategy.delay_for_attempt(4), Some(Duration::from_millis(500)));
        assert_eq!(strategy.delay_for_attempt(5), None);
    }

    #[test]
    fn test_exponential_jitter_stays_in_range() {
        let strategy = RetryStrategy::ExponentialBackoff {
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(1),
            max_retries: 1,
            jitter: true,
        };

        for _ in 0..20 {
            let delay = strategy.delay_for_attempt(1).unwrap();
            assert!(delay >= Duration::from_millis(100) && delay <= Duration::from_millis(200));
        }
    }

    #[test]
    fn test_default_predicate_skips_cancellation_only() {
        assert!(!RetryOnFailure.should_retry(&Error::Cancelled, 1));
        assert!(RetryOnFailure.should_retry(&http_error(StatusCode::BAD_REQUEST), 1));
        assert!(RetryOnFailure.should_retry(&Error::Unknown("boom".into()), 1));
    }

    #[test]
    fn test_combined_predicates() {
        let either = OrPredicate::new(vec![Box::new(RetryOn5xx), Box::new(RetryOnTimeout)]);
        assert!(either.should_retry(&http_error(StatusCode::BAD_GATEWAY), 1));
        assert!(either.should_retry(
            &Error::Timeout {
                after: Duration::from_millis(1)
            },
            1
        ));
        assert!(!either.should_retry(&Error::Network("down".into()), 1));

        let both = AndPredicate::new(vec![Box::new(RetryOnTransient), Box::new(RetryOn5xx)]);
        assert!(both.should_retry(&http_error(StatusCode::SERVICE_UNAVAILABLE), 1));
        assert!(!both.should_retry(&http_error(StatusCode::TOO_MANY_REQUESTS), 1));
    }
}
