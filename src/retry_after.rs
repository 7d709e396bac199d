//! Support for server-requested retry delays.
//!
//! When enabled, an HTTP error that carries a `Retry-After` header (delay
//! seconds or an HTTP date) replaces the strategy delay for the next retry.

use http::HeaderMap;
use std::time::{Duration, SystemTime};

/// Configuration for `Retry-After` handling.
///
/// Disabled by default, so the configured [`RetryStrategy`](crate::RetryStrategy)
/// alone decides the backoff.
///
/// # Examples
///
/// ```
/// use fetchwell::retry_after::RetryAfterConfig;
/// use std::time::Duration;
///
/// let config = RetryAfterConfig::enabled(Duration::from_secs(30));
/// assert!(config.enabled);
/// ```
#[derive(Debug, Clone)]
pub struct RetryAfterConfig {
    /// Whether `Retry-After` overrides the strategy delay.
    pub enabled: bool,

    /// Upper bound on any server-requested wait.
    pub max_wait: Duration,
}

impl Default for RetryAfterConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_wait: Duration::from_secs(60),
        }
    }
}

impl RetryAfterConfig {
    /// Enables `Retry-After` handling with the given cap.
    pub fn enabled(max_wait: Duration) -> Self {
        Self {
            enabled: true,
            max_wait,
        }
    }

    /// Returns the delay to use for a server-requested wait, if handling is on.
    pub(crate) fn delay(&self, requested: Option<Duration>) -> Option<Duration> {
        if !self.enabled {
            return None;
        }
        requested.map(|d| d.min(self.max_wait))
    }
}

/// Parses the `Retry-After` header.
///
/// Supports both delay-seconds and HTTP-date forms. Dates in the past yield
/// `None`.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let header = headers.get(http::header::RETRY_AFTER)?.to_str().ok()?.trim();

    if let Ok(seconds) = header.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    let date_time = httpdate::parse_http_date(header).ok()?;
    date_time.duration_since(SystemTime::now()).ok()
}
