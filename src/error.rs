//! Error types for request execution.
//!
//! Every failure a [`Client`](crate::Client) call can run into is captured as an
//! [`Error`] and delivered inside the result [`Envelope`](crate::Envelope), never
//! returned as `Err` from a verb method. [`Error::kind`] collapses the variants
//! into the five categories callers branch on.

use crate::envelope::Body;
use http::{HeaderMap, StatusCode};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::fmt;
use std::time::Duration;

/// The main error type for requests issued through a [`Client`](crate::Client).
///
/// Errors are `Clone` because a deduplicated call hands the same outcome to
/// every caller that joined it.
///
/// # Examples
///
/// ```no_run
/// use fetchwell::{Client, Error, ErrorKind};
///
/// # async fn example() -> Result<(), Error> {
/// let client = Client::builder()
///     .base_url("https://api.example.com")?
///     .build()?;
///
/// let result = client.get("/items").await;
/// match result.error {
///     None => println!("Items: {:?}", result.data),
///     Some(Error::HttpError { status, data, .. }) => {
///         eprintln!("HTTP error {}: {:?}", status, data);
///     }
///     Some(e) if e.kind() == ErrorKind::Cancelled => eprintln!("Cancelled"),
///     Some(e) => eprintln!("Other error: {}", e),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug, Clone)]
pub enum Error {
    /// The call was aborted through [`Client::cancel`](crate::Client::cancel),
    /// a related cancellation method, or the caller's own signal.
    #[error("Request cancelled")]
    Cancelled,

    /// The attempt did not settle within the configured timeout.
    #[error("Request timed out after {after:?}")]
    Timeout {
        /// The timeout that elapsed
        after: Duration,
    },

    /// The server answered with a non-2xx status code.
    ///
    /// # Fields
    ///
    /// * `status` - The HTTP status code
    /// * `data` - The parsed response body, if there was one
    /// * `headers` - The response headers
    /// * `retry_after` - The wait requested by a `Retry-After` header, if any
    #[error("HTTP error {status}")]
    HttpError {
        /// The HTTP status code
        status: StatusCode,
        /// The parsed response body
        data: Option<Body>,
        /// The response headers
        headers: Box<HeaderMap>,
        /// Delay requested by the server through `Retry-After`
        retry_after: Option<Duration>,
    },

    /// The transport failed before any HTTP response was produced.
    #[error("Network error: {0}")]
    Network(String),

    /// The response claimed to be JSON but could not be parsed.
    #[error("Failed to deserialize response (status {status}): {serde_error}")]
    DeserializationFailed {
        /// The raw response body that failed to parse
        raw_response: String,
        /// The serde error message
        serde_error: String,
        /// The HTTP status code
        status: StatusCode,
    },

    /// The request body could not be serialized to JSON.
    #[error("Failed to serialize request: {0}")]
    SerializationFailed(String),

    /// The request was rejected before reaching the transport (empty path,
    /// invalid header, and so on).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The resolved URL could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Invalid client configuration.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Any other failure, including a panicked execution task.
    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// The category of an [`Error`], as exposed in the result envelope.
///
/// Serializes as `CANCELLED`, `TIMEOUT`, `HTTP_ERROR`, `NETWORK_ERROR` or
/// `UNKNOWN_ERROR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Aborted before settling.
    Cancelled,
    /// The timeout elapsed first.
    Timeout,
    /// Non-success HTTP status.
    HttpError,
    /// No HTTP response was produced.
    NetworkError,
    /// Anything else.
    UnknownError,
}

impl ErrorKind {
    /// Returns the wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Cancelled => "CANCELLED",
            ErrorKind::Timeout => "TIMEOUT",
            ErrorKind::HttpError => "HTTP_ERROR",
            ErrorKind::NetworkError => "NETWORK_ERROR",
            ErrorKind::UnknownError => "UNKNOWN_ERROR",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    /// Returns the envelope category of this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use fetchwell::{Error, ErrorKind};
    ///
    /// assert_eq!(Error::Cancelled.kind(), ErrorKind::Cancelled);
    /// assert_eq!(
    ///     Error::SerializationFailed("bad".into()).kind(),
    ///     ErrorKind::UnknownError
    /// );
    /// ```
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Cancelled => ErrorKind::Cancelled,
            Error::Timeout { .. } => ErrorKind::Timeout,
            Error::HttpError { .. } => ErrorKind::HttpError,
            Error::Network(_) => ErrorKind::NetworkError,
            Error::DeserializationFailed { .. }
            | Error::SerializationFailed(_)
            | Error::InvalidRequest(_)
            | Error::InvalidUrl(_)
            | Error::ConfigurationError(_)
            | Error::Unknown(_) => ErrorKind::UnknownError,
        }
    }

    /// Returns `true` if the failure is likely to go away on its own.
    ///
    /// Network errors, timeouts, 5xx responses and 429 are transient. Used by
    /// [`RetryOnTransient`](crate::retry::RetryOnTransient); the default
    /// predicate retries every failure except cancellation.
    ///
    /// # Examples
    ///
    /// ```
    /// use fetchwell::Error;
    /// use http::StatusCode;
    ///
    /// let err = Error::HttpError {
    ///     status: StatusCode::SERVICE_UNAVAILABLE,
    ///     data: None,
    ///     headers: Box::default(),
    ///     retry_after: None,
    /// };
    /// assert!(err.is_transient());
    ///
    /// let err = Error::HttpError {
    ///     status: StatusCode::NOT_FOUND,
    ///     data: None,
    ///     headers: Box::default(),
    ///     retry_after: None,
    /// };
    /// assert!(!err.is_transient());
    /// ```
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Network(_) | Error::Timeout { .. } => true,
            Error::HttpError { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }

    /// Returns the HTTP status code if this error has one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::HttpError { status, .. } => Some(*status),
            Error::DeserializationFailed { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the parsed error body of an `HttpError`.
    pub fn data(&self) -> Option<&Body> {
        match self {
            Error::HttpError { data, .. } => data.as_ref(),
            _ => None,
        }
    }

    /// Returns the delay requested by the server, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Error::HttpError { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

impl Serialize for Error {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("Error", 4)?;
        state.serialize_field("type", &self.kind())?;
        state.serialize_field("message", &self.to_string())?;
        state.serialize_field("status", &self.status().map(|s| s.as_u16()))?;
        state.serialize_field("data", &self.data())?;
        state.end()
    }
}

/// A specialized `Result` type for fallible configuration steps.
pub type Result<T> = std::result::Result<T, Error>;
