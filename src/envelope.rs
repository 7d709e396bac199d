//! The uniform result shape returned by every request.
//!
//! An [`Envelope`] carries either parsed response data or an [`Error`], plus
//! metadata about how the result was produced: status, headers, latency,
//! attempt count and whether it came from the cache.

use crate::Error;
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// A parsed response body.
///
/// Bodies whose content type indicates JSON are parsed into a
/// [`serde_json::Value`]; everything else is kept as text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Body {
    /// A JSON document.
    Json(serde_json::Value),
    /// A non-JSON body.
    Text(String),
}

impl Body {
    /// Parses a raw body according to its content type.
    ///
    /// An empty JSON body becomes `Json(Null)`.
    ///
    /// # Examples
    ///
    /// ```
    /// use fetchwell::Body;
    /// use serde_json::json;
    ///
    /// let body = Body::parse(Some("application/json; charset=utf-8"), r#"{"id":1}"#.into()).unwrap();
    /// assert_eq!(body, Body::Json(json!({"id": 1})));
    ///
    /// let body = Body::parse(Some("text/plain"), "hello".into()).unwrap();
    /// assert_eq!(body.as_text(), Some("hello"));
    /// ```
    pub fn parse(content_type: Option<&str>, raw: String) -> Result<Self, serde_json::Error> {
        if !content_type.is_some_and(is_json_content_type) {
            return Ok(Body::Text(raw));
        }
        if raw.trim().is_empty() {
            return Ok(Body::Json(serde_json::Value::Null));
        }
        serde_json::from_str(&raw).map(Body::Json)
    }

    /// Returns the JSON value, if this is a JSON body.
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Body::Json(value) => Some(value),
            Body::Text(_) => None,
        }
    }

    /// Returns the text, if this is a text body.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Body::Json(_) => None,
            Body::Text(text) => Some(text),
        }
    }

    /// Deserializes the body into `T`.
    ///
    /// Text bodies are treated as a JSON string value.
    pub fn deserialize<T>(&self) -> Result<T, serde_json::Error>
    where
        T: DeserializeOwned,
    {
        match self {
            Body::Json(value) => T::deserialize(value),
            Body::Text(text) => T::deserialize(serde_json::Value::String(text.clone())),
        }
    }
}

fn is_json_content_type(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime == "application/json" || mime.ends_with("+json")
}

/// The result of a request.
///
/// `ok` is `true` only when `data` holds a successful response; otherwise
/// `error` explains what went wrong.
///
/// # Examples
///
/// ```no_run
/// use fetchwell::Client;
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Item {
///     id: u64,
///     name: String,
/// }
///
/// # async fn example() -> Result<(), fetchwell::Error> {
/// let client = Client::builder()
///     .base_url("https://api.example.com")?
///     .cache(true)
///     .build()?;
///
/// let result = client.get("/items/1").await;
/// if result.ok {
///     let item: Item = result.json()?;
///     println!("{} took {:?}", item.name, result.latency);
/// } else if let Some(error) = &result.error {
///     eprintln!("{}: {}", error.kind(), error);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    /// The parsed body on success, `None` on failure.
    pub data: Option<Body>,

    /// `true` for a settled successful response or a successful cache hit.
    pub ok: bool,

    /// The HTTP status code, or `0` when no response was received.
    pub status: u16,

    /// The failure, present only when `ok` is `false`.
    pub error: Option<Error>,

    /// The response headers. Empty for cache hits and transport failures.
    #[serde(skip)]
    pub headers: HeaderMap,

    /// The number of transport attempts made; `0` for cache hits.
    pub attempts: usize,

    /// Total time spent on the logical call, retries included.
    #[serde(skip)]
    pub latency: Duration,

    /// Whether the result was served from the cache store.
    pub from_cache: bool,
}

impl Envelope {
    pub(crate) fn success(
        data: Body,
        status: StatusCode,
        headers: HeaderMap,
        latency: Duration,
        attempts: usize,
    ) -> Self {
        Self {
            data: Some(data),
            ok: true,
            status: status.as_u16(),
            error: None,
            headers,
            attempts,
            latency,
            from_cache: false,
        }
    }

    pub(crate) fn cached(data: Body) -> Self {
        Self {
            data: Some(data),
            ok: true,
            status: StatusCode::OK.as_u16(),
            error: None,
            headers: HeaderMap::new(),
            attempts: 0,
            latency: Duration::ZERO,
            from_cache: true,
        }
    }

    pub(crate) fn failure(error: Error, latency: Duration, attempts: usize) -> Self {
        let (status, headers) = match &error {
            Error::HttpError {
                status, headers, ..
            } => (status.as_u16(), headers.as_ref().clone()),
            Error::DeserializationFailed { status, .. } => (status.as_u16(), HeaderMap::new()),
            _ => (0, HeaderMap::new()),
        };

        Self {
            data: None,
            ok: false,
            status,
            error: Some(error),
            headers,
            attempts,
            latency,
            from_cache: false,
        }
    }

    /// Deserializes the response data into `T`.
    ///
    /// # Errors
    ///
    /// Returns the envelope's own error when the request failed, or
    /// `Error::DeserializationFailed` when the data does not match `T`.
    pub fn json<T>(&self) -> crate::Result<T>
    where
        T: DeserializeOwned,
    {
        if let Some(error) = &self.error {
            return Err(error.clone());
        }
        let data = self
            .data
            .as_ref()
            .ok_or_else(|| Error::Unknown("response has no data".to_string()))?;

        data.deserialize().map_err(|e| Error::DeserializationFailed {
            raw_response: match data {
                Body::Json(value) => value.to_string(),
                Body::Text(text) => text.clone(),
            },
            serde_error: e.to_string(),
            status: StatusCode::from_u16(self.status).unwrap_or(StatusCode::OK),
        })
    }

    /// Returns the error kind, if the request failed.
    pub fn error_kind(&self) -> Option<crate::ErrorKind> {
        self.error.as_ref().map(Error::kind)
    }

    /// Returns `true` if the request required retries.
    pub fn was_retried(&self) -> bool {
        self.attempts > 1
    }

    /// Returns a reference to a header value by name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }
}

/// A snapshot of the client's last-response state.
///
/// Successful settles store their data and clear the error; failed settles
/// store the error. [`Client::reset`](crate::Client::reset) restores the
/// default.
#[derive(Debug, Clone, Default)]
pub struct ClientState {
    /// Data of the last successful response.
    pub data: Option<Body>,
    /// Error of the last failed call, cleared by the next success.
    pub error: Option<Error>,
    /// Whether any call is still pending.
    pub loading: bool,
}
