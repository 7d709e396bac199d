//! Per-request options and request signatures.

use crate::{CancellationToken, Error, Result};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Options for an individual request.
///
/// Every field is optional; the method defaults to `GET`.
///
/// # Examples
///
/// ```
/// use fetchwell::metadata::RequestOptions;
/// use http::Method;
///
/// # fn example() -> Result<(), fetchwell::Error> {
/// let options = RequestOptions::new()
///     .method(Method::GET)
///     .with_header("Prefer", "count=exact")?
///     .with_query_param("select", "*");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// The HTTP method. `None` means `GET`.
    pub method: Option<Method>,

    /// Headers for this request; they replace default headers of the same name.
    pub headers: HeaderMap,

    /// The request body.
    pub body: Option<RequestBody>,

    /// Query parameters appended to the URL.
    pub query_params: BTreeMap<String, String>,

    /// A caller-owned cancellation token observed alongside the client's own.
    pub signal: Option<CancellationToken>,

    /// Transport-specific fields, forwarded untouched to the
    /// [`Transport`](crate::transport::Transport).
    pub extensions: BTreeMap<String, serde_json::Value>,
}

impl RequestOptions {
    /// Creates empty options (a plain `GET`).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the HTTP method.
    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Adds a header to the request.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let (name, value) = parse_header(name.as_ref(), value.as_ref())?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Sets the request body.
    pub fn body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Adds a query parameter to the request.
    pub fn with_query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.insert(key.into(), value.into());
        self
    }

    /// Attaches a caller-owned cancellation token.
    pub fn signal(mut self, token: CancellationToken) -> Self {
        self.signal = Some(token);
        self
    }

    /// Adds a transport-specific extension field.
    pub fn extension(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extensions.insert(key.into(), value);
        self
    }

    pub(crate) fn effective_method(&self) -> Method {
        self.method.clone().unwrap_or(Method::GET)
    }
}

pub(crate) fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue)> {
    let name = HeaderName::try_from(name)
        .map_err(|e| Error::InvalidRequest(format!("Invalid header name: {}", e)))?;
    let value = HeaderValue::try_from(value)
        .map_err(|e| Error::InvalidRequest(format!("Invalid header value: {}", e)))?;
    Ok((name, value))
}

/// A request body.
///
/// `Json` bodies are serialized and sent with `Content-Type: application/json`
/// unless the request already sets a content type. `Text` bodies are sent
/// verbatim, for callers that serialized the payload themselves.
///
/// # Examples
///
/// ```
/// use fetchwell::RequestBody;
/// use serde_json::json;
///
/// let body: RequestBody = json!({"name": "x"}).into();
/// assert!(matches!(body, RequestBody::Json(_)));
///
/// let body: RequestBody = "name=x".into();
/// assert!(matches!(body, RequestBody::Text(_)));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RequestBody {
    /// A JSON document to serialize.
    Json(serde_json::Value),
    /// A pre-serialized payload.
    Text(String),
}

impl RequestBody {
    /// Builds a JSON body from any serializable value.
    ///
    /// # Errors
    ///
    /// Returns `Error::SerializationFailed` if `value` cannot be represented
    /// as JSON.
    pub fn json<T>(value: &T) -> Result<Self>
    where
        T: Serialize + ?Sized,
    {
        serde_json::to_value(value)
            .map(RequestBody::Json)
            .map_err(|e| Error::SerializationFailed(e.to_string()))
    }

    pub(crate) fn is_json(&self) -> bool {
        matches!(self, RequestBody::Json(_))
    }

    pub(crate) fn to_wire(&self) -> Result<String> {
        match self {
            RequestBody::Json(value) => serde_json::to_string(value)
                .map_err(|e| Error::SerializationFailed(e.to_string())),
            RequestBody::Text(text) => Ok(text.clone()),
        }
    }
}

impl From<serde_json::Value> for RequestBody {
    fn from(value: serde_json::Value) -> Self {
        RequestBody::Json(value)
    }
}

impl From<String> for RequestBody {
    fn from(text: String) -> Self {
        RequestBody::Text(text)
    }
}

impl From<&str> for RequestBody {
    fn from(text: &str) -> Self {
        RequestBody::Text(text.to_string())
    }
}

/// The cache and deduplication key of a request.
///
/// Built from the full URL followed by the serialized effective options
/// (method, merged headers, query, wire body, extensions). Maps are ordered, so
/// structurally identical requests always produce the same signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Signature(Arc<str>);

impl Signature {
    /// Returns the signature as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Serialize)]
struct SignatureParts<'a> {
    method: &'a str,
    headers: BTreeMap<String, String>,
    query: &'a BTreeMap<String, String>,
    body: Option<&'a str>,
    extensions: &'a BTreeMap<String, serde_json::Value>,
}

/// A request with defaults applied, ready for the transport.
#[derive(Debug, Clone)]
pub(crate) struct PreparedRequest {
    pub(crate) method: Method,
    pub(crate) url: url::Url,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Option<String>,
    pub(crate) extensions: BTreeMap<String, serde_json::Value>,
    pub(crate) signature: Signature,
}

impl PreparedRequest {
    /// Resolves `path` against `base_url`, merges headers and serializes the body.
    pub(crate) fn new(
        base_url: &str,
        default_headers: &HeaderMap,
        path: &str,
        options: &RequestOptions,
    ) -> Result<Self> {
        if path.is_empty() {
            return Err(Error::InvalidRequest("path must not be empty".to_string()));
        }

        let full_url = format!("{}{}", base_url, path);
        let mut url = url::Url::parse(&full_url)?;
        if !options.query_params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &options.query_params {
                pairs.append_pair(key, value);
            }
        }

        let mut headers = default_headers.clone();
        for (name, value) in &options.headers {
            headers.insert(name.clone(), value.clone());
        }
        if options.body.as_ref().is_some_and(RequestBody::is_json)
            && !headers.contains_key(http::header::CONTENT_TYPE)
        {
            headers.insert(
                http::header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
        }

        let method = options.effective_method();
        let body = options.body.as_ref().map(RequestBody::to_wire).transpose()?;
        let signature = signature_for(&full_url, &method, &headers, body.as_deref(), options)?;

        Ok(Self {
            method,
            url,
            headers,
            body,
            extensions: options.extensions.clone(),
            signature,
        })
    }
}

fn signature_for(
    full_url: &str,
    method: &Method,
    headers: &HeaderMap,
    body: Option<&str>,
    options: &RequestOptions,
) -> Result<Signature> {
    let mut merged = BTreeMap::new();
    for (name, value) in headers {
        merged
            .entry(name.as_str().to_string())
            .and_modify(|existing: &mut String| {
                existing.push_str(", ");
                existing.push_str(&String::from_utf8_lossy(value.as_bytes()));
            })
            .or_insert_with(|| String::from_utf8_lossy(value.as_bytes()).into_owned());
    }

    let parts = SignatureParts {
        method: method.as_str(),
        headers: merged,
        query: &options.query_params,
        body,
        extensions: &options.extensions,
    };
    let serialized =
        serde_json::to_string(&parts).map_err(|e| Error::SerializationFailed(e.to_string()))?;

    Ok(Signature(format!("{}{}", full_url, serialized).into()))
}
