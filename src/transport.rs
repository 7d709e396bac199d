//! The transport seam between the client and the network.
//!
//! [`Client`](crate::Client) never talks to the network directly. Each attempt
//! is handed to a [`Transport`] as an [`HttpRequest`]; the default
//! [`ReqwestTransport`] sends it with `reqwest`. Dropping the future returned by
//! [`Transport::send`] must abort the request, which is how timeouts and
//! cancellation stop losing attempts.

use futures::future::BoxFuture;
use futures::FutureExt as _;
use http::{HeaderMap, Method, StatusCode};
use std::collections::BTreeMap;
use url::Url;

/// A single attempt, as seen by the transport.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// The HTTP method.
    pub method: Method,
    /// The fully resolved URL, query included.
    pub url: Url,
    /// Default headers merged with per-call headers.
    pub headers: HeaderMap,
    /// The serialized body.
    pub body: Option<String>,
    /// Extension fields from [`RequestOptions`](crate::metadata::RequestOptions).
    pub extensions: BTreeMap<String, serde_json::Value>,
}

/// A raw response produced by the transport.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The response headers.
    pub headers: HeaderMap,
    /// The response body as text.
    pub body: String,
}

impl HttpResponse {
    /// Returns the `content-type` header, if present and valid.
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(http::header::CONTENT_TYPE)?
            .to_str()
            .ok()
    }
}

/// Failures raised by a transport before a response is available.
#[derive(thiserror::Error, Debug, Clone)]
pub enum TransportError {
    /// The connection could not be established or was lost.
    #[error("connection failed: {0}")]
    Connect(String),

    /// The transport gave up waiting on its own.
    #[error("transport timed out")]
    TimedOut,

    /// Any other transport failure.
    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::TimedOut
        } else if e.is_connect() || e.is_request() {
            TransportError::Connect(e.to_string())
        } else {
            TransportError::Other(e.to_string())
        }
    }
}

/// Sends requests on behalf of a [`Client`](crate::Client).
///
/// # Examples
///
/// ```
/// use fetchwell::transport::{HttpRequest, HttpResponse, Transport, TransportError};
/// use futures::future::BoxFuture;
/// use futures::FutureExt;
/// use http::{HeaderMap, StatusCode};
///
/// struct AlwaysEmpty;
///
/// impl Transport for AlwaysEmpty {
///     fn send(&self, _request: HttpRequest) -> BoxFuture<'static, Result<HttpResponse, TransportError>> {
///         async {
///             Ok(HttpResponse {
///                 status: StatusCode::NO_CONTENT,
///                 headers: HeaderMap::new(),
///                 body: String::new(),
///             })
///         }
///         .boxed()
///     }
/// }
/// ```
pub trait Transport: Send + Sync + 'static {
    /// Sends one attempt.
    fn send(&self, request: HttpRequest) -> BoxFuture<'static, Result<HttpResponse, TransportError>>;
}

/// The default transport, backed by a pooled `reqwest::Client`.
///
/// Extension fields are ignored.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    http_client: reqwest::Client,
}

impl ReqwestTransport {
    /// Creates a transport with a default `reqwest` client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing `reqwest` client.
    pub fn with_client(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: HttpRequest) -> BoxFuture<'static, Result<HttpResponse, TransportError>> {
        let mut builder = self
            .http_client
            .request(request.method, request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        async move {
            let response = builder.send().await?;
            let status = response.status();
            let headers = response.headers().clone();
            let body = response.text().await?;

            Ok::<_, TransportError>(HttpResponse {
                status,
                headers,
                body,
            })
        }
        .boxed()
    }
}
