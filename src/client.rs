//! Request execution: deduplication, caching, timeouts, retries and cancellation.
//!
//! The [`Client`] type is the main entry point for making HTTP requests.
//! Use [`ClientBuilder`] to configure and create clients.

use crate::{
    cancel::{either_cancelled, CancellationToken},
    config::{ClientBuilder, ClientConfig},
    envelope::{Body, ClientState, Envelope},
    metadata::{PreparedRequest, RequestBody, RequestOptions, Signature},
    retry::RetryPredicate,
    retry_after::parse_retry_after,
    transport::{HttpRequest, HttpResponse, Transport, TransportError},
    Error, Result,
};
use futures::future::{BoxFuture, Shared};
use futures::FutureExt as _;
use http::{HeaderMap, Method, StatusCode};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

type SharedCall = Shared<BoxFuture<'static, Envelope>>;

/// An HTTP client that deduplicates, caches and retries requests.
///
/// Every verb method resolves to an [`Envelope`]; failures are reported in
/// `envelope.error`, never as a panic or an `Err`. The client is cheap to
/// clone and clones share their cache, in-flight registry and state.
/// Clients built separately never share anything.
///
/// # Examples
///
/// ```no_run
/// use fetchwell::Client;
/// use serde_json::json;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), fetchwell::Error> {
/// let client = Client::builder()
///     .base_url("https://api.example.com")?
///     .timeout(Duration::from_secs(5))
///     .retries(2)
///     .cache(true)
///     .deduplicate(true)
///     .build()?;
///
/// let items = client.get("/items").await;
/// println!("ok={} status={} data={:?}", items.ok, items.status, items.data);
///
/// let created = client.post("/items", json!({"name": "Lamp"})).await;
/// if let Some(error) = created.error {
///     eprintln!("{}: {}", error.kind(), error);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    transport: Arc<dyn Transport>,
    config: ClientConfig,
    retry_predicate: Box<dyn RetryPredicate>,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    cache: HashMap<Signature, Body>,
    in_flight: HashMap<Signature, InFlight>,
    pending: HashMap<u64, PendingCall>,
    latest: Option<u64>,
    next_call_id: u64,
    last: ClientState,
}

/// A deduplicated execution other callers can join.
struct InFlight {
    call_id: u64,
    shared: SharedCall,
}

struct PendingCall {
    signature: Signature,
    token: CancellationToken,
}

enum Dispatch {
    Cached(Envelope),
    Shared(SharedCall),
    Owned(BoxFuture<'static, Envelope>),
}

/// A successful attempt.
struct Settled {
    data: Body,
    status: StatusCode,
    headers: HeaderMap,
}

impl Client {
    /// Creates a new `ClientBuilder` for configuring a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Creates a client from a configuration, using the `reqwest` transport
    /// and the default retry predicate.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: ClientConfig) -> Result<Self> {
        ClientBuilder::from_config(config).build()
    }

    /// Creates a client from a configuration that sends through `transport`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn with_transport(config: ClientConfig, transport: impl Transport) -> Result<Self> {
        ClientBuilder::from_config(config).transport(transport).build()
    }

    pub(crate) fn from_parts(
        config: ClientConfig,
        retry_predicate: Box<dyn RetryPredicate>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                transport,
                config,
                retry_predicate,
                state: Mutex::new(State::default()),
            }),
        }
    }

    /// Returns the configuration this client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Makes a request with explicit options.
    ///
    /// Resolves `path` against the base URL, merges headers, then in order:
    /// joins an identical in-flight call when deduplication is on, answers a
    /// `GET` from the cache when caching is on, or executes the request with
    /// the configured timeout and retry policy.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use fetchwell::{metadata::RequestOptions, Client};
    /// use http::Method;
    ///
    /// # async fn example() -> Result<(), fetchwell::Error> {
    /// let client = Client::builder()
    ///     .base_url("https://api.example.com")?
    ///     .build()?;
    ///
    /// let options = RequestOptions::new()
    ///     .method(Method::GET)
    ///     .with_query_param("category", "lamps");
    /// let result = client.request("/products", options).await;
    /// println!("{:?}", result.data);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn request(&self, path: impl AsRef<str>, options: RequestOptions) -> Envelope {
        let path = path.as_ref();
        let config = &self.inner.config;

        let prepared =
            match PreparedRequest::new(&config.base_url, &config.default_headers, path, &options) {
                Ok(prepared) => prepared,
                Err(e) => {
                    tracing::error!(error = %e, path = %path, "Request rejected before sending");
                    self.inner.lock().last.error = Some(e.clone());
                    return Envelope::failure(e, Duration::ZERO, 0);
                }
            };

        match self.dispatch(prepared, options.signal.clone()) {
            Dispatch::Cached(envelope) => envelope,
            Dispatch::Shared(shared) => match options.signal {
                Some(signal) => {
                    let start_time = Instant::now();
                    tokio::select! {
                        biased;
                        _ = signal.cancelled() => {
                            tracing::debug!(path = %path, "Caller stopped waiting on shared request");
                            Envelope::failure(Error::Cancelled, start_time.elapsed(), 0)
                        }
                        envelope = shared => envelope,
                    }
                }
                None => shared.await,
            },
            Dispatch::Owned(call) => call.await,
        }
    }

    /// Performs the synchronous bookkeeping of a call: dedup lookup, cache
    /// lookup and, when neither hits, spawning the execution.
    fn dispatch(&self, prepared: PreparedRequest, signal: Option<CancellationToken>) -> Dispatch {
        let config = &self.inner.config;
        let signature = prepared.signature.clone();
        let mut state = self.inner.lock();

        if config.deduplication_enabled {
            if let Some(in_flight) = state.in_flight.get(&signature) {
                tracing::debug!(
                    method = %prepared.method,
                    url = %prepared.url,
                    "Joining in-flight request"
                );
                return Dispatch::Shared(in_flight.shared.clone());
            }
        }

        if config.cache_enabled && prepared.method == Method::GET {
            if let Some(data) = state.cache.get(&signature).cloned() {
                tracing::debug!(url = %prepared.url, "Serving response from cache");
                state.last.data = Some(data.clone());
                state.last.error = None;
                return Dispatch::Cached(Envelope::cached(data));
            }
        }

        let call_id = state.next_call_id;
        state.next_call_id += 1;
        let token = CancellationToken::new();
        state.pending.insert(
            call_id,
            PendingCall {
                signature: signature.clone(),
                token: token.clone(),
            },
        );
        state.latest = Some(call_id);

        // A shared execution outlives any single caller, so a caller's signal
        // only ends that caller's wait (see `request`).
        let signal = if config.deduplication_enabled {
            None
        } else {
            signal
        };

        // The execution runs on its own task so it settles, and releases its
        // registry entries, even if every awaiting caller goes away.
        let handle = tokio::spawn(
            self.inner
                .clone()
                .execute(call_id, prepared, token, signal),
        );
        let call = async move {
            handle.await.unwrap_or_else(|e| {
                Envelope::failure(
                    Error::Unknown(format!("request task failed: {}", e)),
                    Duration::ZERO,
                    0,
                )
            })
        }
        .boxed();

        if config.deduplication_enabled {
            let shared = call.shared();
            state.in_flight.insert(
                signature,
                InFlight {
                    call_id,
                    shared: shared.clone(),
                },
            );
            Dispatch::Shared(shared)
        } else {
            Dispatch::Owned(call)
        }
    }

    /// Makes a GET request to the specified path.
    pub async fn get(&self, path: impl AsRef<str>) -> Envelope {
        self.get_with(path, RequestOptions::new()).await
    }

    /// Makes a GET request with extra options.
    pub async fn get_with(&self, path: impl AsRef<str>, options: RequestOptions) -> Envelope {
        self.request(path, options.method(Method::GET)).await
    }

    /// Makes a POST request with the given body.
    ///
    /// JSON values are serialized and sent with `Content-Type: application/json`;
    /// strings are sent as-is.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use fetchwell::{Client, RequestBody};
    /// use serde::Serialize;
    ///
    /// #[derive(Serialize)]
    /// struct NewReview {
    ///     product_id: u64,
    ///     rating: u8,
    /// }
    ///
    /// # async fn example() -> Result<(), fetchwell::Error> {
    /// let client = Client::builder()
    ///     .base_url("https://api.example.com")?
    ///     .build()?;
    ///
    /// let review = NewReview { product_id: 4, rating: 5 };
    /// let result = client.post("/reviews", RequestBody::json(&review)?).await;
    /// println!("created: {}", result.ok);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn post(&self, path: impl AsRef<str>, body: impl Into<RequestBody>) -> Envelope {
        self.post_with(path, body, RequestOptions::new()).await
    }

    /// Makes a POST request with the given body and extra options.
    pub async fn post_with(
        &self,
        path: impl AsRef<str>,
        body: impl Into<RequestBody>,
        options: RequestOptions,
    ) -> Envelope {
        self.request(path, options.method(Method::POST).body(body))
            .await
    }

    /// Makes a PUT request with the given body.
    pub async fn put(&self, path: impl AsRef<str>, body: impl Into<RequestBody>) -> Envelope {
        self.put_with(path, body, RequestOptions::new()).await
    }

    /// Makes a PUT request with the given body and extra options.
    pub async fn put_with(
        &self,
        path: impl AsRef<str>,
        body: impl Into<RequestBody>,
        options: RequestOptions,
    ) -> Envelope {
        self.request(path, options.method(Method::PUT).body(body))
            .await
    }

    /// Makes a PATCH request with the given body.
    pub async fn patch(&self, path: impl AsRef<str>, body: impl Into<RequestBody>) -> Envelope {
        self.patch_with(path, body, RequestOptions::new()).await
    }

    /// Makes a PATCH request with the given body and extra options.
    pub async fn patch_with(
        &self,
        path: impl AsRef<str>,
        body: impl Into<RequestBody>,
        options: RequestOptions,
    ) -> Envelope {
        self.request(path, options.method(Method::PATCH).body(body))
            .await
    }

    /// Makes a DELETE request to the specified path.
    pub async fn delete(&self, path: impl AsRef<str>) -> Envelope {
        self.delete_with(path, RequestOptions::new()).await
    }

    /// Makes a DELETE request with extra options.
    pub async fn delete_with(&self, path: impl AsRef<str>, options: RequestOptions) -> Envelope {
        self.request(path, options.method(Method::DELETE)).await
    }

    /// Cancels the most recently started call, if it is still pending.
    ///
    /// Earlier calls keep running; use [`cancel_request`](Self::cancel_request)
    /// or [`cancel_all`](Self::cancel_all) to reach them.
    pub fn cancel(&self) {
        let state = self.inner.lock();
        let Some(call) = state.latest.and_then(|id| state.pending.get(&id)) else {
            return;
        };
        tracing::debug!(signature = %call.signature, "Cancelling latest request");
        call.token.cancel();
    }

    /// Cancels every pending call with the given signature.
    ///
    /// Returns `true` if at least one call was cancelled.
    pub fn cancel_request(&self, signature: &Signature) -> bool {
        let state = self.inner.lock();
        let mut cancelled = false;
        for call in state.pending.values().filter(|c| &c.signature == signature) {
            call.token.cancel();
            cancelled = true;
        }
        cancelled
    }

    /// Cancels every pending call. Returns how many were cancelled.
    pub fn cancel_all(&self) -> usize {
        let state = self.inner.lock();
        for call in state.pending.values() {
            call.token.cancel();
        }
        state.pending.len()
    }

    /// Empties the response cache. Pending calls are unaffected.
    pub fn clear_cache(&self) {
        self.inner.lock().cache.clear();
    }

    /// Cancels the latest call and clears the last-response state.
    ///
    /// The cache is kept.
    pub fn reset(&self) {
        self.cancel();
        self.inner.lock().last = ClientState::default();
    }

    /// Returns a snapshot of the last-response state.
    pub fn state(&self) -> ClientState {
        let state = self.inner.lock();
        ClientState {
            loading: !state.pending.is_empty(),
            ..state.last.clone()
        }
    }

    /// Returns the cached body for a signature.
    pub fn cached(&self, signature: &Signature) -> Option<Body> {
        self.inner.lock().cache.get(signature).cloned()
    }

    /// Returns the number of calls currently executing.
    pub fn in_flight_count(&self) -> usize {
        self.inner.lock().pending.len()
    }

    /// Computes the signature a request would be cached and deduplicated under.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is empty, the URL is invalid or the body
    /// cannot be serialized.
    pub fn signature(&self, path: impl AsRef<str>, options: &RequestOptions) -> Result<Signature> {
        let config = &self.inner.config;
        PreparedRequest::new(
            &config.base_url,
            &config.default_headers,
            path.as_ref(),
            options,
        )
        .map(|prepared| prepared.signature)
    }
}

impl ClientInner {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs one logical call to completion: attempts, backoff and settling.
    async fn execute(
        self: Arc<Self>,
        call_id: u64,
        prepared: PreparedRequest,
        token: CancellationToken,
        signal: Option<CancellationToken>,
    ) -> Envelope {
        let start_time = Instant::now();
        let mut attempt = 0;
        let mut unsettled = Unsettled {
            inner: self.clone(),
            call_id,
            signature: prepared.signature.clone(),
            armed: true,
        };

        let outcome = loop {
            attempt += 1;

            let result = tokio::select! {
                biased;
                _ = either_cancelled(&token, signal.as_ref()) => Err(Error::Cancelled),
                result = self.execute_attempt(&prepared, attempt) => result,
            };

            let error = match result {
                Ok(settled) => break Ok(settled),
                Err(Error::Cancelled) => break Err(Error::Cancelled),
                Err(e) => e,
            };

            tracing::warn!(
                error = %error,
                attempt = attempt,
                method = %prepared.method,
                url = %prepared.url,
                "Request failed"
            );

            if !self.retry_predicate.should_retry(&error, attempt) {
                break Err(error);
            }
            let Some(delay) = self.config.retry_strategy.delay_for_attempt(attempt) else {
                break Err(error);
            };
            let delay = self
                .config
                .retry_after
                .delay(error.retry_after())
                .unwrap_or(delay);

            tracing::info!(
                delay_ms = delay.as_millis(),
                attempt = attempt,
                "Retrying request after delay"
            );

            let cancelled = tokio::select! {
                biased;
                _ = either_cancelled(&token, signal.as_ref()) => true,
                _ = tokio::time::sleep(delay) => false,
            };
            if cancelled {
                break Err(Error::Cancelled);
            }
        };

        let latency = start_time.elapsed();
        let envelope = match outcome {
            Ok(settled) => Envelope::success(
                settled.data,
                settled.status,
                settled.headers,
                latency,
                attempt,
            ),
            Err(e) => Envelope::failure(e, latency, attempt),
        };

        unsettled.armed = false;
        self.settle(call_id, &prepared, &envelope);
        envelope
    }

    /// Executes a single attempt, racing the transport against the timeout.
    async fn execute_attempt(&self, prepared: &PreparedRequest, attempt: usize) -> Result<Settled> {
        tracing::debug!(
            method = %prepared.method,
            url = %prepared.url,
            attempt = attempt,
            "Executing HTTP request"
        );

        let request = HttpRequest {
            method: prepared.method.clone(),
            url: prepared.url.clone(),
            headers: prepared.headers.clone(),
            body: prepared.body.clone(),
            extensions: prepared.extensions.clone(),
        };

        // Dropping the transport future on timeout aborts the request.
        let timeout = self.config.timeout;
        let response = match tokio::time::timeout(timeout, self.transport.send(request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return Err(transport_error(e, timeout)),
            Err(_) => return Err(Error::Timeout { after: timeout }),
        };

        self.parse_response(response, attempt)
    }

    fn parse_response(&self, response: HttpResponse, attempt: usize) -> Result<Settled> {
        let status = response.status;
        let content_type = response.content_type().map(str::to_owned);

        tracing::info!(
            status = status.as_u16(),
            attempt = attempt,
            "Received HTTP response"
        );

        if !status.is_success() {
            let retry_after = parse_retry_after(&response.headers);

            if status.is_client_error() {
                tracing::error!(
                    status = status.as_u16(),
                    response = %response.body,
                    "Client error (4xx)"
                );
            } else if status.is_server_error() {
                tracing::warn!(
                    status = status.as_u16(),
                    response = %response.body,
                    "Server error (5xx)"
                );
            }

            let data = if response.body.is_empty() {
                None
            } else {
                let raw = response.body.clone();
                Some(
                    Body::parse(content_type.as_deref(), response.body)
                        .unwrap_or(Body::Text(raw)),
                )
            };

            return Err(Error::HttpError {
                status,
                data,
                headers: Box::new(response.headers),
                retry_after,
            });
        }

        let raw_body = response.body.clone();
        match Body::parse(content_type.as_deref(), response.body) {
            Ok(data) => Ok(Settled {
                data,
                status,
                headers: response.headers,
            }),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    raw_response = %raw_body,
                    "Failed to deserialize response"
                );

                Err(Error::DeserializationFailed {
                    raw_response: raw_body,
                    serde_error: e.to_string(),
                    status,
                })
            }
        }
    }

    /// Releases the registry entries of a finished call and records its outcome.
    fn settle(&self, call_id: u64, prepared: &PreparedRequest, envelope: &Envelope) {
        let signature = &prepared.signature;
        let mut state = self.lock();
        state.release(call_id, signature);

        match &envelope.error {
            None => {
                state.last.data = envelope.data.clone();
                state.last.error = None;

                if self.config.cache_enabled && prepared.method == Method::GET {
                    if let Some(data) = &envelope.data {
                        state.cache.insert(signature.clone(), data.clone());
                    }
                }
            }
            // A cancelled call is not a failure of the resource.
            Some(Error::Cancelled) => {}
            Some(error) => state.last.error = Some(error.clone()),
        }
    }
}

impl State {
    fn release(&mut self, call_id: u64, signature: &Signature) {
        if self
            .in_flight
            .get(signature)
            .is_some_and(|in_flight| in_flight.call_id == call_id)
        {
            self.in_flight.remove(signature);
        }
        self.pending.remove(&call_id);
        if self.latest == Some(call_id) {
            self.latest = None;
        }
    }
}

/// Releases a call's registry entries if its execution unwinds before settling.
struct Unsettled {
    inner: Arc<ClientInner>,
    call_id: u64,
    signature: Signature,
    armed: bool,
}

impl Drop for Unsettled {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        tracing::error!(signature = %self.signature, "Request execution ended without settling");
        let mut state = self.inner.lock();
        state.release(self.call_id, &self.signature);
        state.last.error = Some(Error::Unknown("request execution aborted".to_string()));
    }
}

fn transport_error(error: TransportError, timeout: Duration) -> Error {
    match error {
        TransportError::Connect(message) => Error::Network(message),
        TransportError::TimedOut => Error::Timeout { after: timeout },
        TransportError::Other(message) => Error::Unknown(message),
    }
}
