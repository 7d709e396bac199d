//! Client configuration and its builder.

use crate::{
    client::Client,
    metadata::parse_header,
    retry::{RetryOnFailure, RetryPredicate, RetryStrategy},
    retry_after::RetryAfterConfig,
    transport::{ReqwestTransport, Transport},
    Error, Result,
};
use http::HeaderMap;
use std::sync::Arc;
use std::time::Duration;

/// The default per-attempt timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);

/// The default base delay between retries.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1_000);

/// Settings a [`Client`] is bound to for its whole lifetime.
///
/// Construct a new client to use different settings.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Prefix prepended verbatim to every path. Empty means paths are absolute URLs.
    pub base_url: String,

    /// Headers sent with every request, overridable per call.
    pub default_headers: HeaderMap,

    /// How long a single attempt may take.
    pub timeout: Duration,

    /// How failed attempts are retried.
    pub retry_strategy: RetryStrategy,

    /// Whether successful `GET` responses are cached by signature.
    pub cache_enabled: bool,

    /// Whether identical concurrent calls share one execution.
    pub deduplication_enabled: bool,

    /// Server-requested retry delays.
    pub retry_after: RetryAfterConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            default_headers: HeaderMap::new(),
            timeout: DEFAULT_TIMEOUT,
            retry_strategy: RetryStrategy::default(),
            cache_enabled: false,
            deduplication_enabled: false,
            retry_after: RetryAfterConfig::default(),
        }
    }
}

impl ClientConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        if !self.base_url.is_empty() {
            url::Url::parse(&self.base_url).map_err(|e| {
                Error::ConfigurationError(format!("Invalid base URL {:?}: {}", self.base_url, e))
            })?;
        }
        if self.timeout.is_zero() {
            return Err(Error::ConfigurationError(
                "timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for configuring and creating a [`Client`].
///
/// # Examples
///
/// ```no_run
/// use fetchwell::ClientBuilder;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), fetchwell::Error> {
/// let client = ClientBuilder::new()
///     .base_url("https://project.example.co/rest/v1")?
///     .default_header("apikey", "public-anon-key")?
///     .timeout(Duration::from_secs(5))
///     .retries(2)
///     .retry_delay(Duration::from_millis(250))
///     .cache(true)
///     .deduplicate(true)
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    config: ClientConfig,
    retry_predicate: Option<Box<dyn RetryPredicate>>,
    transport: Option<Arc<dyn Transport>>,
}

impl ClientBuilder {
    /// Creates a new `ClientBuilder` with default settings.
    pub fn new() -> Self {
        Self::from_config(ClientConfig::default())
    }

    /// Starts from an existing configuration.
    pub fn from_config(config: ClientConfig) -> Self {
        Self {
            config,
            retry_predicate: None,
            transport: None,
        }
    }

    /// Sets the base URL prepended to every path.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn base_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        url::Url::parse(url.as_ref())?;
        self.config.base_url = url.as_ref().to_string();
        Ok(self)
    }

    /// Adds a default header that will be included in all requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let (name, value) = parse_header(name.as_ref(), value.as_ref())
            .map_err(|e| Error::ConfigurationError(e.to_string()))?;
        self.config.default_headers.insert(name, value);
        Ok(self)
    }

    /// Sets the per-attempt timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Sets the number of retries after the first failure, with linear backoff.
    pub fn retries(mut self, retries: usize) -> Self {
        let delay = self.linear_delay();
        self.config.retry_strategy = RetryStrategy::Linear {
            delay,
            max_retries: retries,
        };
        self
    }

    /// Sets the base delay of the linear backoff; retry `n` waits `delay * n`.
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        let max_retries = match self.config.retry_strategy {
            RetryStrategy::Linear { max_retries, .. } => max_retries,
            _ => self.config.retry_strategy.max_retries().unwrap_or(0),
        };
        self.config.retry_strategy = RetryStrategy::Linear { delay, max_retries };
        self
    }

    /// Replaces the retry strategy entirely.
    pub fn retry_strategy(mut self, strategy: RetryStrategy) -> Self {
        self.config.retry_strategy = strategy;
        self
    }

    /// Sets a custom retry predicate.
    ///
    /// By default every failure except cancellation is retried.
    pub fn retry_predicate(mut self, predicate: Box<dyn RetryPredicate>) -> Self {
        self.retry_predicate = Some(predicate);
        self
    }

    /// Enables or disables the response cache.
    pub fn cache(mut self, enabled: bool) -> Self {
        self.config.cache_enabled = enabled;
        self
    }

    /// Enables or disables request deduplication.
    pub fn deduplicate(mut self, enabled: bool) -> Self {
        self.config.deduplication_enabled = enabled;
        self
    }

    /// Sets the `Retry-After` handling.
    pub fn retry_after(mut self, config: RetryAfterConfig) -> Self {
        self.config.retry_after = config;
        self
    }

    /// Uses a custom transport instead of `reqwest`.
    pub fn transport(mut self, transport: impl Transport) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Builds the configured `Client`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> Result<Client> {
        self.config.validate()?;

        let retry_predicate = self
            .retry_predicate
            .unwrap_or_else(|| Box::new(RetryOnFailure));
        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(ReqwestTransport::new()));

        Ok(Client::from_parts(self.config, retry_predicate, transport))
    }

    fn linear_delay(&self) -> Duration {
        match self.config.retry_strategy {
            RetryStrategy::Linear { delay, .. } => delay,
            _ => DEFAULT_RETRY_DELAY,
        }
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
