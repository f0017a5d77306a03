//! HTTP transport for the Onionoo API
//!
//! This module provides the request and response types, the HTTP error
//! taxonomy, client configuration, retry logic and the [`Transport`] trait
//! together with its `reqwest` implementation.
//!
//! Reference: <https://metrics.torproject.org/onionoo.html#errors>

use crate::document::ParsePolicy;
use crate::params::Endpoint;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::env;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;

/// Default Onionoo instance
pub const DEFAULT_BASE_URL: &str = "https://onionoo.torproject.org";

// =============================================================================
// Error Types
// =============================================================================

/// HTTP error with status, error code and message
///
/// Status `0` marks a request that never produced a response (connection
/// failure, timeout, truncated body).
///
/// # Examples
/// ```
/// use onionoo_client::HttpError;
///
/// let error = HttpError::service_unavailable("maintenance");
/// assert_eq!(error.status(), 503);
/// assert!(error.is_network_error());
///
/// let error = HttpError::bad_request("unknown parameter");
/// assert!(!error.is_network_error());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("HTTP {status} {code}: {message}")]
pub struct HttpError {
    status: u16,
    code: String,
    message: String,
}

impl HttpError {
    /// Create a new HTTP error
    pub fn new(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Create an error for a status code, deriving the error code from it
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let code = match status {
            304 => "NotModified".to_string(),
            400 => "BadRequest".to_string(),
            404 => "NotFound".to_string(),
            500 => "InternalServerError".to_string(),
            503 => "ServiceUnavailable".to_string(),
            other => reqwest::StatusCode::from_u16(other)
                .ok()
                .and_then(|s| s.canonical_reason())
                .map(|reason| reason.replace([' ', '-'], ""))
                .unwrap_or_else(|| "Unknown".to_string()),
        };
        Self::new(status, code, message)
    }

    /// Connection failure or timeout
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(0, "NetworkError", message)
    }

    /// 304: the document did not change since `If-Modified-Since`
    pub fn not_modified(message: impl Into<String>) -> Self {
        Self::from_status(304, message)
    }

    /// 400: the request contained an unknown parameter or invalid value
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::from_status(400, message)
    }

    /// 404: the requested resource does not exist
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::from_status(404, message)
    }

    /// 500: the server failed to process the request
    pub fn internal_server_error(message: impl Into<String>) -> Self {
        Self::from_status(500, message)
    }

    /// 503: the server is temporarily out of date or unavailable
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::from_status(503, message)
    }

    /// Get the HTTP status code
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Get the error code
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether the server reported that nothing changed
    pub fn is_not_modified(&self) -> bool {
        self.status == 304
    }

    /// Check if this is a transient failure that should be retried
    ///
    /// Retryable statuses: 0, 408, 425, 429, 500, 502, 503, 504, 522, 524
    pub fn is_network_error(&self) -> bool {
        matches!(
            self.status,
            0 | 408 | 425 | 429 | 500 | 502 | 503 | 504 | 522 | 524
        )
    }
}

// =============================================================================
// Request and Response Types
// =============================================================================

/// GET request to an Onionoo endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct OnionooRequest {
    /// Endpoint to query
    pub endpoint: Endpoint,
    /// Query parameters, in the order they are sent
    pub params: Vec<(String, String)>,
    /// Request headers
    pub headers: HashMap<String, String>,
}

impl OnionooRequest {
    /// Create a request without parameters
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            params: Vec::new(),
            headers: HashMap::new(),
        }
    }

    /// Add a query parameter
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Add several query parameters
    pub fn params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.params
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Add a header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Only return the document if it changed after `since`
    pub fn if_modified_since(self, since: DateTime<Utc>) -> Self {
        let value = since.format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        self.header("If-Modified-Since", value)
    }

    /// Value of a query parameter
    pub fn get_param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Successful response from an Onionoo endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct OnionooResponse<T> {
    /// HTTP status code
    pub status: u16,
    /// Response headers, with lower-case names
    pub headers: HashMap<String, String>,
    /// Response data
    pub data: T,
}

impl<T> OnionooResponse<T> {
    /// Create a new response
    pub fn new(status: u16, headers: HashMap<String, String>, data: T) -> Self {
        Self {
            status,
            headers,
            data,
        }
    }

    /// Get a header value
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .get(&key.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Parsed `Last-Modified` header, if any
    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.header("last-modified")
            .and_then(|value| DateTime::parse_from_rfc2822(value).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }
}

// =============================================================================
// Client Configuration
// =============================================================================

/// Configuration for the Onionoo client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base service URL
    pub base_url: String,
    /// Timeout of a single request
    pub timeout: Duration,
    /// User agent string
    pub user_agent: String,
    /// Custom headers to include in all requests
    pub default_headers: HashMap<String, String>,
    /// Retries after a transient failure
    pub max_retries: usize,
    /// Delay before the first retry; doubles on each further retry
    pub retry_delay: Duration,
    /// How entity-level parse failures are handled
    pub parse_policy: ParsePolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(60),
            user_agent: format!("garlic/{}", env!("CARGO_PKG_VERSION")),
            default_headers: HashMap::new(),
            max_retries: 5,
            retry_delay: Duration::from_millis(500),
            parse_policy: ParsePolicy::Strict,
        }
    }
}

impl ClientConfig {
    /// Create a new config with a base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Load configuration from environment variables
    ///
    /// Reads `ONIONOO_BASE_URL`, `ONIONOO_TIMEOUT_SECS` and
    /// `ONIONOO_MAX_RETRIES`. Unset variables keep their defaults; values
    /// that do not parse are rejected.
    pub fn from_env() -> crate::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> crate::Result<Self> {
        let mut config = Self::default();

        if let Some(base_url) = lookup("ONIONOO_BASE_URL") {
            config.base_url = base_url;
        }

        if let Some(raw) = lookup("ONIONOO_TIMEOUT_SECS") {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                crate::Error::Config(format!("Invalid ONIONOO_TIMEOUT_SECS: {raw}"))
            })?;
            config.timeout = Duration::from_secs(secs);
        }

        if let Some(raw) = lookup("ONIONOO_MAX_RETRIES") {
            config.max_retries = raw.trim().parse().map_err(|_| {
                crate::Error::Config(format!("Invalid ONIONOO_MAX_RETRIES: {raw}"))
            })?;
        }

        Ok(config)
    }

    /// Set the timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Add a default header
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(key.into(), value.into());
        self
    }

    /// Set the number of retries
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the delay before the first retry
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Set the parse policy
    pub fn with_parse_policy(mut self, policy: ParsePolicy) -> Self {
        self.parse_policy = policy;
        self
    }

    /// Retry policy derived from this configuration
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::new(self.max_retries).with_initial_delay(self.retry_delay)
    }

    /// Full URL of an endpoint
    pub fn endpoint_url(&self, endpoint: Endpoint) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), endpoint.path())
    }
}

// =============================================================================
// Retry Logic with Exponential Backoff
// =============================================================================

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_retries: usize,
    /// Initial delay between retries
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Backoff multiplier
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Create a new retry configuration
    pub fn new(max_retries: usize) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// Set the initial delay
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the maximum delay
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set the backoff multiplier
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    fn calculate_delay(&self, attempt: usize) -> Duration {
        let delay_ms = self.initial_delay.as_millis() as f64
            * self.backoff_multiplier.powi(attempt as i32);

        Duration::from_millis(delay_ms as u64).min(self.max_delay)
    }
}

/// Retry an async operation while `should_retry` accepts its error
///
/// The operation runs at most `max_retries + 1` times. The last error is
/// returned once retries are exhausted.
///
/// # Examples
/// ```
/// use onionoo_client::http::{retry, HttpError, RetryConfig};
///
/// async fn example() -> Result<String, HttpError> {
///     retry(
///         RetryConfig::new(3),
///         |err: &HttpError| err.is_network_error(),
///         || async { Ok("success".to_string()) },
///     )
///     .await
/// }
/// ```
pub async fn retry<F, Fut, T, E>(
    config: RetryConfig,
    should_retry: impl Fn(&E) -> bool,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(err) => {
                if !should_retry(&err) || attempt >= config.max_retries {
                    return Err(err);
                }

                let delay = config.calculate_delay(attempt);
                attempt += 1;
                tracing::warn!(
                    attempt,
                    max_retries = config.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "request failed, retrying"
                );
                sleep(delay).await;
            }
        }
    }
}

/// Retry transient HTTP failures
pub async fn network_retry<F, Fut, T>(config: RetryConfig, operation: F) -> Result<T, HttpError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, HttpError>>,
{
    retry(config, HttpError::is_network_error, operation).await
}

// =============================================================================
// Transport
// =============================================================================

/// Fetches raw JSON documents from Onionoo
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue one GET request and decode the body as JSON
    async fn fetch(&self, request: OnionooRequest) -> Result<OnionooResponse<Value>, HttpError>;
}

/// [`Transport`] backed by `reqwest`
///
/// Responses are requested gzip-compressed and decompressed transparently.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    config: ClientConfig,
}

impl HttpTransport {
    /// Create a new transport
    pub fn new(config: ClientConfig) -> crate::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .gzip(true)
            .build()
            .map_err(|e| crate::Error::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Get the transport configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn decode(response: reqwest::Response) -> Result<OnionooResponse<Value>, HttpError> {
        let status = response.status();

        let headers = response
            .headers()
            .iter()
            .filter_map(|(key, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (key.as_str().to_string(), v.to_string()))
            })
            .collect();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = if body.trim().is_empty() {
                status.canonical_reason().unwrap_or("no message").to_string()
            } else {
                body.trim().to_string()
            };
            return Err(HttpError::from_status(status.as_u16(), message));
        }

        let body = response
            .text()
            .await
            .map_err(|e| HttpError::network(format!("Failed to read response: {e}")))?;

        let data: Value = serde_json::from_str(&body).map_err(|e| {
            HttpError::new(
                status.as_u16(),
                "InvalidBody",
                format!("Failed to parse JSON: {e}"),
            )
        })?;

        Ok(OnionooResponse::new(status.as_u16(), headers, data))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, request: OnionooRequest) -> Result<OnionooResponse<Value>, HttpError> {
        let url = self.config.endpoint_url(request.endpoint);
        tracing::debug!(%url, params = ?request.params, "GET");

        let mut req = self.client.get(&url).query(&request.params);

        for (key, value) in &self.config.default_headers {
            req = req.header(key, value);
        }
        for (key, value) in &request.headers {
            req = req.header(key, value);
        }

        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                HttpError::new(0, "Timeout", format!("Request timed out: {e}"))
            } else {
                HttpError::network(format!("Request failed: {e}"))
            }
        })?;

        Self::decode(response).await
    }
}

// =============================================================================
// Tests
// =============================================================================
