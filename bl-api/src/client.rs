//! HTTP client for the Booking REST API.
//!
//! Handles bearer-token authentication, timeout management, exponential
//! backoff retry for transport failures, and request/response lifecycle.
//! Money-moving calls go through the no-retry path (`request_once`).

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use bl_core::config::ServerConfig;
use bl_core::constants;
use bl_core::credentials::CredentialProvider;
use bl_core::error::{BlError, BlResult};

use crate::response::ApiResponse;

/// Retry configuration for HTTP requests.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts.
    pub max_retries: u32,
    /// Base delay between retries (doubles each attempt).
    pub base_delay: Duration,
    /// Maximum delay cap.
    pub max_delay: Duration,
    /// HTTP status codes that trigger a retry.
    pub retryable_statuses: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(4),
            retryable_statuses: vec![502, 503, 504],
        }
    }
}

/// HTTP client for communicating with the Booking API.
///
/// Wraps `reqwest::Client` with credential-provider authentication,
/// retry logic for transport failures, and error classification.
#[derive(Clone)]
pub struct ApiClient {
    inner: Client,
    /// Base URL for the API (e.g. "https://api.example/api/v1").
    api_root: String,
    /// Source of the bearer token for each request.
    credentials: Arc<dyn CredentialProvider>,
    /// Default request timeout.
    timeout: Duration,
    /// Retry configuration.
    retry_config: RetryConfig,
}

impl ApiClient {
    /// Create a new ApiClient from server configuration.
    pub fn new(config: &ServerConfig, credentials: Arc<dyn CredentialProvider>) -> BlResult<Self> {
        let inner = Client::builder()
            .timeout(Duration::from_millis(config.api_timeout_ms))
            .connect_timeout(Duration::from_secs(15))
            .pool_max_idle_per_host(5)
            .tcp_keepalive(Duration::from_secs(30))
            .build()
            .map_err(|e| BlError::Transport(format!("failed to build HTTP client: {e}")))?;

        let api_root = format!(
            "{}/api/{}",
            config.base_url.trim_end_matches('/'),
            constants::API_VERSION
        );

        Ok(Self {
            inner,
            api_root,
            credentials,
            timeout: Duration::from_millis(config.api_timeout_ms),
            retry_config: RetryConfig::default(),
        })
    }

    /// Set custom retry configuration.
    pub fn with_retry_config(mut self, config: RetryConfig) -> Self {
        self.retry_config = config;
        self
    }

    /// Get the current API root URL.
    pub fn api_root(&self) -> &str {
        &self.api_root
    }

    /// Build the full URL for an API path.
    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.api_root)
    }

    /// Internal: build an authenticated request for the given method and body.
    async fn build_request(
        &self,
        method: Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> BlResult<RequestBuilder> {
        let token = self.credentials.access_token().await?;
        let mut builder = self
            .inner
            .request(method, url)
            .timeout(self.timeout)
            .bearer_auth(token);
        if let Some(b) = body {
            builder = builder.json(b);
        }
        Ok(builder)
    }

    /// Execute a request with exponential backoff retry.
    ///
    /// Retries transport failures and the retryable status codes only;
    /// everything else is surfaced on the first attempt.
    async fn request_with_retry(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> BlResult<Response> {
        let url = self.url(path);
        debug!("{} {}", method, path);

        let mut last_error: Option<BlError> = None;

        for attempt in 0..=self.retry_config.max_retries {
            if attempt > 0 {
                let delay = self.retry_delay(attempt - 1);
                warn!(
                    "retrying {} {} (attempt {}/{}) after {:.1}s",
                    method,
                    path,
                    attempt + 1,
                    self.retry_config.max_retries + 1,
                    delay.as_secs_f64()
                );
                tokio::time::sleep(delay).await;
            }

            let builder = self.build_request(method.clone(), &url, body).await?;

            match builder.send().await {
                Ok(response) => {
                    let status = response.status();

                    if self
                        .retry_config
                        .retryable_statuses
                        .contains(&status.as_u16())
                        && attempt < self.retry_config.max_retries
                    {
                        warn!("retryable status {} from {}", status.as_u16(), path);
                        last_error = Some(BlError::ServerError {
                            status: status.as_u16(),
                            message: format!("retryable status {status}"),
                        });
                        continue;
                    }

                    return Self::check_status(response).await;
                }
                Err(e) => {
                    let is_retryable = e.is_timeout() || e.is_connect();
                    let err = Self::classify_error(e);

                    if is_retryable && attempt < self.retry_config.max_retries {
                        warn!("retryable error on {}: {}", path, err);
                        last_error = Some(err);
                        continue;
                    }

                    return Err(err);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| BlError::Transport("max retries exceeded".into())))
    }

    /// Execute a request exactly once, with no retry of any kind.
    ///
    /// Used for payment verification, where a repeated attempt risks
    /// double-charging: the caller maps any failure to the ambiguous
    /// manual-resolution state instead.
    async fn request_once(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> BlResult<Response> {
        let url = self.url(path);
        debug!("{} {} (no-retry)", method, path);

        let builder = self.build_request(method, &url, body).await?;
        let response = builder.send().await.map_err(Self::classify_error)?;
        Self::check_status(response).await
    }

    /// Calculate retry delay with exponential backoff.
    fn retry_delay(&self, attempt: u32) -> Duration {
        let base_ms = self.retry_config.base_delay.as_millis() as u64;
        let delay_ms = base_ms.saturating_mul(1u64 << attempt.min(16));
        let max_ms = self.retry_config.max_delay.as_millis() as u64;
        Duration::from_millis(delay_ms.min(max_ms))
    }

    // --- Public HTTP methods ---

    /// Execute a GET request with automatic retry.
    pub async fn get(&self, path: &str) -> BlResult<Response> {
        self.request_with_retry(Method::GET, path, None).await
    }

    /// Execute a POST request with a JSON body.
    pub async fn post(&self, path: &str, body: &serde_json::Value) -> BlResult<Response> {
        self.request_with_retry(Method::POST, path, Some(body)).await
    }

    /// Execute a PUT request with a JSON body.
    pub async fn put(&self, path: &str, body: &serde_json::Value) -> BlResult<Response> {
        self.request_with_retry(Method::PUT, path, Some(body)).await
    }

    /// Execute a POST request exactly once (no retry).
    pub async fn post_once(&self, path: &str, body: &serde_json::Value) -> BlResult<Response> {
        self.request_once(Method::POST, path, Some(body)).await
    }

    // --- Response helpers ---

    /// Deserialize a response body into an ApiResponse<T>.
    pub async fn parse_response<T: DeserializeOwned>(
        response: Response,
    ) -> BlResult<ApiResponse<T>> {
        response
            .json::<ApiResponse<T>>()
            .await
            .map_err(|e| BlError::Serialization(format!("failed to parse response: {e}")))
    }

    /// Convenience: GET + parse into ApiResponse<T>.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> BlResult<ApiResponse<T>> {
        let resp = self.get(path).await?;
        Self::parse_response(resp).await
    }

    /// Convenience: POST + parse into ApiResponse<T>.
    pub async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> BlResult<ApiResponse<T>> {
        let resp = self.post(path, body).await?;
        Self::parse_response(resp).await
    }

    /// Convenience: PUT + parse into ApiResponse<T>.
    pub async fn put_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> BlResult<ApiResponse<T>> {
        let resp = self.put(path, body).await?;
        Self::parse_response(resp).await
    }

    /// Ping the server. Returns the round-trip latency.
    pub async fn health_check(&self) -> BlResult<Duration> {
        let start = std::time::Instant::now();
        let resp: ApiResponse = self.get_json("/ping").await?;
        if resp.is_success() {
            Ok(start.elapsed())
        } else {
            Err(BlError::Transport("health check failed".into()))
        }
    }

    /// Check the HTTP status code and convert to BlError if needed.
    async fn check_status(response: Response) -> BlResult<Response> {
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(BlError::AuthFailed(format!("server returned {status}")));
        }

        if status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(BlError::ServerError {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(response)
    }

    /// Classify a reqwest error into a BlError variant.
    fn classify_error(e: reqwest::Error) -> BlError {
        if e.is_timeout() {
            BlError::Timeout(e.to_string())
        } else if e.is_connect() {
            BlError::Transport(format!("connection failed: {e}"))
        } else {
            BlError::Transport(e.to_string())
        }
    }
}
