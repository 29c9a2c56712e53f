use crate::config::GatewayConfig;
use crate::core::ratelimiter::RateLimiter;
use crate::domain::ports::RestClient;
use crate::utils::conversion::to_string_pairs;
use crate::utils::error::{PincerError, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, Method};
use serde_json::Value;
use std::time::Duration;

/// Body, headers and query of a single REST call.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub body: Option<String>,
    pub content_type: Option<String>,
    pub headers: Option<Value>,
    pub params: Option<Value>,
}

impl RequestOptions {
    pub fn json(body: &Value) -> Self {
        Self {
            body: Some(body.to_string()),
            ..Default::default()
        }
    }

    pub fn params(params: Value) -> Self {
        Self {
            params: Some(params),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpClientBuilder {
    token: String,
    version: u8,
    max_retries: u32,
    base_url: Option<String>,
    retry_unit: Duration,
}

impl HttpClientBuilder {
    pub fn version(mut self, version: u8) -> Self {
        self.version = version;
        self
    }

    /// Attempts made for a request that keeps failing with 5xx.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Replaces `https://discord.com/api` (proxies, tests).
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn retry_unit(mut self, retry_unit: Duration) -> Self {
        self.retry_unit = retry_unit;
        self
    }

    pub fn build(self) -> Result<HttpClient> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bot {}", self.token)).map_err(|_| {
            PincerError::ConfigError {
                message: "token contains characters not allowed in a header".to_string(),
            }
        })?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(USER_AGENT, HeaderValue::from_static(GatewayConfig::USER_AGENT));

        let client = Client::builder().default_headers(headers).build()?;

        let root = self
            .base_url
            .unwrap_or_else(|| GatewayConfig::API_BASE.to_string());
        let url = format!("{}/v{}", root.trim_end_matches('/'), self.version);

        Ok(HttpClient {
            client,
            url,
            max_ttl: self.max_retries,
            retry_unit: self.retry_unit,
            rate_limiter: RateLimiter::new(),
        })
    }
}

/// Interacts with the Discord REST API.
///
/// Every request waits on the route's rate limit bucket first. A 429 is
/// retried after the `retry_after` Discord sends; 5xx responses are retried
/// with a growing delay until `max_retries` attempts were made.
#[derive(Debug)]
pub struct HttpClient {
    client: Client,
    url: String,
    max_ttl: u32,
    retry_unit: Duration,
    rate_limiter: RateLimiter,
}

impl HttpClient {
    pub fn builder(token: impl Into<String>) -> HttpClientBuilder {
        HttpClientBuilder {
            token: token.into(),
            version: GatewayConfig::VERSION,
            max_retries: GatewayConfig::MAX_RETRIES,
            base_url: None,
            retry_unit: Duration::from_secs(1),
        }
    }

    pub fn new(token: impl Into<String>) -> Result<Self> {
        Self::builder(token).build()
    }

    /// `{base}/v{version}`, every route is appended to it.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn max_retries(&self) -> u32 {
        self.max_ttl
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    pub async fn request(
        &self,
        method: Method,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<Option<Value>> {
        let endpoint = endpoint.trim_start_matches('/');
        let content_type = options
            .content_type
            .as_deref()
            .unwrap_or("application/json");
        let headers = options.headers.as_ref().map(to_string_pairs).unwrap_or_default();
        let params = options.params.as_ref().map(to_string_pairs).unwrap_or_default();

        let mut ttl = self.max_ttl;

        loop {
            if ttl == 0 {
                tracing::error!(
                    "{} {} has reached the maximum retry count of {}.",
                    method,
                    endpoint,
                    self.max_ttl
                );
                return Err(PincerError::ServerError {
                    message: format!("Maximum amount of retries for `{}`.", endpoint),
                });
            }

            tracing::debug!(
                "{} {} | {}",
                method,
                endpoint,
                options.body.as_deref().unwrap_or("")
            );

            self.rate_limiter
                .wait_until_not_ratelimited(endpoint, &method)
                .await;

            let url = format!("{}/{}", self.url, endpoint);
            let mut request = self
                .client
                .request(method.clone(), &url)
                .header(CONTENT_TYPE, content_type);

            for (name, value) in &headers {
                request = request.header(name.as_str(), value.as_str());
            }
            if !params.is_empty() {
                request = request.query(&params);
            }
            if let Some(body) = &options.body {
                request = request.body(body.clone());
            }

            let response = request.send().await?;
            let status = response.status();
            let response_headers = response.headers().clone();
            let text = response.text().await?;

            tracing::debug!("Received response for {} | {}", endpoint, text);

            self.rate_limiter
                .save_response_bucket(endpoint, &method, &response_headers);

            if status.is_success() {
                if status.as_u16() == 204 || text.trim().is_empty() {
                    tracing::debug!("Request has been sent successfully.");
                    return Ok(None);
                }

                tracing::debug!("Request has been sent successfully. Returning json response.");
                return Ok(Some(serde_json::from_str(&text)?));
            }

            let reason = status.canonical_reason().unwrap_or("Unknown").to_string();

            if status.as_u16() == 429 {
                let timeout = retry_after(&text);
                let scope = response_headers
                    .get("x-ratelimit-scope")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown");

                tracing::warn!(
                    "RateLimitError: {}. The scope is {}. Retrying in {:?}",
                    reason,
                    scope,
                    timeout
                );
                tokio::time::sleep(timeout).await;
                continue;
            }

            if let Some(err) = PincerError::from_status(status.as_u16(), reason.clone()) {
                tracing::error!(
                    "An http exception occurred while trying to send a request to {}. ({}, {})",
                    endpoint,
                    status.as_u16(),
                    reason
                );
                return Err(err);
            }

            if !status.is_server_error() {
                return Err(PincerError::UnexpectedStatus {
                    status: status.as_u16(),
                    reason,
                });
            }

            let retry_in = self.retry_unit * (1 + (self.max_ttl - ttl) * 2);
            tracing::debug!(
                "Server side error occurred with status code {}. Retrying in {:?}.",
                status.as_u16(),
                retry_in
            );
            tokio::time::sleep(retry_in).await;
            ttl -= 1;
        }
    }

    pub async fn get(&self, route: &str, params: Option<Value>) -> Result<Option<Value>> {
        let options = RequestOptions {
            params,
            ..Default::default()
        };
        self.request(Method::GET, route, options).await
    }

    pub async fn head(&self, route: &str) -> Result<Option<Value>> {
        self.request(Method::HEAD, route, RequestOptions::default())
            .await
    }

    pub async fn options(&self, route: &str) -> Result<Option<Value>> {
        self.request(Method::OPTIONS, route, RequestOptions::default())
            .await
    }

    pub async fn delete(&self, route: &str) -> Result<Option<Value>> {
        self.request(Method::DELETE, route, RequestOptions::default())
            .await
    }

    pub async fn post(&self, route: &str, body: Value) -> Result<Option<Value>> {
        self.request(Method::POST, route, RequestOptions::json(&body))
            .await
    }

    pub async fn patch(&self, route: &str, body: Value) -> Result<Option<Value>> {
        self.request(Method::PATCH, route, RequestOptions::json(&body))
            .await
    }

    pub async fn put(&self, route: &str, body: Value) -> Result<Option<Value>> {
        self.request(Method::PUT, route, RequestOptions::json(&body))
            .await
    }
}

#[async_trait]
impl RestClient for HttpClient {
    async fn get(&self, route: &str, params: Option<Value>) -> Result<Option<Value>> {
        HttpClient::get(self, route, params).await
    }

    async fn post(&self, route: &str, body: Value) -> Result<Option<Value>> {
        HttpClient::post(self, route, body).await
    }

    async fn patch(&self, route: &str, body: Value) -> Result<Option<Value>> {
        HttpClient::patch(self, route, body).await
    }

    async fn put(&self, route: &str, body: Value) -> Result<Option<Value>> {
        HttpClient::put(self, route, body).await
    }

    async fn delete(&self, route: &str) -> Result<Option<Value>> {
        HttpClient::delete(self, route).await
    }
}

const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(40);

/// Wait after a 429, read from the JSON body. Missing, negative or
/// out-of-range values fall back to 40 seconds.
pub fn retry_after(body: &str) -> Duration {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("retry_after").and_then(Value::as_f64))
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .unwrap_or(DEFAULT_RETRY_AFTER)
}
