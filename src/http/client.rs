//! Front API client
//!
//! Every outbound call goes through [`FrontClient::send`], which:
//! - paces calls client-side (one per configured interval)
//! - blocks while the server-reported budget is exhausted
//! - attaches the bearer token and JSON content type
//! - classifies throttling statuses and retries them per [`RetryPolicy`]

use super::rate_limit::{CallPacer, RateBudget};
use super::retry::RetryPolicy;
use crate::config::TapConfig;
use crate::error::{Error, Result};
use crate::types::{JsonValue, Method};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{HeaderMap, ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Configuration for the Front client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Base URL for relative paths
    pub base_url: String,
    /// Bearer token
    pub token: String,
    /// Socket-level timeout per request
    pub timeout: Duration,
    /// Client-side pacing interval (`None` disables pacing)
    pub min_call_interval: Option<Duration>,
    /// Retry rules
    pub retry: RetryPolicy,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            base_url: crate::config::DEFAULT_BASE_URL.to_string(),
            token: String::new(),
            timeout: Duration::from_secs(30),
            min_call_interval: Some(Duration::from_secs(61)),
            retry: RetryPolicy::front_default(),
            user_agent: format!("frontapp-tap/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpClientConfig {
    /// Create a new config builder
    pub fn builder() -> HttpClientConfigBuilder {
        HttpClientConfigBuilder::default()
    }

    /// Derive client settings from the tap config
    pub fn from_tap_config(config: &TapConfig) -> Self {
        let mut builder = Self::builder()
            .base_url(&config.base_url)
            .token(&config.token)
            .timeout(config.request_timeout());

        builder = match config.min_call_interval() {
            Some(interval) => builder.min_call_interval(interval),
            None => builder.no_pacing(),
        };

        if let Some(agent) = &config.user_agent {
            builder = builder.user_agent(agent);
        }

        builder.build()
    }
}

/// Builder for [`HttpClientConfig`]
#[derive(Debug, Default)]
pub struct HttpClientConfigBuilder {
    config: HttpClientConfig,
}

impl HttpClientConfigBuilder {
    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    /// Set the bearer token
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.config.token = token.into();
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the pacing interval
    pub fn min_call_interval(mut self, interval: Duration) -> Self {
        self.config.min_call_interval = Some(interval);
        self
    }

    /// Disable client-side pacing
    pub fn no_pacing(mut self) -> Self {
        self.config.min_call_interval = None;
        self
    }

    /// Set the retry policy
    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.config.retry = policy;
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Build the config
    pub fn build(self) -> HttpClientConfig {
        self.config
    }
}

// ============================================================================
// Request / Response
// ============================================================================

/// A single logical API call
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// HTTP method
    pub method: Method,
    /// Path relative to the base URL, or an absolute URL
    pub path: String,
    /// Query parameters (keys may repeat)
    pub query: Vec<(String, String)>,
    /// JSON body
    pub body: Option<JsonValue>,
    /// Whether the client-side pacer applies
    pub paced: bool,
}

impl ApiRequest {
    /// GET request
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            query: Vec::new(),
            body: None,
            paced: true,
        }
    }

    /// POST request with a JSON body
    pub fn post(path: impl Into<String>, body: JsonValue) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
            paced: true,
        }
    }

    /// Add a query parameter
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Skip the client-side pacer for this call
    #[must_use]
    pub fn unpaced(mut self) -> Self {
        self.paced = false;
        self
    }
}

/// A successful (2xx) response with its body read
#[derive(Debug, Clone)]
pub struct ApiResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: HeaderMap,
    /// Raw body
    pub body: String,
}

impl ApiResponse {
    /// Build a response from parts
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Build a response carrying a JSON body
    pub fn json_body(value: &impl Serialize) -> Self {
        Self::new(200, serde_json::to_string(value).unwrap_or_default())
    }

    /// Decode the body into `T`
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body)
            .map_err(|e| Error::decode(format!("Invalid JSON response: {e}")))
    }
}

// ============================================================================
// Transport
// ============================================================================

/// Sends API calls; implemented by [`FrontClient`] and by test fakes
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one logical call, retrying as the implementation sees fit
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse>;
}

/// HTTP client for the Front API
pub struct FrontClient {
    client: Client,
    config: HttpClientConfig,
    budget: Mutex<RateBudget>,
    pacer: Option<CallPacer>,
}

impl FrontClient {
    /// Create a new client
    pub fn new(config: HttpClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        let pacer = config.min_call_interval.map(CallPacer::new);

        Ok(Self {
            client,
            config,
            budget: Mutex::new(RateBudget::new()),
            pacer,
        })
    }

    /// Create a client from the tap config
    pub fn from_tap_config(config: &TapConfig) -> Result<Self> {
        Self::new(HttpClientConfig::from_tap_config(config))
    }

    /// Current view of the server budget
    pub async fn budget(&self) -> RateBudget {
        *self.budget.lock().await
    }

    /// GET a path and decode the JSON body
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(ApiRequest::get(path)).await?.json()
    }

    /// Validate the token against `/me`
    pub async fn check_credentials(&self) -> Result<JsonValue> {
        let me: JsonValue = self.get_json("/me").await?;
        info!("Credentials valid");
        Ok(me)
    }

    async fn wait_for_budget(&self) {
        let wait = self
            .budget
            .lock()
            .await
            .wait_duration(Utc::now().timestamp());

        if let Some(wait) = wait {
            info!("Rate limit budget exhausted, sleeping {}s", wait.as_secs());
            tokio::time::sleep(wait).await;
        }
    }

    /// One attempt: send, refresh the budget, classify the status
    async fn send_once(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let url = self.build_url(&request.path);

        let mut req = self
            .client
            .request(request.method.into(), &url)
            .bearer_auth(&self.config.token)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json");

        if !request.query.is_empty() {
            req = req.query(&request.query);
        }

        if let Some(body) = &request.body {
            req = req.body(serde_json::to_string(body)?);
        }

        debug!("{} {}", request.method, url);

        let response = req
            .send()
            .await
            .map_err(|e| Error::transport(describe_transport_error(&e)))?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();

        // Budget is refreshed on every response, failures included
        self.budget.lock().await.update_from_headers(&headers);

        let body = response
            .text()
            .await
            .map_err(|e| Error::transport(describe_transport_error(&e)))?;

        match status {
            429 | 503 => Err(Error::RateLimited { status, body }),
            423 => Err(Error::MetricsThrottled { body }),
            s if !(200..300).contains(&s) => {
                error!("{} {} failed with HTTP {}: {}", request.method, url, s, body);
                Err(Error::http_status(s, body))
            }
            _ => Ok(ApiResponse {
                status,
                headers,
                body,
            }),
        }
    }

    /// Build full URL from path
    fn build_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }

        let base = self.config.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
    }
}

#[async_trait]
impl Transport for FrontClient {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let mut tracker = self.config.retry.tracker();

        loop {
            if request.paced {
                if let Some(pacer) = &self.pacer {
                    pacer.wait().await;
                }
            }

            self.wait_for_budget().await;

            match self.send_once(&request).await {
                Ok(response) => return Ok(response),
                Err(e) => match tracker.next_delay(&e) {
                    Some((rule, attempt, delay)) => {
                        warn!(
                            "{} {} {} (attempt {}), retrying in {:?}",
                            request.method, request.path, rule, attempt, delay
                        );
                        tokio::time::sleep(delay).await;
                    }
                    None => return Err(e),
                },
            }
        }
    }
}

impl std::fmt::Debug for FrontClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrontClient")
            .field("base_url", &self.config.base_url)
            .field("timeout", &self.config.timeout)
            .field("pacer", &self.pacer)
            .finish_non_exhaustive()
    }
}

fn describe_transport_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        format!("request timed out: {e}")
    } else if e.is_connect() {
        format!("connection failed: {e}")
    } else {
        e.to_string()
    }
}
