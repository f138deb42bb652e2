//! Resilient request client
//!
//! This module handles every HTTP request the crawler makes:
//! - Building HTTP clients carrying the portal's session cookies and headers
//! - Sending GETs and form POSTs
//! - Retrying transient failures with linear backoff
//! - Holding a concurrency permit for each attempt, when a limiter is attached
//!
//! It is the only place where transient failure is absorbed. A request that still
//! fails after its retry budget yields no body instead of an error, so callers
//! have a single "no data" shape to handle.

use crate::config::{CrawlerConfig, PortalConfig};
use crate::crawler::limiter::ConcurrencyLimiter;
use crate::{ConfigError, HarvestError};
use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Retry budget and backoff schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per request (at least one)
    pub budget: u32,

    /// Attempt `n` failing waits `n * backoff_unit`
    pub backoff_unit: Duration,
}

impl RetryPolicy {
    pub fn new(budget: u32, backoff_unit: Duration) -> Self {
        Self {
            budget: budget.max(1),
            backoff_unit,
        }
    }

    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self::new(config.retry_budget, config.backoff_unit())
    }

    /// Delay after failed attempt `attempt` (1-based)
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff_unit * attempt
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

/// A single portal request
#[derive(Debug, Clone)]
pub enum PortalRequest {
    /// GET with a fully resolved URL (query included)
    Get { url: Url, label: String },

    /// Form-encoded POST
    PostForm {
        url: Url,
        form: Vec<(String, String)>,
        label: String,
    },
}

impl PortalRequest {
    pub fn get(url: Url, label: impl Into<String>) -> Self {
        Self::Get {
            url,
            label: label.into(),
        }
    }

    pub fn post_form(url: Url, form: Vec<(String, String)>, label: impl Into<String>) -> Self {
        Self::PostForm {
            url,
            form,
            label: label.into(),
        }
    }

    /// Human-readable description used in log lines
    pub fn label(&self) -> &str {
        match self {
            Self::Get { label, .. } | Self::PostForm { label, .. } => label,
        }
    }

    pub fn url(&self) -> &Url {
        match self {
            Self::Get { url, .. } | Self::PostForm { url, .. } => url,
        }
    }
}

/// Outcome of a request after retries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReport {
    /// Response body, or `None` if every attempt failed
    pub body: Option<String>,

    /// Attempts made
    pub attempts: u32,

    /// Delays waited between attempts, in order
    pub backoffs: Vec<Duration>,
}

impl SendReport {
    /// True if the retry budget ran out without a successful response
    pub fn is_exhausted(&self) -> bool {
        self.body.is_none()
    }
}

/// Why a single attempt failed
#[derive(Debug, Error)]
enum AttemptError {
    #[error("HTTP {0}")]
    Status(u16),

    #[error("request timeout")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("failed to read body: {0}")]
    Body(String),

    #[error("concurrency limiter closed")]
    Limiter,
}

impl From<reqwest::Error> for AttemptError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            AttemptError::Timeout
        } else if e.is_connect() {
            AttemptError::Connect(e.to_string())
        } else {
            AttemptError::Request(e.to_string())
        }
    }
}

/// Builds the HTTP client for one portal
///
/// The client carries the crawler's user agent and timeouts, the portal's extra
/// headers, and a cookie jar seeded with the portal's session cookies. Cookies the
/// portal sets during the session land in the same jar.
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(HarvestError)` - A header or the base URL is invalid, or the client failed to build
pub fn build_http_client(crawler: &CrawlerConfig, portal: &PortalConfig) -> Result<Client, HarvestError> {
    let base_url = Url::parse(&portal.base_url)?;

    let mut headers = HeaderMap::new();
    for (name, value) in &portal.headers {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            ConfigError::Validation(format!("invalid header name '{}': {}", name, e))
        })?;
        let value = HeaderValue::from_str(value).map_err(|e| {
            ConfigError::Validation(format!("invalid value for header '{}': {}", name.as_str(), e))
        })?;
        headers.insert(name, value);
    }

    let jar = Arc::new(Jar::default());
    for (name, value) in &portal.cookies {
        jar.add_cookie_str(&format!("{}={}", name, value), &base_url);
    }

    let client = Client::builder()
        .user_agent(crawler.user_agent.as_str())
        .default_headers(headers)
        .cookie_provider(jar)
        .timeout(crawler.request_timeout())
        .connect_timeout(crawler.connect_timeout())
        .gzip(true)
        .brotli(true)
        .build()?;

    Ok(client)
}

/// HTTP client wrapper with retries and an optional concurrency limiter
#[derive(Debug, Clone)]
pub struct RequestClient {
    client: Client,
    policy: RetryPolicy,
    limiter: Option<Arc<ConcurrencyLimiter>>,
}

impl RequestClient {
    pub fn new(client: Client, policy: RetryPolicy) -> Self {
        Self {
            client,
            policy,
            limiter: None,
        }
    }

    /// Makes every attempt hold a permit of `limiter`
    pub fn with_limiter(mut self, limiter: Arc<ConcurrencyLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Sends a request and returns its body, or an empty string if every attempt failed
    pub async fn send(&self, request: &PortalRequest) -> String {
        self.send_with_report(request).await.body.unwrap_or_default()
    }

    /// Sends a request, retrying non-success statuses and transport errors
    ///
    /// # Retry Logic
    ///
    /// | Attempt fails | Action |
    /// |---------------|--------|
    /// | attempt n < budget | wait n backoff units, retry |
    /// | attempt n == budget | give up, `body: None` |
    ///
    /// Never returns an error.
    pub async fn send_with_report(&self, request: &PortalRequest) -> SendReport {
        let budget = self.policy.budget.max(1);
        let mut backoffs = Vec::new();

        for attempt in 1..=budget {
            match self.attempt(request).await {
                Ok(body) => {
                    tracing::trace!("{}: {} bytes on attempt {}", request.label(), body.len(), attempt);
                    return SendReport {
                        body: Some(body),
                        attempts: attempt,
                        backoffs,
                    };
                }
                Err(e) if attempt < budget => {
                    let delay = self.policy.backoff_for(attempt);
                    tracing::warn!(
                        "{}: {}. Retrying in {:?} ({}/{})",
                        request.label(),
                        e,
                        delay,
                        attempt,
                        budget
                    );
                    tokio::time::sleep(delay).await;
                    backoffs.push(delay);
                }
                Err(e) => {
                    tracing::error!(
                        "{}: {}. Giving up after {} attempts",
                        request.label(),
                        e,
                        budget
                    );
                }
            }
        }

        SendReport {
            body: None,
            attempts: budget,
            backoffs,
        }
    }

    /// One attempt, holding a limiter permit for its duration
    async fn attempt(&self, request: &PortalRequest) -> Result<String, AttemptError> {
        let _permit = match &self.limiter {
            Some(limiter) => Some(limiter.acquire().await.map_err(|_| AttemptError::Limiter)?),
            None => None,
        };

        let builder = match request {
            PortalRequest::Get { url, .. } => self.client.get(url.clone()),
            PortalRequest::PostForm { url, form, .. } => self.client.post(url.clone()).form(form),
        };

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AttemptError::Status(status.as_u16()));
        }

        response
            .text()
            .await
            .map_err(|e| AttemptError::Body(e.to_string()))
    }
}
