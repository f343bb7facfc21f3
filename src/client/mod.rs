//! Resilient HTTP client for catalog sites.
//!
//! The client is a chain of decorators, each implementing [`BookClient`] and
//! owning the next layer:
//!
//! ```text
//! WeightedRetryClient -> GatedClient -> CircuitBreakerClient -> HttpTransport
//! ```
//!
//! - [`HttpTransport`] issues one GET; any status is a successful fetch
//! - [`GatedClient`] bounds in-flight requests per site
//! - [`CircuitBreakerClient`] fails fast while the upstream keeps failing
//! - [`WeightedRetryClient`] retries matching outcomes within a weight budget
//!
//! Retry is outermost, so a `CircuitOpen` rejection can itself be retried
//! (bounded by the budget), and backoff sleeps never hold a gate slot. The
//! breaker sits inside the gate: a call queued for a slot is admitted only
//! once it holds one, so calls waiting when the circuit opens fail fast.
//!
//! # Example
//!
//! ```no_run
//! use novelcrawl_core::client::{ClientConfig, ResilientClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ResilientClient::new(&ClientConfig::default())?;
//! let html = client.get_html("https://example.com/book/1").await?;
//! println!("{} bytes", html.len());
//! # Ok(())
//! # }
//! ```

mod circuit_breaker;
mod constants;
mod error;
mod gate;
mod retry;
mod transport;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

pub use circuit_breaker::{BreakerConfig, CircuitBreakerClient, CircuitState};
pub use constants::{DEFAULT_CHARSET, DEFAULT_MAX_CONCURRENCY, DEFAULT_TIMEOUT_SECS};
pub use error::FetchError;
pub use gate::GatedClient;
pub use retry::{PauseShape, RetryClientConfig, RetryCondition, RetryKind, WeightedRetryClient};
pub use transport::HttpTransport;

/// Result of one fetch: the status code and decoded body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// True for 2xx statuses.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One narrow capability shared by every client layer.
#[async_trait]
pub trait BookClient: Send + Sync {
    /// Fetches `url`, returning the response or a transport-level error.
    async fn fetch(&self, url: &str) -> Result<FetchResponse, FetchError>;
}

/// Per-site client options.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Whole-request timeout in seconds.
    pub timeout_secs: u64,
    /// Fallback charset for bodies that do not declare one.
    pub charset: String,
    /// Concurrency gate size.
    pub max_concurrency: usize,
    pub circuit_breaker: BreakerConfig,
    pub retry: RetryClientConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            charset: DEFAULT_CHARSET.to_string(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            circuit_breaker: BreakerConfig::default(),
            retry: RetryClientConfig::default(),
        }
    }
}

impl ClientConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// The fully composed client used by the lifecycle engine.
#[derive(Clone)]
pub struct ResilientClient {
    chain: Arc<dyn BookClient>,
}

impl std::fmt::Debug for ResilientClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilientClient").finish_non_exhaustive()
    }
}

impl ResilientClient {
    /// Builds the full chain over a real HTTP transport.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Builder`] if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, FetchError> {
        let transport = HttpTransport::new(config.timeout(), config.charset.clone())?;
        Ok(Self::with_transport(Arc::new(transport), config))
    }

    /// Builds the chain over an arbitrary innermost layer.
    #[must_use]
    pub fn with_transport(transport: Arc<dyn BookClient>, config: &ClientConfig) -> Self {
        let breaker: Arc<dyn BookClient> = Arc::new(CircuitBreakerClient::new(
            transport,
            config.circuit_breaker.clone(),
        ));
        let gated: Arc<dyn BookClient> =
            Arc::new(GatedClient::new(breaker, config.max_concurrency));
        let retry = WeightedRetryClient::new(gated, config.retry.clone());

        debug!(
            max_concurrency = config.max_concurrency,
            failure_threshold = config.circuit_breaker.failure_threshold,
            max_retry_weight = config.retry.max_retry_weight,
            conditions = config.retry.conditions.len(),
            "built resilient client"
        );

        Self {
            chain: Arc::new(retry),
        }
    }

    /// Fetches a page and returns its body, treating a non-2xx final status
    /// as an error.
    ///
    /// # Errors
    ///
    /// Returns the chain's [`FetchError`], or [`FetchError::HttpStatus`] when
    /// the final response was not successful.
    pub async fn get_html(&self, url: &str) -> Result<String, FetchError> {
        let response = self.chain.fetch(url).await?;
        if !response.is_success() {
            return Err(FetchError::http_status(url, response.status));
        }
        Ok(response.body)
    }
}

#[async_trait]
impl BookClient for ResilientClient {
    async fn fetch(&self, url: &str) -> Result<FetchResponse, FetchError> {
        self.chain.fetch(url).await
    }
}
