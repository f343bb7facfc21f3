//! Weighted multi-condition retry.
//!
//! Each [`RetryCondition`] names an outcome class, the weight one retry of
//! that class costs, and how long to pause before the next attempt. On every
//! attempt only the *first* matching condition (in configured order)
//! contributes weight and pause. The loop keeps going while the spent weight
//! is below [`RetryClientConfig::max_retry_weight`]:
//!
//! ```text
//! spent = 0; attempt = 0
//! while spent < max_retry_weight:
//!     result = inner.fetch(url)
//!     matched = first condition matching result, else return result
//!     spent += matched.weight
//!     sleep(matched.pause_for(attempt)); attempt += 1
//! return last result
//! ```
//!
//! The budget is checked before an attempt, so the final spent weight may
//! exceed the budget by at most one condition's weight.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::constants::DEFAULT_MAX_RETRY_WEIGHT;
use super::{BookClient, FetchError, FetchResponse};

/// Outcome class a condition matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryKind {
    /// A response (no error) whose status is in `codes`.
    StatusCode,
    /// Any fetch error, including a circuit-open rejection.
    TransportError,
    /// A response whose body contains `text` (soft-failure pages).
    BodyContains,
}

/// Backoff shape applied to a condition's pause base.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PauseShape {
    #[default]
    Const,
    Linear,
    Exponential,
}

/// One retry rule.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RetryCondition {
    pub kind: RetryKind,
    /// Status codes for [`RetryKind::StatusCode`].
    #[serde(default)]
    pub codes: Vec<u16>,
    /// Substring for [`RetryKind::BodyContains`].
    #[serde(default)]
    pub text: String,
    #[serde(default = "default_weight")]
    pub weight: u32,
    #[serde(default = "default_pause_base_secs")]
    pub pause_base_secs: u64,
    #[serde(default)]
    pub pause_shape: PauseShape,
}

fn default_weight() -> u32 {
    1
}

fn default_pause_base_secs() -> u64 {
    1
}

impl RetryCondition {
    /// Retries on any fetch error.
    #[must_use]
    pub fn transport_error(weight: u32, pause_base_secs: u64, pause_shape: PauseShape) -> Self {
        Self {
            kind: RetryKind::TransportError,
            codes: Vec::new(),
            text: String::new(),
            weight,
            pause_base_secs,
            pause_shape,
        }
    }

    /// Retries on responses with one of `codes`.
    #[must_use]
    pub fn status_code(
        codes: impl Into<Vec<u16>>,
        weight: u32,
        pause_base_secs: u64,
        pause_shape: PauseShape,
    ) -> Self {
        Self {
            kind: RetryKind::StatusCode,
            codes: codes.into(),
            ..Self::transport_error(weight, pause_base_secs, pause_shape)
        }
    }

    /// Retries on responses whose body contains `text`.
    #[must_use]
    pub fn body_contains(
        text: impl Into<String>,
        weight: u32,
        pause_base_secs: u64,
        pause_shape: PauseShape,
    ) -> Self {
        Self {
            kind: RetryKind::BodyContains,
            text: text.into(),
            ..Self::transport_error(weight, pause_base_secs, pause_shape)
        }
    }

    /// Whether this condition wants a retry for `result`.
    #[must_use]
    pub fn matches(&self, result: &Result<FetchResponse, FetchError>) -> bool {
        match (self.kind, result) {
            (RetryKind::TransportError, Err(_)) => true,
            (RetryKind::StatusCode, Ok(response)) => self.codes.contains(&response.status),
            (RetryKind::BodyContains, Ok(response)) => {
                !self.text.is_empty() && response.body.contains(&self.text)
            }
            _ => false,
        }
    }

    /// Pause before the attempt following the zero-based `attempt`.
    #[must_use]
    pub fn pause_for(&self, attempt: u32) -> Duration {
        let base = Duration::from_secs(self.pause_base_secs);
        match self.pause_shape {
            PauseShape::Const => base,
            PauseShape::Linear => base.saturating_mul(attempt.saturating_add(1)),
            PauseShape::Exponential => base.saturating_mul(2u32.saturating_pow(attempt)),
        }
    }
}

/// Ordered retry conditions plus the weight budget.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetryClientConfig {
    pub max_retry_weight: u32,
    pub conditions: Vec<RetryCondition>,
}

impl Default for RetryClientConfig {
    fn default() -> Self {
        Self {
            max_retry_weight: DEFAULT_MAX_RETRY_WEIGHT,
            conditions: vec![
                RetryCondition::transport_error(2, 1, PauseShape::Exponential),
                RetryCondition::status_code([429, 500, 502, 503, 504], 1, 1, PauseShape::Linear),
            ],
        }
    }
}

impl RetryClientConfig {
    /// First condition, in configured order, that matches `result`.
    #[must_use]
    pub fn first_match(&self, result: &Result<FetchResponse, FetchError>) -> Option<&RetryCondition> {
        self.conditions.iter().find(|condition| condition.matches(result))
    }
}

/// Outermost client layer: retries within a weight budget.
pub struct WeightedRetryClient {
    inner: Arc<dyn BookClient>,
    config: RetryClientConfig,
}

impl WeightedRetryClient {
    #[must_use]
    pub fn new(inner: Arc<dyn BookClient>, config: RetryClientConfig) -> Self {
        Self { inner, config }
    }

    #[must_use]
    pub fn config(&self) -> &RetryClientConfig {
        &self.config
    }
}

#[async_trait]
impl BookClient for WeightedRetryClient {
    #[instrument(level = "debug", skip(self), fields(max_retry_weight = self.config.max_retry_weight))]
    async fn fetch(&self, url: &str) -> Result<FetchResponse, FetchError> {
        let mut spent: u32 = 0;
        let mut attempt: u32 = 0;
        let mut last = None;

        while spent < self.config.max_retry_weight {
            let result = self.inner.fetch(url).await;
            let Some(condition) = self.config.first_match(&result) else {
                return result;
            };

            spent = spent.saturating_add(condition.weight.max(1));
            let pause = condition.pause_for(attempt);
            debug!(
                attempt,
                spent,
                kind = ?condition.kind,
                pause_ms = pause.as_millis(),
                "retry condition matched"
            );
            tokio::time::sleep(pause).await;

            attempt += 1;
            last = Some(result);
        }

        match last {
            Some(result) => result,
            None => self.inner.fetch(url).await,
        }
    }
}
