//! Circuit breaker layer.
//!
//! ```text
//!   Closed --(threshold consecutive failures)--> Open
//!   Open   --(cooldown elapsed, next call)-----> HalfOpen (single probe)
//!   HalfOpen --probe ok--> Closed
//!   HalfOpen --probe failed or dropped--> Open (cooldown restarts)
//! ```
//!
//! Failures are transport errors and responses whose status is listed in
//! [`BreakerConfig::failure_statuses`]. Everything else resets the counter.
//! The half-open probe holds the circuit until it reports back, however
//! long it takes.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::constants::{DEFAULT_COOLDOWN_SECS, DEFAULT_FAILURE_STATUSES, DEFAULT_FAILURE_THRESHOLD};
use super::{BookClient, FetchError, FetchResponse};

/// Breaker tuning.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Consecutive failures that open the circuit.
    pub failure_threshold: u32,
    /// How long the circuit stays open before a probe is allowed.
    pub cooldown_secs: u64,
    /// Response statuses that count as failures.
    pub failure_statuses: Vec<u16>,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            cooldown_secs: DEFAULT_COOLDOWN_SECS,
            failure_statuses: DEFAULT_FAILURE_STATUSES.to_vec(),
        }
    }
}

impl BreakerConfig {
    /// Cooldown as a [`Duration`].
    #[must_use]
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
}

/// Observable breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Copy)]
enum State {
    Closed { failures: u32 },
    Open { until: Instant },
    HalfOpen,
}

/// Client layer that fails fast while the upstream looks down.
pub struct CircuitBreakerClient {
    inner: Arc<dyn BookClient>,
    config: BreakerConfig,
    state: Mutex<State>,
}

impl CircuitBreakerClient {
    #[must_use]
    pub fn new(inner: Arc<dyn BookClient>, config: BreakerConfig) -> Self {
        Self {
            inner,
            config,
            state: Mutex::new(State::Closed { failures: 0 }),
        }
    }

    /// Current state, for diagnostics and tests.
    #[must_use]
    pub fn state(&self) -> CircuitState {
        match *self.lock() {
            State::Closed { .. } => CircuitState::Closed,
            State::Open { .. } => CircuitState::Open,
            State::HalfOpen => CircuitState::HalfOpen,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Decides whether a call may proceed. Returns `Some(is_probe)` when
    /// admitted.
    fn admit(&self) -> Option<bool> {
        let now = Instant::now();
        let mut state = self.lock();
        match *state {
            State::Closed { .. } => Some(false),
            State::Open { until } if now >= until => {
                debug!("circuit half-open, admitting probe");
                *state = State::HalfOpen;
                Some(true)
            }
            State::Open { .. } | State::HalfOpen => None,
        }
    }

    fn is_failure(&self, result: &Result<FetchResponse, FetchError>) -> bool {
        match result {
            Ok(response) => self.config.failure_statuses.contains(&response.status),
            Err(_) => true,
        }
    }

    fn record(&self, failed: bool, probe: bool) {
        let now = Instant::now();
        let mut state = self.lock();
        match (*state, probe) {
            (State::HalfOpen, true) => {
                if failed {
                    warn!(cooldown_secs = self.config.cooldown_secs, "probe failed, circuit reopened");
                    *state = State::Open {
                        until: now + self.config.cooldown(),
                    };
                } else {
                    info!("probe succeeded, circuit closed");
                    *state = State::Closed { failures: 0 };
                }
            }
            (State::Closed { failures }, false) => {
                if !failed {
                    *state = State::Closed { failures: 0 };
                    return;
                }
                let failures = failures + 1;
                if failures >= self.config.failure_threshold {
                    warn!(
                        failures,
                        cooldown_secs = self.config.cooldown_secs,
                        "circuit opened"
                    );
                    *state = State::Open {
                        until: now + self.config.cooldown(),
                    };
                } else {
                    *state = State::Closed { failures };
                }
            }
            // Calls admitted before the circuit changed state report late.
            _ => {}
        }
    }
}

/// Reopens the circuit if a half-open probe is dropped before it reports.
struct ProbeGuard<'a> {
    breaker: &'a CircuitBreakerClient,
    armed: bool,
}

impl Drop for ProbeGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.breaker.lock();
        if matches!(*state, State::HalfOpen) {
            warn!("probe cancelled, circuit reopened");
            *state = State::Open {
                until: Instant::now() + self.breaker.config.cooldown(),
            };
        }
    }
}

#[async_trait]
impl BookClient for CircuitBreakerClient {
    async fn fetch(&self, url: &str) -> Result<FetchResponse, FetchError> {
        let Some(probe) = self.admit() else {
            debug!(url, "circuit open, failing fast");
            return Err(FetchError::circuit_open(url));
        };

        let mut guard = ProbeGuard {
            breaker: self,
            armed: probe,
        };
        let result = self.inner.fetch(url).await;
        guard.armed = false;
        self.record(self.is_failure(&result), probe);
        result
    }
}
