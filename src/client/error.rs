//! Error types for the resilient client.

use thiserror::Error;

/// Errors returned by a [`BookClient`](super::BookClient) fetch.
///
/// A non-2xx response is *not* an error at the transport level: it is a
/// successful fetch carrying its status code, so retry conditions can match
/// on it. [`FetchError::HttpStatus`] only appears once
/// [`ResilientClient::get_html`](super::ResilientClient::get_html) has given
/// up on a remaining bad status.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Request timed out before a response arrived.
    #[error("timeout fetching {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// Connection-level failure (DNS, refused, TLS, reset).
    #[error("network error fetching {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The circuit breaker is open; the request never reached the network.
    #[error("circuit open, not fetching {url}")]
    CircuitOpen {
        /// The URL that was rejected.
        url: String,
    },

    /// Final response carried a non-success status.
    #[error("HTTP {status} fetching {url}")]
    HttpStatus {
        /// The URL that returned the status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// Response body could not be decoded with the configured charset.
    #[error("failed to decode body of {url}: {source}")]
    Decode {
        /// The URL whose body failed to decode.
        url: String,
        /// The underlying decode error.
        #[source]
        source: reqwest::Error,
    },

    /// The concurrency gate was closed.
    #[error("request gate closed")]
    GateClosed,

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Builder(#[source] reqwest::Error),
}

impl FetchError {
    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates a circuit-open error.
    pub fn circuit_open(url: impl Into<String>) -> Self {
        Self::CircuitOpen { url: url.into() }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a decode error.
    pub fn decode(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Decode {
            url: url.into(),
            source,
        }
    }

    /// Classifies a reqwest error raised while sending a request.
    pub fn from_send(url: impl Into<String>, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::timeout(url)
        } else {
            Self::network(url, source)
        }
    }

    /// Returns true for errors produced by the circuit breaker.
    #[must_use]
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, Self::CircuitOpen { .. })
    }
}
