//! Defaults for the resilient client.

/// HTTP connect timeout cap (10 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default whole-request timeout (30 seconds).
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default fallback charset for response bodies.
pub const DEFAULT_CHARSET: &str = "utf-8";

/// Default number of in-flight requests per site.
pub const DEFAULT_MAX_CONCURRENCY: usize = 10;

/// Default consecutive failures before the breaker opens.
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 5;

/// Default time the breaker stays open (30 seconds).
pub const DEFAULT_COOLDOWN_SECS: u64 = 30;

/// Default statuses that count as breaker failures.
pub const DEFAULT_FAILURE_STATUSES: [u16; 4] = [500, 502, 503, 504];

/// Default retry weight budget.
pub const DEFAULT_MAX_RETRY_WEIGHT: u32 = 10;
