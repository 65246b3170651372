//! Shared constants and invariants

/// Path appended to the provider base URI for token requests.
pub const TOKEN_ENDPOINT_PATH: &str = "/oauth/token";

/// Forced-refresh retries granted to one client call.
/// Bounds authenticated dispatches per call to `1 + AUTH_RETRY_ATTEMPTS`.
pub const AUTH_RETRY_ATTEMPTS: u32 = 1;

pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 2000;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_METRICS_PATH: &str = "/metrics";
pub const DEFAULT_LOG_LEVEL: &str = "info";

pub const JSON_CONTENT_TYPE: &str = "application/json";

// Allowed log levels
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
