//! Configuration constants.
//!
//! This module defines the constants used throughout the crate: API hosts,
//! retry bounds, paging and polling parameters.

use std::time::Duration;

/// Base host of the Yandex Metrika API.
pub const METRIKA_API_HOST: &str = "https://api-metrika.yandex.com";

/// Base host of the Yandex AppMetrica API.
pub const APPMETRICA_API_HOST: &str = "https://api.appmetrica.yandex.ru";

/// API version used for every service.
pub const API_VERSION: &str = "v1";

/// Per-request timeout in seconds.
///
/// Part downloads can be large, so this is considerably longer than a typical
/// JSON call needs.
pub const HTTP_TIMEOUT_SECS: u64 = 300;

/// User-Agent sent with every request.
pub const DEFAULT_USER_AGENT: &str = concat!("metrika_inputs/", env!("CARGO_PKG_VERSION"));

// Retry strategy
/// Minimum delay between retries in milliseconds.
pub const RETRY_MIN_DELAY_MS: u64 = 1000;
/// Maximum delay between retries in seconds.
pub const RETRY_MAX_DELAY_SECS: u64 = 5;
/// Number of retries after the initial attempt.
///
/// Only transport failures and 429 responses are retried.
pub const RETRY_MAX_RETRIES: usize = 3;

// Log request polling
/// Interval between log request status checks.
pub const LOG_REQUEST_POLL_INTERVAL: Duration = Duration::from_secs(10);
/// Upper bound on how long `connect` waits for a log request to be processed.
pub const LOG_REQUEST_MAX_WAIT: Duration = Duration::from_secs(6 * 60 * 60);

// Stat table paging
/// Rows requested per page from the stat table endpoint (API maximum is 100000).
pub const STAT_TABLE_PAGE_LIMIT: u32 = 1000;

// Date expression defaults
/// Default start of the sample period.
pub const DEFAULT_DATE1: &str = "6daysAgo";
/// Default end of the sample period.
pub const DEFAULT_DATE2: &str = "today";

// HTTP status codes
pub const HTTP_STATUS_TOO_MANY_REQUESTS: u16 = 429;
