//! HTTP client initialization.
//!
//! This module provides functions to initialize the `reqwest` client shared by
//! the API services of one input.

use std::time::Duration;

use reqwest::ClientBuilder;

use crate::config::{DEFAULT_USER_AGENT, HTTP_TIMEOUT_SECS};

/// Initializes the HTTP client with default settings.
///
/// Creates a `reqwest::Client` configured with:
/// - The crate User-Agent
/// - A request timeout of `HTTP_TIMEOUT_SECS` (part downloads can be large)
///
/// # Errors
///
/// Returns a `reqwest::Error` if client creation fails.
pub fn init_client() -> Result<reqwest::Client, reqwest::Error> {
    init_client_with_timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
}

/// Initializes the HTTP client with an explicit per-request timeout.
///
/// # Arguments
///
/// * `timeout` - Total time allowed for one request, body included
///
/// # Errors
///
/// Returns a `reqwest::Error` if client creation fails.
pub fn init_client_with_timeout(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    ClientBuilder::new()
        .timeout(timeout)
        .user_agent(DEFAULT_USER_AGENT)
        .build()
}
