//! Error handling and retry configuration.
//!
//! This module provides:
//! - Error type definitions for every layer (API body, client, input lifecycle, config)
//! - Retry strategy configuration for the API client
//!
//! Client errors are categorized into:
//! - **Retriable**: transport failures and HTTP 429
//! - **Surfaced immediately**: decoded API errors, unrecognized responses, decode failures

mod categorization;
mod types;

// Re-export public API
pub use categorization::{get_retry_strategy, RetryPolicy};
pub use types::{
    ApiError, ApiErrorReason, ClientError, ConfigError, DateParseError, InitializationError,
    InputError,
};
