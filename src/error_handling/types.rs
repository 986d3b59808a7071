//! Error type definitions.
//!
//! This module defines all error types used throughout the crate, from the
//! decoded vendor error body up to the lifecycle errors returned to the host.

use log::SetLoggerError;
use reqwest::Error as ReqwestError;
use serde::Deserialize;
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error initializing the HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClientError(#[from] ReqwestError),

    /// The API base URL could not be parsed.
    #[error("Invalid API base URL {url:?}: {source}")]
    BaseUrlError {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

/// Error object returned by the Metrika and AppMetrica APIs.
///
/// Body shape: `{"code": 400, "message": "...", "errors": [{"error_type": ..., "message": ..., "location": ...}]}`.
#[derive(Error, Debug, Clone, PartialEq, Deserialize)]
#[error("Yandex.Metrika API error {code}: {message}")]
pub struct ApiError {
    /// HTTP-like error code echoed by the API.
    pub code: u16,
    /// Human-readable error message.
    pub message: String,
    /// Detailed reasons, possibly empty.
    #[serde(default, rename = "errors")]
    pub reasons: Vec<ApiErrorReason>,
}

/// A single entry of [`ApiError::reasons`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApiErrorReason {
    #[serde(default)]
    pub error_type: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub location: Option<String>,
}

/// Errors produced by [`crate::api::ApiClient`].
#[derive(Error, Debug)]
pub enum ClientError {
    /// Network-level failure (connect, timeout, broken body).
    #[error("Transport error calling {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: ReqwestError,
    },

    /// HTTP 429 that persisted through every retry.
    #[error("Rate limited (HTTP 429) by {url}")]
    RateLimited { url: String },

    /// A non-2xx response carrying a well-formed API error body.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// A non-2xx response without a parseable error body.
    #[error("Yandex.Metrika API unknown error: {status} from {url}\nraw content:\n{body}")]
    Unrecognized {
        status: u16,
        url: String,
        body: String,
    },

    /// A 2xx response whose body did not match the expected shape.
    #[error("Failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// A resource path could not be joined onto the base URL.
    #[error("Invalid request URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The caller's cancellation token fired while the request was in flight.
    #[error("Request cancelled")]
    Cancelled,
}

impl ClientError {
    /// Whether the request that produced this error should be attempted again.
    ///
    /// Only transient transport failures and rate limiting qualify; decoded API
    /// errors and unrecognized responses surface immediately.
    pub fn is_retriable(&self) -> bool {
        match self {
            ClientError::Transport { source, .. } => {
                source.is_timeout() || source.is_connect() || source.is_request()
            }
            ClientError::RateLimited { .. } => true,
            _ => false,
        }
    }

    /// The decoded API error, if this is one.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            ClientError::Api(e) => Some(e),
            _ => None,
        }
    }
}

/// Errors returned from the input lifecycle to the host.
#[derive(Error, Debug)]
pub enum InputError {
    /// Canonical "no more input" signal.
    #[error("End of input")]
    EndOfInput,

    /// A downloaded log part could not be decoded; the transfer is truncated or corrupt.
    #[error("Failed to decode log part {part}: {source}")]
    Decode {
        part: u32,
        #[source]
        source: csv::Error,
    },

    /// An API call failed where the failure must reach the host (cleanup on close).
    #[error(transparent)]
    Client(#[from] ClientError),
}

impl InputError {
    pub fn is_end_of_input(&self) -> bool {
        matches!(self, InputError::EndOfInput)
    }
}

/// Configuration validation error, naming the offending field.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Invalid configuration field `{field}`: {message}")]
pub struct ConfigError {
    pub field: String,
    pub message: String,
}

impl ConfigError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Errors from resolving date expressions.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DateParseError {
    #[error("cannot parse {0:?}: invalid daysago format (NdaysAgo)")]
    InvalidDaysAgo(String),

    #[error("cannot parse {0:?}: invalid date format (YYYY-MM-DD)")]
    InvalidDate(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_decodes_full_body() {
        let body = r#"{
            "code": 400,
            "message": "Invalid parameter",
            "errors": [
                {"error_type": "invalid_parameter", "message": "Wrong date1", "location": "date1"}
            ]
        }"#;
        let err: ApiError = serde_json::from_str(body).unwrap();
        assert_eq!(err.code, 400);
        assert_eq!(err.message, "Invalid parameter");
        assert_eq!(err.reasons.len(), 1);
        assert_eq!(err.reasons[0].error_type, "invalid_parameter");
        assert_eq!(err.reasons[0].location.as_deref(), Some("date1"));
    }

    #[test]
    fn test_api_error_without_reasons() {
        let err: ApiError =
            serde_json::from_str(r#"{"message": "Something went wrong", "code": 1}"#).unwrap();
        assert_eq!(err.code, 1);
        assert!(err.reasons.is_empty());
        assert_eq!(
            err.to_string(),
            "Yandex.Metrika API error 1: Something went wrong"
        );
    }

    #[test]
    fn test_api_error_rejects_foreign_body() {
        assert!(serde_json::from_str::<ApiError>(r#"{"status": "oops"}"#).is_err());
    }

    #[test]
    fn test_client_error_retriability() {
        let rate_limited = ClientError::RateLimited {
            url: "https://example.invalid/data".to_string(),
        };
        assert!(rate_limited.is_retriable());

        let api = ClientError::Api(ApiError {
            code: 403,
            message: "Access denied".to_string(),
            reasons: vec![],
        });
        assert!(!api.is_retriable());
        assert_eq!(api.api_error().map(|e| e.code), Some(403));

        let unknown = ClientError::Unrecognized {
            status: 502,
            url: "https://example.invalid/data".to_string(),
            body: "<html>".to_string(),
        };
        assert!(!unknown.is_retriable());
        assert!(unknown.to_string().contains("raw content:\n<html>"));

        assert!(!ClientError::Cancelled.is_retriable());
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::new("metrics", "must not be empty");
        assert_eq!(
            err.to_string(),
            "Invalid configuration field `metrics`: must not be empty"
        );
    }

    #[test]
    fn test_date_parse_error_messages() {
        assert!(DateParseError::InvalidDaysAgo("xxdaysago".into())
            .to_string()
            .contains("invalid daysago format"));
        assert!(DateParseError::InvalidDate(String::new())
            .to_string()
            .contains("invalid date format"));
    }
}
