// Shared test helpers for mock API servers and fixtures.
//
// This module provides common utilities used across multiple test files to reduce duplication.

use std::time::Duration;

use metrika_inputs::api::{ApiClient, ServiceKind};
use metrika_inputs::error_handling::RetryPolicy;
use metrika_inputs::initialization::init_client;
use serde_json::{json, Value};
use wiremock::MockServer;

/// Retry policy with millisecond delays so retry tests stay fast.
#[allow(dead_code)]
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        min_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(20),
        max_retries: 3,
    }
}

/// API client pointed at the mock server.
#[allow(dead_code)]
pub fn mock_client(server: &MockServer, kind: ServiceKind, token: Option<&str>) -> ApiClient {
    ApiClient::new(
        init_client().expect("Failed to build HTTP client"),
        &server.uri(),
        kind,
        token.map(str::to_string),
    )
    .expect("Mock server URI is a valid base URL")
    .with_retry_policy(fast_retry())
}

/// A `log_request` envelope as returned by create/get/clean/cancel.
#[allow(dead_code)]
pub fn log_request_body(request_id: u64, status: &str, parts: u32) -> Value {
    let parts: Vec<Value> = (0..parts)
        .map(|n| json!({"part_number": n, "size": 128}))
        .collect();
    json!({
        "log_request": {
            "request_id": request_id,
            "counter_id": 42,
            "source": "visits",
            "date1": "2024-01-01",
            "date2": "2024-01-07",
            "fields": ["ym:s:visitID", "ym:s:watchIDs"],
            "status": status,
            "size": 128 * parts.len(),
            "parts": parts
        }
    })
}

/// An error body in the API's format.
#[allow(dead_code)]
pub fn api_error_body(code: u16, message: &str) -> Value {
    json!({
        "code": code,
        "message": message,
        "errors": [{"error_type": "invalid_parameter", "message": message, "location": "date1"}]
    })
}
