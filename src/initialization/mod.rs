//! Shared resource setup.
//!
//! This module provides functions to initialize:
//! - The process-wide logger (plain or JSON lines)
//! - The HTTP client every API client wraps
//!
//! All initialization functions return proper error types for error handling.

mod client;
mod logger;

// Re-export public API
pub use client::{init_client, init_client_with_timeout};
pub use logger::init_logger_with;
