//! Retry strategy configuration.
//!
//! This module provides the backoff schedule the API client applies to
//! retriable failures.

use std::time::Duration;
use tokio_retry::strategy::ExponentialBackoff;

use crate::config::{RETRY_MAX_DELAY_SECS, RETRY_MAX_RETRIES, RETRY_MIN_DELAY_MS};

/// Bounds for retrying transport failures and 429 responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay before the first retry.
    pub min_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Retries after the initial attempt.
    pub max_retries: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            min_delay: Duration::from_millis(RETRY_MIN_DELAY_MS),
            max_delay: Duration::from_secs(RETRY_MAX_DELAY_SECS),
            max_retries: RETRY_MAX_RETRIES,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        RetryPolicy {
            max_retries: 0,
            ..Default::default()
        }
    }
}

/// Creates an exponential backoff retry strategy.
///
/// Returns a retry strategy configured with:
/// - First delay: `policy.min_delay`
/// - Backoff factor: 2 (doubles delay each retry)
/// - Maximum delay: `policy.max_delay`
/// - Maximum retries: `policy.max_retries`
///
/// # Returns
///
/// A retry strategy iterator ready for use with `tokio_retry::RetryIf`.
pub fn get_retry_strategy(policy: &RetryPolicy) -> impl Iterator<Item = Duration> {
    // ExponentialBackoff yields factor * base^n, so base 2 scaled by half the
    // minimum delay gives min, 2*min, 4*min, ...
    let factor = (policy.min_delay.as_millis() as u64 / 2).max(1);
    ExponentialBackoff::from_millis(2)
        .factor(factor)
        .max_delay(policy.max_delay)
        .take(policy.max_retries)
}
