//! Application configuration and constants.
//!
//! This module provides:
//! - Configuration constants (hosts, retry bounds, paging, polling)
//! - Typed per-input configuration with validation
//! - CLI option types for the runner binary

mod constants;
mod inputs;
mod types;

// Re-export all constants
pub use constants::*;
pub use inputs::{
    ApplicationsInputConfig, GoalsInputConfig, LogsInputConfig, ScheduleInputConfig,
    StatTableInputConfig,
};
pub use types::{LogFormat, LogLevel, Opt};
