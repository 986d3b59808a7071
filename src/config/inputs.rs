//! Typed per-input configuration.
//!
//! Each connector type deserializes its own struct from the JSON object found
//! under its type name. Unknown fields are rejected, date expressions are
//! resolved to absolute dates and invariants are checked by `validated()`
//! before an input is constructed.

use serde::Deserialize;

use crate::api::{Attribution, LogSource};
use crate::config::constants::{DEFAULT_DATE1, DEFAULT_DATE2, LOG_REQUEST_MAX_WAIT, LOG_REQUEST_POLL_INTERVAL};
use crate::error_handling::ConfigError;
use crate::utils::parse_date;

fn default_date1() -> String {
    DEFAULT_DATE1.to_string()
}

fn default_date2() -> String {
    DEFAULT_DATE2.to_string()
}

fn default_poll_interval_secs() -> u64 {
    LOG_REQUEST_POLL_INTERVAL.as_secs()
}

fn default_max_wait_secs() -> u64 {
    LOG_REQUEST_MAX_WAIT.as_secs()
}

fn default_true() -> bool {
    true
}

/// Configuration of the `yandex_metrika_logs` input.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogsInputConfig {
    /// OAuth token; requests are anonymous when absent.
    #[serde(default)]
    pub token: Option<String>,
    pub counter_id: u64,
    pub source: LogSource,
    pub fields: Vec<String>,
    #[serde(default = "default_date1")]
    pub date1: String,
    #[serde(default = "default_date2")]
    pub date2: String,
    #[serde(default)]
    pub attribution: Option<Attribution>,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_max_wait_secs")]
    pub max_wait_secs: u64,
    /// Overrides the Metrika API host.
    #[serde(default)]
    pub api_url: Option<String>,
}

impl LogsInputConfig {
    /// Checks invariants and resolves `date1`/`date2` to `YYYY-MM-DD`.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` naming the first offending field.
    pub fn validated(mut self) -> Result<Self, ConfigError> {
        check_positive("counter_id", self.counter_id)?;
        check_not_empty("fields", &self.fields)?;
        check_positive("poll_interval_secs", self.poll_interval_secs)?;
        check_positive("max_wait_secs", self.max_wait_secs)?;
        (self.date1, self.date2) = resolve_period(&self.date1, &self.date2)?;
        Ok(self)
    }
}

/// Configuration of the `yandex_metrika_stat_table` and
/// `yandex_appmetrica_stat_table` inputs.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatTableInputConfig {
    #[serde(default)]
    pub token: Option<String>,
    pub ids: Vec<u64>,
    pub metrics: Vec<String>,
    #[serde(default)]
    pub dimensions: Vec<String>,
    #[serde(default = "default_date1")]
    pub date1: String,
    #[serde(default = "default_date2")]
    pub date2: String,
    #[serde(default)]
    pub filters: Option<String>,
    #[serde(default)]
    pub sort: Vec<String>,
    #[serde(default)]
    pub accuracy: Option<String>,
    #[serde(default)]
    pub lang: Option<String>,
    #[serde(default)]
    pub preset: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub direct_client_logins: Vec<String>,
    /// Sanitize dimension and metric names in output records.
    #[serde(default = "default_true")]
    pub format_keys: bool,
    #[serde(default)]
    pub api_url: Option<String>,
}

impl StatTableInputConfig {
    /// Checks invariants and resolves `date1`/`date2` to `YYYY-MM-DD`.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` naming the first offending field.
    pub fn validated(mut self) -> Result<Self, ConfigError> {
        check_not_empty("ids", &self.ids)?;
        if self.ids.contains(&0) {
            return Err(ConfigError::new("ids", "counter ids must be positive"));
        }
        check_not_empty("metrics", &self.metrics)?;
        (self.date1, self.date2) = resolve_period(&self.date1, &self.date2)?;
        Ok(self)
    }
}

/// Configuration of the `yandex_metrika_goals` input.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GoalsInputConfig {
    #[serde(default)]
    pub token: Option<String>,
    pub counter_id: u64,
    #[serde(default)]
    pub api_url: Option<String>,
}

impl GoalsInputConfig {
    pub fn validated(self) -> Result<Self, ConfigError> {
        check_positive("counter_id", self.counter_id)?;
        Ok(self)
    }
}

/// Configuration of the `yandex_appmetrica_applications` input.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApplicationsInputConfig {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub api_url: Option<String>,
}

/// Configuration of the `schedule` wrapper input.
///
/// `input` holds the child as a single-key object, e.g.
/// `{"yandex_metrika_goals": {"counter_id": 1}}`, and is built through the
/// registry.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScheduleInputConfig {
    pub interval_secs: u64,
    pub input: serde_json::Value,
}

impl ScheduleInputConfig {
    pub fn validated(self) -> Result<Self, ConfigError> {
        check_positive("interval_secs", self.interval_secs)?;
        Ok(self)
    }
}

fn check_positive(field: &str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::new(field, "must be greater than zero"));
    }
    Ok(())
}

fn check_not_empty<T>(field: &str, values: &[T]) -> Result<(), ConfigError> {
    if values.is_empty() {
        return Err(ConfigError::new(field, "must not be empty"));
    }
    Ok(())
}

/// Resolves both ends of a sample period and checks their order.
fn resolve_period(date1: &str, date2: &str) -> Result<(String, String), ConfigError> {
    let start = parse_date(date1).map_err(|e| ConfigError::new("date1", e.to_string()))?;
    let end = parse_date(date2).map_err(|e| ConfigError::new("date2", e.to_string()))?;
    // zero-padded ISO dates order lexicographically
    if start > end {
        return Err(ConfigError::new(
            "date1",
            format!("start date {start} is after end date {end}"),
        ));
    }
    Ok((start, end))
}
