//! Date expression resolution.
//!
//! Accepts the relative tokens the Metrika API itself understands
//! (`today`, `yesterday`, `tomorrow`, `NdaysAgo`) and literal `YYYY-MM-DD`
//! dates, and resolves them to absolute calendar dates at construction time.

use chrono::{Days, Local, NaiveDate};

use crate::error_handling::DateParseError;

const DATE_FORMAT: &str = "%Y-%m-%d";
const DAYS_AGO_SUFFIX: &str = "daysago";

/// Resolves a date expression against the local calendar date.
///
/// Matching is case-insensitive, so `TODAY` and `7DaysAgo` are accepted.
///
/// # Errors
///
/// Returns `DateParseError::InvalidDaysAgo` when the `daysago` prefix is not an
/// integer, and `DateParseError::InvalidDate` for anything else that is not a
/// `YYYY-MM-DD` date.
pub fn parse_date(expr: &str) -> Result<String, DateParseError> {
    parse_date_from(expr, Local::now().date_naive())
}

/// Resolves a date expression relative to `today`.
pub fn parse_date_from(expr: &str, today: NaiveDate) -> Result<String, DateParseError> {
    let expr = expr.trim().to_lowercase();

    let date = match expr.as_str() {
        "today" => today,
        "yesterday" => shift(today, -1, &expr)?,
        "tomorrow" => shift(today, 1, &expr)?,
        _ => {
            if let Some(count) = expr.strip_suffix(DAYS_AGO_SUFFIX) {
                let days: i64 = count
                    .parse()
                    .map_err(|_| DateParseError::InvalidDaysAgo(expr.clone()))?;
                shift(today, -days, &expr)?
            } else {
                // chrono accepts unpadded months and days, the API does not
                if expr.len() != 10 {
                    return Err(DateParseError::InvalidDate(expr));
                }
                NaiveDate::parse_from_str(&expr, DATE_FORMAT)
                    .map_err(|_| DateParseError::InvalidDate(expr.clone()))?
            }
        }
    };

    Ok(date.format(DATE_FORMAT).to_string())
}

fn shift(date: NaiveDate, days: i64, expr: &str) -> Result<NaiveDate, DateParseError> {
    let magnitude = Days::new(days.unsigned_abs());
    let shifted = if days < 0 {
        date.checked_sub_days(magnitude)
    } else {
        date.checked_add_days(magnitude)
    };
    shifted.ok_or_else(|| DateParseError::InvalidDaysAgo(expr.to_string()))
}
