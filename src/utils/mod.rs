//! Utility functions.
//!
//! This module provides:
//! - Date expression resolution (`today`, `NdaysAgo`, ...)
//! - Field name sanitization for output records

pub mod date;
pub mod sanitize;

pub use date::{parse_date, parse_date_from};
pub use sanitize::{format_key, to_snake_case};

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn format_key_is_idempotent(key in "(ym:(s|pv):)?[A-Za-z0-9_ .İÀĞßé-]{0,32}") {
            let once = format_key(&key);
            prop_assert_eq!(format_key(&once), once);
        }

        #[test]
        fn format_key_output_is_snake_case(key in "(ym:s:)?[A-Za-z][A-Za-z0-9]{0,24}") {
            let formatted = format_key(&key);
            prop_assert!(formatted
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'));
        }
    }
}
