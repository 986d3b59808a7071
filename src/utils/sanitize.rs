//! Field name sanitization.
//!
//! Metrika field names look like `ym:s:counterUserIDHash` (visits) or
//! `ym:pv:watchID` (hits). Output records use the bare snake_case name:
//! `counter_user_id_hash`, `watch_id`.

use std::sync::LazyLock;

use regex::Regex;

static NAMESPACE_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ym:.*:").expect("namespace prefix pattern is valid"));

/// Converts a raw API field name into the key used in output records.
///
/// Strips the `ym:<namespace>:` prefix, applies the two names whose snake_case
/// form would otherwise be unreadable (`watchIDs`, `iFrame`) and converts the
/// rest from camelCase to snake_case. Applying it twice yields the same result
/// as applying it once.
///
/// # Examples
///
/// ```
/// use metrika_inputs::format_key;
///
/// assert_eq!(format_key("ym:s:watchIDs"), "watch_ids");
/// assert_eq!(format_key("ym:s:someKeyName"), "some_key_name");
/// ```
pub fn format_key(key: &str) -> String {
    let key = NAMESPACE_PREFIX.replace(key, "");

    match key.as_ref() {
        "watchIDs" => "watch_ids".to_string(),
        "iFrame" => "iframe".to_string(),
        other => to_snake_case(other),
    }
}

/// camelCase / PascalCase to snake_case.
///
/// Acronym runs stay together (`counterUserIDHash` → `counter_user_id_hash`),
/// a digit following a letter starts a new word (`version1` → `version_1`),
/// and any non-alphanumeric character becomes a single separator.
pub fn to_snake_case(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        let prev = if i > 0 { Some(chars[i - 1]) } else { None };

        if c.is_uppercase() {
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let starts_word = match prev {
                Some(p) => {
                    p.is_lowercase() || p.is_ascii_digit() || (p.is_uppercase() && next_is_lower)
                }
                None => false,
            };
            if starts_word {
                push_separator(&mut out);
            }
            // `İ` lowers to `i` plus a combining dot; keep letters only
            out.extend(c.to_lowercase().filter(|l| l.is_alphanumeric()));
        } else if c.is_ascii_digit() {
            if prev.is_some_and(|p| p.is_alphabetic()) {
                push_separator(&mut out);
            }
            out.push(c);
        } else if c.is_alphanumeric() {
            out.push(c);
        } else {
            push_separator(&mut out);
        }
    }

    out
}

fn push_separator(out: &mut String) {
    if !out.is_empty() && !out.ends_with('_') {
        out.push('_');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_key_strips_namespace() {
        assert_eq!(format_key("ym:some:key"), "key");
        assert_eq!(format_key("ym:s:visitID"), "visit_id");
        assert_eq!(format_key("ym:pv:watchID"), "watch_id");
    }

    #[test]
    fn test_format_key_exclusions() {
        assert_eq!(format_key("ym:s:watchIDs"), "watch_ids");
        assert_eq!(format_key("watchIDs"), "watch_ids");
        assert_eq!(format_key("ym:s:iFrame"), "iframe");
        assert_eq!(format_key("iFrame"), "iframe");
    }

    #[test]
    fn test_format_key_camel_case() {
        assert_eq!(format_key("ym:s:someKeyName"), "some_key_name");
        assert_eq!(format_key("someKeyName"), "some_key_name");
        assert_eq!(
            format_key("ym:s:counterUserIDHash"),
            "counter_user_id_hash"
        );
        assert_eq!(format_key("ym:s:hasGCLID"), "has_gclid");
        assert_eq!(format_key("ym:s:goalsDateTime"), "goals_date_time");
        assert_eq!(format_key("ym:s:UTCStartTime"), "utc_start_time");
    }

    #[test]
    fn test_format_key_digits() {
        assert_eq!(
            format_key("ym:pv:browserEngineVersion1"),
            "browser_engine_version_1"
        );
        assert_eq!(format_key("ym:s:lastsignUTMSource"), "lastsign_utm_source");
    }

    #[test]
    fn test_format_key_no_transformation_needed() {
        assert_eq!(format_key("already_snake_case"), "already_snake_case");
        assert_eq!(format_key("pageviews"), "pageviews");
    }

    #[test]
    fn test_format_key_idempotent_examples() {
        for key in [
            "ym:s:watchIDs",
            "ym:s:iFrame",
            "ym:s:someKeyName",
            "ym:pv:browserEngineVersion4",
            "ym:s:<attribution>TrafficSource",
            "weird--Key  Name",
            "ym:s:İndexPage",
            "ym:s:pageİD",
        ] {
            let once = format_key(key);
            assert_eq!(format_key(&once), once, "not idempotent for {key:?}");
        }
    }

    #[test]
    fn test_format_key_multi_char_lowercase() {
        assert_eq!(format_key("ym:s:İndexPage"), "index_page");
        assert_eq!(format_key("ym:s:pageİD"), "page_id");
        assert_eq!(format_key("ym:s:ÀlaCarte"), "àla_carte");
    }
}
