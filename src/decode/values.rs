//! Value coercion for log export fields.
//!
//! Log parts are tab-separated text, so every cell arrives as a string. The
//! coercion applied depends on the sanitized field name: identifier and
//! counter fields become integers, two array fields get dedicated repair
//! rules, any other bracketed value becomes a generic list and the rest stays
//! text.

use serde::Serialize;
use serde_json::{Number, Value};

/// A typed cell value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Integer(i64),
    Unsigned(u64),
    Float(f64),
    Text(String),
    List(Vec<FieldValue>),
}

impl From<FieldValue> for Value {
    fn from(value: FieldValue) -> Self {
        match value {
            FieldValue::Bool(b) => Value::Bool(b),
            FieldValue::Integer(n) => Value::Number(n.into()),
            FieldValue::Unsigned(n) => Value::Number(n.into()),
            FieldValue::Float(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
            FieldValue::Text(s) => Value::String(s),
            FieldValue::List(items) => Value::Array(items.into_iter().map(Value::from).collect()),
        }
    }
}

/// Fields documented as integers for the hits and visits sources.
///
/// https://yandex.ru/dev/metrika/en/logs/fields/hits
/// https://yandex.ru/dev/metrika/en/logs/fields/visits
const INTEGER_FIELDS: &[&str] = &[
    // hits
    "watch_id",
    "page_view_id",
    "counter_id",
    "client_id",
    "counter_user_id_hash",
    "has_gclid",
    "browser_major_version",
    "browser_minor_version",
    "browser_engine_version_1",
    "browser_engine_version_2",
    "browser_engine_version_3",
    "browser_engine_version_4",
    "client_time_zone",
    "cookie_enabled",
    "javascript_enabled",
    "physical_screen_height",
    "physical_screen_width",
    "screen_colors",
    "screen_height",
    "screen_orientation",
    "screen_width",
    "window_client_height",
    "window_client_width",
    "region_city_id",
    "region_country_id",
    "is_page_view",
    "is_turbo_page",
    "is_turbo_app",
    "iframe",
    "link",
    "download",
    "not_bounce",
    "artificial",
    // visits
    "visit_id",
    "is_new_user",
    "page_views",
    "visit_duration",
    "bounce",
];

/// Array of watch ids; the export renders them as signed 64-bit values.
const WATCH_IDS_FIELD: &str = "watch_ids";

/// Array of goal completion timestamps rendered as quoted strings.
const GOALS_DATE_TIME_FIELD: &str = "goals_date_time";

/// Coerces a raw cell according to its sanitized field name.
pub fn decode_value(key: &str, raw: &str) -> FieldValue {
    match key {
        WATCH_IDS_FIELD => fix_watch_ids(raw),
        GOALS_DATE_TIME_FIELD => fix_array_date_time(raw),
        k if INTEGER_FIELDS.contains(&k) => parse_integer(raw),
        _ if is_bracketed(raw) => parse_array(raw),
        _ => FieldValue::Text(raw.to_string()),
    }
}

/// Parses an integer with explicit bounds; values outside `i64`/`u64` stay text.
pub fn parse_integer(raw: &str) -> FieldValue {
    let trimmed = raw.trim();
    if let Ok(n) = trimmed.parse::<i64>() {
        FieldValue::Integer(n)
    } else if let Ok(n) = trimmed.parse::<u64>() {
        FieldValue::Unsigned(n)
    } else {
        FieldValue::Text(raw.to_string())
    }
}

/// Parses a generic bracketed list of scalars.
///
/// `""` and `"[]"` are returned unchanged, as is anything malformed.
pub fn parse_array(raw: &str) -> FieldValue {
    if is_empty_array_literal(raw) {
        return FieldValue::Text(raw.to_string());
    }
    match parse_list(raw) {
        Some(items) => FieldValue::List(items),
        None => FieldValue::Text(raw.to_string()),
    }
}

/// Repairs the watch id array.
///
/// Ids are unsigned 64-bit values but the export writes them as signed
/// integers, so large ids show up negative. Negative entries are
/// reinterpreted as their two's complement `u64`.
pub fn fix_watch_ids(raw: &str) -> FieldValue {
    if is_empty_array_literal(raw) || !is_bracketed(raw) {
        return FieldValue::Text(raw.to_string());
    }
    let Some(items) = split_items(raw) else {
        return FieldValue::Text(raw.to_string());
    };

    let mut ids = Vec::with_capacity(items.len());
    for item in items {
        let item = item.trim();
        let id = if item.starts_with('-') {
            item.parse::<i64>().ok().map(|n| n as u64)
        } else {
            item.parse::<u64>().ok()
        };
        match id {
            Some(id) => ids.push(FieldValue::Unsigned(id)),
            None => return FieldValue::Text(raw.to_string()),
        }
    }
    FieldValue::List(ids)
}

/// Repairs the goal timestamp array into plain date-time strings.
pub fn fix_array_date_time(raw: &str) -> FieldValue {
    if is_empty_array_literal(raw) || !is_bracketed(raw) {
        return FieldValue::Text(raw.to_string());
    }
    let Some(items) = split_items(raw) else {
        return FieldValue::Text(raw.to_string());
    };

    FieldValue::List(
        items
            .into_iter()
            .map(|item| {
                FieldValue::Text(
                    item.trim()
                        .trim_matches(|c| c == '\\' || c == '\'' || c == '"')
                        .to_string(),
                )
            })
            .collect(),
    )
}

fn is_empty_array_literal(raw: &str) -> bool {
    raw.is_empty() || raw == "[]"
}

fn is_bracketed(raw: &str) -> bool {
    raw.len() >= 2 && raw.starts_with('[') && raw.ends_with(']')
}

/// Splits the inside of a bracketed list on top-level commas.
///
/// Commas inside quotes or nested brackets do not split. Returns `None` for
/// unbalanced input.
fn split_items(raw: &str) -> Option<Vec<&str>> {
    let inner = raw.strip_prefix('[')?.strip_suffix(']')?;
    let mut items = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in inner.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '\'' | '"' => match quote {
                Some(q) if q == c => quote = None,
                None => quote = Some(c),
                _ => {}
            },
            '[' if quote.is_none() => depth += 1,
            ']' if quote.is_none() => depth = depth.checked_sub(1)?,
            ',' if quote.is_none() && depth == 0 => {
                items.push(&inner[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 || quote.is_some() {
        return None;
    }
    items.push(&inner[start..]);
    Some(items)
}

fn parse_list(raw: &str) -> Option<Vec<FieldValue>> {
    let items = split_items(raw)?;
    let mut values = Vec::with_capacity(items.len());
    for item in items {
        let item = item.trim();
        if item.is_empty() {
            return None;
        }
        values.push(parse_scalar(item)?);
    }
    Some(values)
}

fn parse_scalar(item: &str) -> Option<FieldValue> {
    if item.starts_with('[') {
        if item == "[]" {
            return Some(FieldValue::List(Vec::new()));
        }
        return parse_list(item).map(FieldValue::List);
    }
    if let Some(text) = unquote(item) {
        return Some(FieldValue::Text(text));
    }
    let value = match item {
        "true" => FieldValue::Bool(true),
        "false" => FieldValue::Bool(false),
        _ => {
            if let Ok(n) = item.parse::<i64>() {
                FieldValue::Integer(n)
            } else if let Ok(n) = item.parse::<u64>() {
                FieldValue::Unsigned(n)
            } else if let Some(f) = parse_float(item) {
                FieldValue::Float(f)
            } else {
                FieldValue::Text(item.to_string())
            }
        }
    };
    Some(value)
}

fn parse_float(item: &str) -> Option<f64> {
    // "inf", "nan" and friends parse as f64 but are words here
    if !item.starts_with(|c: char| c.is_ascii_digit() || c == '-' || c == '+' || c == '.') {
        return None;
    }
    item.parse::<f64>().ok().filter(|f| f.is_finite())
}

/// Strips matching quotes, including the `\'` form the export uses inside arrays.
fn unquote(item: &str) -> Option<String> {
    let body = item.trim_start_matches('\\');
    let q = body.chars().next().filter(|c| *c == '\'' || *c == '"')?;
    let body = body[1..].strip_suffix(q)?;
    let body = body.trim_end_matches('\\');
    Some(body.replace(&format!("\\{q}"), &q.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(values: &[&str]) -> FieldValue {
        FieldValue::List(values.iter().map(|s| FieldValue::Text(s.to_string())).collect())
    }

    #[test]
    fn test_watch_ids_negative_wraparound() {
        assert_eq!(
            fix_watch_ids("[18023332624550854749, -424224913253989848]"),
            FieldValue::List(vec![
                FieldValue::Unsigned(18023332624550854749),
                FieldValue::Unsigned(18022519160455561768),
            ])
        );
    }

    #[test]
    fn test_watch_ids_with_and_without_spaces() {
        let expected = FieldValue::List(vec![
            FieldValue::Unsigned(18023332624550854749),
            FieldValue::Unsigned(18023347689297543250),
            FieldValue::Unsigned(18022519160455561768),
        ]);
        assert_eq!(
            fix_watch_ids("[18023332624550854749, 18023347689297543250, -424224913253989848]"),
            expected
        );
        assert_eq!(
            fix_watch_ids("[18023332624550854749, 18023347689297543250,-424224913253989848]"),
            expected
        );
    }

    #[test]
    fn test_watch_ids_single() {
        assert_eq!(
            fix_watch_ids("[18023332624550854749]"),
            FieldValue::List(vec![FieldValue::Unsigned(18023332624550854749)])
        );
    }

    #[test]
    fn test_watch_ids_malformed_passes_through() {
        assert_eq!(
            fix_watch_ids("[123, abc]"),
            FieldValue::Text("[123, abc]".to_string())
        );
        assert_eq!(fix_watch_ids("123"), FieldValue::Text("123".to_string()));
    }

    #[test]
    fn test_empty_inputs_pass_through() {
        for f in [fix_watch_ids, fix_array_date_time, parse_array] {
            assert_eq!(f(""), FieldValue::Text(String::new()));
            assert_eq!(f("[]"), FieldValue::Text("[]".to_string()));
        }
    }

    #[test]
    fn test_array_date_time() {
        assert_eq!(
            fix_array_date_time(r"[\\'2024-12-31 19:53:19\\']"),
            texts(&["2024-12-31 19:53:19"])
        );
        assert_eq!(
            fix_array_date_time(r"[\\'2024-12-31 19:53:19\\', \\'2024-12-31 19:53:20\\']"),
            texts(&["2024-12-31 19:53:19", "2024-12-31 19:53:20"])
        );
        assert_eq!(
            fix_array_date_time("['2024-12-31 19:53:19','2024-12-31 19:53:20']"),
            texts(&["2024-12-31 19:53:19", "2024-12-31 19:53:20"])
        );
    }

    #[test]
    fn test_generic_array() {
        assert_eq!(
            parse_array("[1, 2, 3]"),
            FieldValue::List(vec![
                FieldValue::Integer(1),
                FieldValue::Integer(2),
                FieldValue::Integer(3)
            ])
        );
        assert_eq!(
            parse_array("['a, b', 'c']"),
            texts(&["a, b", "c"])
        );
        assert_eq!(
            parse_array("[1.5, true, word]"),
            FieldValue::List(vec![
                FieldValue::Float(1.5),
                FieldValue::Bool(true),
                FieldValue::Text("word".to_string())
            ])
        );
        assert_eq!(
            parse_array("[[1, 2], []]"),
            FieldValue::List(vec![
                FieldValue::List(vec![FieldValue::Integer(1), FieldValue::Integer(2)]),
                FieldValue::List(vec![]),
            ])
        );
    }

    #[test]
    fn test_generic_array_malformed_passes_through() {
        for raw in ["[1,,2]", "['open]", "[[1]"] {
            assert_eq!(parse_array(raw), FieldValue::Text(raw.to_string()));
        }
    }

    #[test]
    fn test_decode_value_dispatch() {
        assert_eq!(decode_value("visit_id", "42"), FieldValue::Integer(42));
        assert_eq!(
            decode_value("counter_user_id_hash", "18446744073709551615"),
            FieldValue::Unsigned(u64::MAX)
        );
        assert_eq!(decode_value("is_new_user", "0"), FieldValue::Integer(0));
        assert_eq!(decode_value("visit_id", ""), FieldValue::Text(String::new()));
        assert_eq!(
            decode_value("goals_id", "[1,2]"),
            FieldValue::List(vec![FieldValue::Integer(1), FieldValue::Integer(2)])
        );
        assert_eq!(
            decode_value("start_url", "https://example.com/"),
            FieldValue::Text("https://example.com/".to_string())
        );
        assert_eq!(
            decode_value("watch_ids", "[-1]"),
            FieldValue::List(vec![FieldValue::Unsigned(u64::MAX)])
        );
    }

    #[test]
    fn test_field_value_to_json() {
        let value = Value::from(FieldValue::List(vec![
            FieldValue::Unsigned(18022519160455561768),
            FieldValue::Text("x".to_string()),
            FieldValue::Float(f64::NAN),
        ]));
        assert_eq!(
            value,
            serde_json::json!([18022519160455561768u64, "x", null])
        );
    }
}
