//! Conversion of raw log export rows into typed records.
//!
//! This module provides:
//! - [`FieldValue`]: the typed value of one cell
//! - [`decode_value`]: per-field coercion rules
//! - [`RowDecoder`]: a header-bound decoder producing one JSON object per row

mod values;

pub use values::{decode_value, fix_array_date_time, fix_watch_ids, parse_array, parse_integer, FieldValue};

use serde_json::{Map, Value};

use crate::utils::format_key;

/// Decodes TSV records of one part against its header row.
///
/// Header names are sanitized once; each cell is coerced by the sanitized
/// name of its column.
#[derive(Debug, Clone)]
pub struct RowDecoder {
    keys: Vec<String>,
}

impl RowDecoder {
    pub fn new<I, S>(header: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        RowDecoder {
            keys: header.into_iter().map(|h| format_key(h.as_ref())).collect(),
        }
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Decodes one record. Extra cells beyond the header are ignored.
    pub fn decode<'a, I>(&self, record: I) -> Map<String, Value>
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.keys
            .iter()
            .zip(record)
            .map(|(key, raw)| (key.clone(), Value::from(decode_value(key, raw))))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_row_decoder() {
        let decoder = RowDecoder::new([
            "ym:s:visitID",
            "ym:s:watchIDs",
            "ym:s:startURL",
            "ym:s:goalsID",
            "ym:s:isNewUser",
        ]);
        assert_eq!(
            decoder.keys(),
            ["visit_id", "watch_ids", "start_url", "goals_id", "is_new_user"]
        );

        let row = decoder.decode([
            "123",
            "[-424224913253989848]",
            "https://example.com/?a=1",
            "[]",
            "1",
        ]);
        assert_eq!(
            Value::Object(row),
            json!({
                "visit_id": 123,
                "watch_ids": [18022519160455561768u64],
                "start_url": "https://example.com/?a=1",
                "goals_id": "[]",
                "is_new_user": 1
            })
        );
    }
}
