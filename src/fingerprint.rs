//! Content fingerprints used as deduplication keys.
//!
//! A fingerprint is the hex SHA-256 of the record's field values, taken in
//! ascending byte order of their field names and joined with
//! [`FINGERPRINT_DELIMITER`]. The order a line lists its keys in does not
//! matter. Strings are rendered raw, every other value as compact JSON
//! (`null`, `10`, `true`, `[1,2]`).
//!
//! The delimiter is not escaped, so `{"a":"1,2","b":"3"}` and
//! `{"a":"1","b":"2,3"}` produce the same fingerprint. Deduplication treats
//! such records as identical.

use serde_json::Value;
use sha2::{Digest, Sha256};
use std::borrow::Cow;

use crate::constants::FINGERPRINT_DELIMITER;
use crate::dataset::Record;

/// Fingerprint of an ordered sequence of field values.
pub fn fingerprint_values<'a, I>(values: I) -> String
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut hasher = Sha256::new();
    for (i, value) in values.into_iter().enumerate() {
        if i > 0 {
            hasher.update(FINGERPRINT_DELIMITER.as_bytes());
        }
        hasher.update(render_value(value).as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Fingerprint over a record's own fields, sorted by field name.
pub fn fingerprint_record(record: &Record) -> String {
    let mut fields: Vec<(&String, &Value)> = record.iter().collect();
    fields.sort_unstable_by(|a, b| a.0.cmp(b.0));
    fingerprint_values(fields.into_iter().map(|(_, value)| value))
}

fn render_value(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s.as_str()),
        other => Cow::Owned(other.to_string()),
    }
}
