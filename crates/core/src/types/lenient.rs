//! Forgiving decoders for stored documents.
//!
//! Stored snapshots were written by older clients that did not validate
//! their input, so numbers may arrive as floats or `null` and a collection
//! may hold records this version cannot read. These helpers default a bad
//! field instead of failing the whole document.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Decode every element of a stored collection on its own.
///
/// A missing, `null` or non-array value reads as empty. Elements that do
/// not decode are skipped. Returns the records and the number skipped.
#[must_use]
pub fn decode_records<T: DeserializeOwned>(value: Option<Value>) -> (Vec<T>, usize) {
    let Some(Value::Array(elements)) = value else {
        return (Vec::new(), 0);
    };

    let total = elements.len();
    let records: Vec<T> = elements
        .into_iter()
        .filter_map(|element| serde_json::from_value(element).ok())
        .collect();
    let dropped = total - records.len();
    (records, dropped)
}

/// Millisecond timestamp from an integer, a float or anything else (0).
#[must_use]
#[allow(clippy::cast_possible_truncation)] // `as` saturates; NaN becomes 0
pub fn millis_from_value(value: &Value) -> i64 {
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f as i64))
        .unwrap_or_default()
}

/// Field decoder: collection via [`decode_records`].
pub(crate) fn records<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(decode_records(value).0)
}

/// Field decoder: timestamp via [`millis_from_value`].
pub(crate) fn millis<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(millis_from_value(&value))
}

/// Field decoder: any JSON number, `0.0` for `null` or non-numbers.
pub(crate) fn number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_f64().unwrap_or_default())
}
