//! Field readers for documents written by older versions of the app
//!
//! Form fields left blank were stored as `null`, and some numbers as
//! strings. These helpers read such values as the field default, and drop
//! a single unreadable list entry instead of the whole document.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
}

/// Whole number; `null`, negative or non-numeric reads as 0
pub fn whole<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(as_number(&value).map_or(0, |n| n.max(0.0).trunc() as u32))
}

/// Decimal number; `null` or non-numeric reads as 0.0
pub fn decimal<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(as_number(&value).unwrap_or_default())
}

fn keep_valid<T: DeserializeOwned>(items: Vec<Value>) -> Vec<T> {
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::warn!("Skipping unreadable entry: {e}");
                None
            }
        })
        .collect()
}

/// List whose unreadable entries are skipped
pub fn entries<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(keep_valid(Vec::<Value>::deserialize(deserializer)?))
}

/// Map of lists; a value that is not a list reads as empty
pub fn keyed_entries<'de, D, T>(deserializer: D) -> Result<BTreeMap<String, Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = BTreeMap::<String, Value>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(key, value)| {
            let list = match value {
                Value::Array(items) => keep_valid(items),
                Value::Null => Vec::new(),
                other => {
                    log::warn!("Ignoring `{key}`: expected a list, got {other}");
                    Vec::new()
                }
            };
            (key, list)
        })
        .collect())
}
