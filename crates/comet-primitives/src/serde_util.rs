//! Lenient serde helpers for node JSON.
//!
//! CometBFT encodes 64-bit integers as decimal strings while indexer APIs
//! usually send plain numbers. The helpers here accept both.

use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::Value;

#[derive(Deserialize)]
#[serde(untagged)]
enum NumOrStr {
    Num(u64),
    Str(String),
}

fn parse<E: de::Error>(raw: NumOrStr) -> Result<u64, E> {
    match raw {
        NumOrStr::Num(n) => Ok(n),
        NumOrStr::Str(s) => s
            .trim()
            .parse()
            .map_err(|_| E::custom(format!("invalid integer string: {s:?}"))),
    }
}

/// Deserialize a `u64` from either a JSON number or a decimal string.
pub fn u64_lenient<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    parse(NumOrStr::deserialize(deserializer)?)
}

/// Like [`u64_lenient`] for optional fields; `null` reads as `None`.
pub fn opt_u64_lenient<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumOrStr>::deserialize(deserializer)? {
        Some(raw) => parse(raw).map(Some),
        None => Ok(None),
    }
}

/// Read a count out of a loosely shaped value: a number, a decimal string,
/// an array (its length) or an object carrying one of `keys`.
pub fn count_from_value(value: &Value, keys: &[&str]) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Array(items) => Some(items.len() as u64),
        Value::Object(map) => keys
            .iter()
            .find_map(|k| map.get(*k))
            .and_then(|v| count_from_value(v, keys)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Deserialize)]
    struct Row {
        #[serde(deserialize_with = "u64_lenient")]
        height: u64,
        #[serde(default, deserialize_with = "opt_u64_lenient")]
        total: Option<u64>,
    }

    #[test]
    fn accepts_numbers_and_strings() {
        let a: Row = serde_json::from_value(json!({"height": 42, "total": "7"})).unwrap();
        assert_eq!(a.height, 42);
        assert_eq!(a.total, Some(7));

        let b: Row = serde_json::from_value(json!({"height": "1000"})).unwrap();
        assert_eq!(b.height, 1000);
        assert_eq!(b.total, None);
    }

    #[test]
    fn rejects_garbage_strings() {
        let r: Result<Row, _> = serde_json::from_value(json!({"height": "abc"}));
        assert!(r.is_err());
    }

    #[test]
    fn count_from_various_shapes() {
        let keys = ["count", "total"];
        assert_eq!(count_from_value(&json!(12), &keys), Some(12));
        assert_eq!(count_from_value(&json!("12"), &keys), Some(12));
        assert_eq!(count_from_value(&json!([1, 2, 3]), &keys), Some(3));
        assert_eq!(count_from_value(&json!({"total": "9"}), &keys), Some(9));
        assert_eq!(count_from_value(&json!({"other": 1}), &keys), None);
        assert_eq!(count_from_value(&json!(null), &keys), None);
    }
}
