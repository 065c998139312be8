//! JSON helpers.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;

use crate::error::{SprigError, SprigResult};

/// Flatten nested objects into dotted keys (`{"a": {"b": 1}}` -> `a.b = 1`).
/// Arrays and scalars are leaves.
pub fn flatten(value: &Value) -> IndexMap<String, Value> {
    let mut out = IndexMap::new();
    if let Value::Object(map) = value {
        for (key, child) in map {
            flatten_into(key, child, &mut out);
        }
    }
    out
}

fn flatten_into(prefix: &str, value: &Value, out: &mut IndexMap<String, Value>) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                flatten_into(&format!("{}.{}", prefix, key), child, out);
            }
        },
        _ => {
            out.insert(prefix.to_string(), value.clone());
        },
    }
}

/// Serialize with four-space indentation
pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> SprigResult<String> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value
        .serialize(&mut ser)
        .map_err(|e| SprigError::json("failed to serialize JSON".to_string(), e))?;
    String::from_utf8(buf).map_err(|e| SprigError::ConfigValidation {
        field: "json".to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flatten_nested() {
        let flat = flatten(&json!({
            "radio": {"enabled": 1, "tx": {"power": 7}},
            "pins": [1, 2],
            "empty": {}
        }));
        assert_eq!(flat.get("radio.enabled"), Some(&json!(1)));
        assert_eq!(flat.get("radio.tx.power"), Some(&json!(7)));
        assert_eq!(flat.get("pins"), Some(&json!([1, 2])));
        assert_eq!(flat.get("empty"), Some(&json!({})));
        assert_eq!(flat.len(), 4);
    }

    #[test]
    fn test_flatten_scalar_is_empty() {
        assert!(flatten(&json!(3)).is_empty());
    }

    #[test]
    fn test_pretty_indent() {
        let text = to_pretty_json(&json!({"a": {"b": 1}})).unwrap();
        assert_eq!(text, "{\n    \"a\": {\n        \"b\": 1\n    }\n}");
    }
}
