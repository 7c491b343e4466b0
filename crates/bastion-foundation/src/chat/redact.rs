//! Redaction of tool results before persistence.

use serde_json::Value;

/// Replacement for every redacted string.
pub const REDACTED: &str = "[REDACTED]";

/// Copy of `value` with every string leaf replaced by [`REDACTED`].
/// Keys, numbers, booleans and nulls are kept so the shape stays useful.
pub fn redact_strings(value: &Value) -> Value {
    match value {
        Value::String(_) => Value::String(REDACTED.to_string()),
        Value::Array(items) => Value::Array(items.iter().map(redact_strings).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, value)| (key.clone(), redact_strings(value)))
                .collect(),
        ),
        Value::Null | Value::Bool(_) | Value::Number(_) => value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strings_are_replaced_at_any_depth() {
        let input = json!({
            "name": "Alice",
            "salary": 120000,
            "active": true,
            "tags": ["vip", { "note": "call back" }],
            "manager": null
        });
        let expected = json!({
            "name": REDACTED,
            "salary": 120000,
            "active": true,
            "tags": [REDACTED, { "note": REDACTED }],
            "manager": null
        });
        assert_eq!(redact_strings(&input), expected);
    }
}
