//! Turns whatever the backend sent into a single display string.
//!
//! The shape of the `response` field is not fixed: it can be plain text, a
//! list of content parts, or any other JSON value. None of these paths fail.

use serde_json::Value;

/// Converts a raw backend payload into display text
pub fn normalize(value: &Value) -> String {
    if let Value::String(s) = value {
        return s.clone();
    }

    if let Value::Array(parts) = value {
        let texts: Vec<&str> = parts
            .iter()
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .filter(|text| !text.is_empty())
            .collect();
        if !texts.is_empty() {
            return texts.join("\n");
        }
    }

    serde_json::to_string(value).unwrap_or_else(|_| value.to_string())
}

/// Normalizes assistant content loaded from stored history, which may hold a
/// JSON-encoded payload instead of plain text.
pub fn normalize_stored(content: &str) -> String {
    match serde_json::from_str::<Value>(content) {
        Ok(Value::String(s)) => s,
        Ok(value @ (Value::Array(_) | Value::Object(_))) => normalize(&value),
        _ => content.to_string(),
    }
}
