//! Loose comparison of attribute values.

use serde_json::Value;
use std::cmp::Ordering;

/// Interprets a value as a number, accepting numeric strings.
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
            }
        }
        _ => None,
    }
}

/// Renders a scalar value as text (strings unquoted).
pub fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Equality: numeric when both sides are numbers, textual otherwise.
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    match (as_number(a), as_number(b)) {
        (Some(x), Some(y)) => x == y,
        _ => as_text(a) == as_text(b),
    }
}

/// Ordering: numeric when both sides are numbers, textual for other scalars.
///
/// ISO-8601 timestamps order correctly as text. Arrays and objects are not
/// comparable.
pub fn loose_cmp(a: &Value, b: &Value) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (as_number(a), as_number(b)) {
        return x.partial_cmp(&y);
    }
    if is_composite(a) || is_composite(b) {
        return None;
    }
    Some(as_text(a).cmp(&as_text(b)))
}

fn is_composite(value: &Value) -> bool {
    matches!(value, Value::Array(_) | Value::Object(_))
}

/// Splits a delimiter-joined attribute into its trimmed, non-empty segments.
pub fn split_segments(value: &Value, delimiter: &str) -> Vec<Value> {
    if delimiter.is_empty() {
        return vec![value.clone()];
    }
    as_text(value)
        .split(delimiter)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| Value::String(s.to_string()))
        .collect()
}

/// Total order used for presenting values: numbers first, then text.
pub fn display_cmp(a: &Value, b: &Value) -> Ordering {
    match (as_number(a), as_number(b)) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => as_text(a).cmp(&as_text(b)),
    }
}

/// Sorts values by [`display_cmp`] and removes loose duplicates.
pub fn sort_unique(values: &mut Vec<Value>) {
    values.sort_by(display_cmp);
    values.dedup_by(|a, b| loose_eq(a, b));
}
