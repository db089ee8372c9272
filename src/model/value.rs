//! JSON value semantics used by the query engine.
//!
//! Attributes are plain `serde_json::Value`s. This module decides what
//! "equal", "less than" and "length" mean for them.

use std::cmp::Ordering;

pub use serde_json::Value;

/// Short type name for error messages.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ============================================================================
// Equality
// ============================================================================

/// Strict equality. Numbers compare by value regardless of their integer or
/// float representation; arrays and objects compare element-wise.
pub fn strict_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            if let (Some(p), Some(q)) = (x.as_i64(), y.as_i64()) {
                return p == q;
            }
            if let (Some(p), Some(q)) = (x.as_u64(), y.as_u64()) {
                return p == q;
            }
            x.as_f64() == y.as_f64()
        }
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(p, q)| strict_eq(p, q))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter().all(|(k, v)| y.get(k).is_some_and(|w| strict_eq(v, w)))
        }
        _ => a == b,
    }
}

// ============================================================================
// Ordering
// ============================================================================

/// Ordering comparison. Returns None for incompatible types, and for `null`
/// on either side.
pub fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Null, _) | (_, Value::Null) => None,
        (Value::Bool(x), Value::Bool(y)) => x.partial_cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            if let (Some(p), Some(q)) = (x.as_i64(), y.as_i64()) {
                return p.partial_cmp(&q);
            }
            x.as_f64()?.partial_cmp(&y.as_f64()?)
        }
        (Value::String(x), Value::String(y)) => x.partial_cmp(y),
        _ => None,
    }
}

// ============================================================================
// Collections
// ============================================================================

/// Length of a value seen as a collection: array elements, string
/// characters, object entries. A missing (`null`) value is an empty collection.
pub fn collection_len(value: &Value) -> Option<usize> {
    match value {
        Value::Null => Some(0),
        Value::Array(items) => Some(items.len()),
        Value::String(s) => Some(s.chars().count()),
        Value::Object(map) => Some(map.len()),
        Value::Bool(_) | Value::Number(_) => None,
    }
}
