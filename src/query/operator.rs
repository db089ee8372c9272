//! Operator and field-predicate evaluation.

use std::cmp::Ordering;

use crate::model::{Value, collection_len, compare, strict_eq};
use super::ast::{FieldPredicate, LengthTest, Operator};

impl Operator {
    /// Evaluate against a value. Type mismatches (ordering a string against a
    /// number, `re` on a non-string) are simply false.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Operator::Eq(rvalue) => strict_eq(value, rvalue),
            Operator::Ne(rvalue) => !strict_eq(value, rvalue),
            Operator::Lt(rvalue) => compare(value, rvalue) == Some(Ordering::Less),
            Operator::Lte(rvalue) => matches!(compare(value, rvalue), Some(Ordering::Less | Ordering::Equal)),
            Operator::Gt(rvalue) => compare(value, rvalue) == Some(Ordering::Greater),
            Operator::Gte(rvalue) => matches!(compare(value, rvalue), Some(Ordering::Greater | Ordering::Equal)),
            Operator::Re(re) => value.as_str().is_some_and(|s| re.is_match(s)),
            Operator::Empty(want) => collection_len(value).is_some_and(|n| (n == 0) == *want),
            Operator::Length(test) => collection_len(value).is_some_and(|n| test.matches(n)),
            Operator::Includes(rvalue) => includes(value, rvalue),
        }
    }
}

impl LengthTest {
    pub fn matches(&self, len: usize) -> bool {
        let len = Value::from(len);
        match self {
            LengthTest::Exactly(expected) => strict_eq(&len, expected),
            LengthTest::Matches(op) => op.matches(&len),
        }
    }
}

/// Array membership (any element when `rvalue` is itself an array), or
/// substring for strings.
fn includes(value: &Value, rvalue: &Value) -> bool {
    match (value, rvalue) {
        (Value::Array(items), Value::Array(wanted)) => {
            wanted.iter().any(|w| items.iter().any(|item| strict_eq(item, w)))
        }
        (Value::Array(items), wanted) => items.iter().any(|item| strict_eq(item, wanted)),
        (Value::String(s), Value::String(sub)) => s.contains(sub.as_str()),
        _ => false,
    }
}

impl FieldPredicate {
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            FieldPredicate::Literal(expected) => strict_eq(value, expected),
            FieldPredicate::OneOf(options) => options.iter().any(|o| strict_eq(value, o)),
            FieldPredicate::Operator(op) => op.matches(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::query::matches_operator;
    use crate::Error;
    use serde_json::json;

    fn check(value: serde_json::Value, op: serde_json::Value) -> bool {
        matches_operator(&value, &op).unwrap()
    }

    #[test]
    fn test_comparisons() {
        assert!(check(json!(5), json!({ "gte": 5 })));
        assert!(check(json!(5), json!({ "lte": 5 })));
        assert!(!check(json!(5), json!({ "gt": 5 })));
        assert!(check(json!(4.5), json!({ "lt": 5 })));
        assert!(check(json!("apple"), json!({ "lt": "banana" })));
        assert!(!check(json!("5"), json!({ "gte": 5 })));
        assert!(!check(json!(null), json!({ "lt": 5 })));
    }

    #[test]
    fn test_equality() {
        assert!(check(json!(5), json!({ "eq": 5.0 })));
        assert!(check(json!("a"), json!({ "ne": "b" })));
        assert!(!check(json!("a"), json!({ "ne": "a" })));
        assert!(check(json!(null), json!({ "ne": "a" })));
    }

    #[test]
    fn test_pattern() {
        assert!(check(json!("hello there"), json!({ "re": { "pattern": "there", "flags": "i" } })));
        assert!(check(json!("hello THERE"), json!({ "re": { "pattern": "there", "flags": "i" } })));
        assert!(!check(json!("hello THERE"), json!({ "re": "there" })));
        assert!(check(json!("hello THERE"), json!({ "re": "(?i)there" })));
        assert!(!check(json!(42), json!({ "re": "4" })));
    }

    #[test]
    fn test_collections() {
        assert!(check(json!([]), json!({ "empty": true })));
        assert!(!check(json!([1]), json!({ "empty": true })));
        assert!(check(json!([1]), json!({ "empty": false })));
        assert!(check(json!(""), json!({ "empty": true })));
        assert!(!check(json!(0), json!({ "empty": true })));

        assert!(check(json!([1, 2, 3]), json!({ "length": 3 })));
        assert!(check(json!([1, 2, 3]), json!({ "length": { "gt": 2 } })));
        assert!(!check(json!([1, 2, 3]), json!({ "length": { "lt": 3 } })));

        assert!(!check(json!([3, 4, 5]), json!({ "includes": 6 })));
        assert!(check(json!([3, 4, 5]), json!({ "includes": 4 })));
        assert!(check(json!([3, 4, 5]), json!({ "includes": [9, 5] })));
        assert!(!check(json!([3, 4, 5]), json!({ "includes": [] })));
        assert!(check(json!("hello there"), json!({ "includes": "lo th" })));
    }

    #[test]
    fn test_invalid_operators() {
        assert!(matches!(matches_operator(&json!(1), &json!({})), Err(Error::Validation { .. })));
        assert!(matches!(
            matches_operator(&json!(1), &json!({ "gt": 0, "lt": 2 })),
            Err(Error::Validation { .. })
        ));
        assert!(matches!(matches_operator(&json!(1), &json!({ "near": 1 })), Err(Error::NotImplemented(_))));
        assert!(matches!(matches_operator(&json!(1), &json!(1)), Err(Error::Validation { .. })));
    }
}
