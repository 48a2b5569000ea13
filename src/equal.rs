//! Structural equality over [`Value`].

use crate::value::Value;

/// Deep structural comparison.
///
/// Primitives compare by identity: `NaN` equals itself, `0` and `-0` differ,
/// and an integer equals a float holding exactly the same value (`1 == 1.0`).
/// Arrays compare element-wise and are order sensitive; objects compare by key
/// presence and recursive value equality, independent of key order.
///
/// # Example
/// ```
/// use replay_cache::{Value, equal};
///
/// let a = Value::object([("a", 1), ("b", 2)]);
/// let b = Value::object([("b", 2), ("a", 1)]);
/// assert!(equal(&a, &b));
/// assert!(!equal(&Value::array([1, 2]), &Value::array([2, 1])));
/// ```
pub fn equal(a: &Value, b: &Value) -> bool {
    if !a.is_structured() && !b.is_structured() {
        return same_primitive(a, b);
    }

    if a.is_null() && b.is_null() {
        return true;
    }

    if a.is_structured() != b.is_structured() {
        return false;
    }

    if a.same_ref(b) {
        return true;
    }

    match (a, b) {
        (Value::Array(left), Value::Array(right)) => {
            left.len() == right.len() && left.iter().zip(right.iter()).all(|(l, r)| equal(l, r))
        }
        (Value::Array(_), _) | (_, Value::Array(_)) => false,
        (Value::Object(left), Value::Object(right)) => {
            if left.len() != right.len() {
                return false;
            }
            left.iter().all(|(key, l)| match right.get(key) {
                Some(r) => equal(l, r),
                None => false,
            })
        }
        // `Null` against an object.
        _ => false,
    }
}

fn same_primitive(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Undefined, Value::Undefined) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x.same_value(y),
        (Value::String(x), Value::String(y)) => x == y,
        _ => false,
    }
}
