//! Path-addressed access to JSON trees.
//!
//! Pure functions over [`serde_json::Value`]. Deep equality and deep copies
//! come from `Value`'s own `PartialEq` and `Clone`.
//!
//! Object segments are keys. When a segment meets an array and parses as an
//! unsigned integer it addresses that element; any other segment against a
//! scalar or array resolves to nothing on read.

use serde_json::{Map, Value};

use crate::error::TypeError;
use crate::path::FieldPath;

fn step<'a>(node: &'a Value, segment: &str) -> Option<&'a Value> {
    match node {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => items.get(segment.parse::<usize>().ok()?),
        _ => None,
    }
}

fn step_mut<'a>(node: &'a mut Value, segment: &str) -> Option<&'a mut Value> {
    match node {
        Value::Object(map) => map.get_mut(segment),
        Value::Array(items) => items.get_mut(segment.parse::<usize>().ok()?),
        _ => None,
    }
}

/// Resolve `path` inside `root`.
pub fn get<'a>(root: &'a Value, path: &FieldPath) -> Option<&'a Value> {
    path.segments()
        .iter()
        .try_fold(root, |node, segment| step(node, segment))
}

/// Resolve `path` inside `root` for mutation.
pub fn get_mut<'a>(root: &'a mut Value, path: &FieldPath) -> Option<&'a mut Value> {
    path.segments()
        .iter()
        .try_fold(root, |node, segment| step_mut(node, segment))
}

/// Returns `true` if `path` resolves to a value (including `null`).
pub fn has(root: &Value, path: &FieldPath) -> bool {
    get(root, path).is_some()
}

/// Write `value` at `path`, creating intermediate objects as needed.
///
/// Intermediate scalars in the way are replaced by objects. Arrays are
/// never replaced: a segment meeting an array must be an index no greater
/// than the array's length, where the length itself appends a new element.
/// On error `root` is left untouched.
pub fn set(root: &mut Value, path: &FieldPath, value: Value) -> Result<(), TypeError> {
    check_writable(root, path)?;
    let Some((last, parents)) = path.segments().split_last() else {
        return Ok(());
    };
    let mut node = root;
    for segment in parents {
        node = child_or_insert(node, segment);
    }
    match (node, array_index(last)) {
        (Value::Array(items), Some(index)) => {
            if index == items.len() {
                items.push(value);
            } else {
                items[index] = value;
            }
        }
        (node, _) => {
            ensure_object(node).insert(last.clone(), value);
        }
    }
    Ok(())
}

/// Walk the existing part of `path` and reject any array that [`set`]
/// would have to replace or pad.
fn check_writable(root: &Value, path: &FieldPath) -> Result<(), TypeError> {
    let unwritable = |reason: String| TypeError::UnwritablePath {
        path: path.to_string(),
        reason,
    };
    let mut node = root;
    for segment in path.segments() {
        node = match node {
            Value::Object(map) => match map.get(segment) {
                Some(child) => child,
                None => return Ok(()),
            },
            Value::Array(items) => {
                let index = array_index(segment).ok_or_else(|| {
                    unwritable(format!("segment {segment:?} is not an index into an array"))
                })?;
                match items.get(index) {
                    Some(child) => child,
                    None if index == items.len() => return Ok(()),
                    None => {
                        return Err(unwritable(format!(
                            "index {index} is past the end of an array of length {}",
                            items.len()
                        )))
                    }
                }
            }
            _ => return Ok(()),
        };
    }
    Ok(())
}

/// Remove the value at `path`, returning it if it existed.
///
/// Object keys are deleted outright. Array elements are replaced with `null`
/// so the positions of their siblings do not shift.
pub fn unset(root: &mut Value, path: &FieldPath) -> Option<Value> {
    let (last, parents) = path.segments().split_last()?;
    let parent = parents
        .iter()
        .try_fold(root, |node, segment| step_mut(node, segment))?;
    match parent {
        Value::Object(map) => map.remove(last.as_str()),
        Value::Array(items) => {
            let slot = items.get_mut(last.parse::<usize>().ok()?)?;
            Some(std::mem::replace(slot, Value::Null))
        }
        _ => None,
    }
}

/// Deep equality that treats numbers by value, so `1` equals `1.0`.
///
/// Object key order is irrelevant; array order is not.
pub fn deep_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            if x.is_f64() || y.is_f64() {
                x.as_f64() == y.as_f64()
            } else {
                integer(x) == integer(y)
            }
        }
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| deep_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(key, x)| ys.get(key).is_some_and(|y| deep_equal(x, y)))
        }
        _ => a == b,
    }
}

/// Returns `true` if any of `items` is [`deep_equal`] to `value`.
pub fn contains_equal(items: &[Value], value: &Value) -> bool {
    items.iter().any(|item| deep_equal(item, value))
}

fn integer(n: &serde_json::Number) -> Option<i128> {
    n.as_i64().map(i128::from).or_else(|| n.as_u64().map(i128::from))
}

/// Returns `true` if `element` matches the `matcher` shape.
///
/// A match requires `element` to be an object holding every key of
/// `matcher` with a [`deep_equal`] value. Extra keys on `element` are ignored. An
/// empty matcher matches every element.
pub fn is_match(element: &Value, matcher: &Map<String, Value>) -> bool {
    if matcher.is_empty() {
        return true;
    }
    match element {
        Value::Object(fields) => matcher
            .iter()
            .all(|(key, expected)| fields.get(key).is_some_and(|actual| deep_equal(actual, expected))),
        _ => false,
    }
}

fn array_index(segment: &str) -> Option<usize> {
    segment.parse::<usize>().ok()
}

fn ensure_object(node: &mut Value) -> &mut Map<String, Value> {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => map,
        _ => unreachable!("node was just replaced with an object"),
    }
}

fn child_or_insert<'a>(node: &'a mut Value, segment: &str) -> &'a mut Value {
    let child = match (node, array_index(segment)) {
        (Value::Array(items), Some(index)) => {
            if index == items.len() {
                items.push(Value::Null);
            }
            &mut items[index]
        }
        (node, _) => ensure_object(node)
            .entry(segment.to_string())
            .or_insert(Value::Null),
    };
    if !child.is_object() && !child.is_array() {
        *child = Value::Object(Map::new());
    }
    child
}
