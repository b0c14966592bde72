//! Field changes between a snapshot and a working copy.
//!
//! Objects are walked key by key so a change is reported at the deepest path
//! an update operator could address. Arrays are compared whole: the array
//! operators work on the array, not on its positions.

use docdelta_types::tree;
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Removed,
    Modified,
}

/// One field that differs. `before` is absent for additions and `after` for
/// removals.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FieldChange {
    pub path: String,
    pub kind: ChangeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<Value>,
}

/// Every field that differs between `reference` and `working`, ordered by
/// path. Numbers compare by value.
pub fn field_changes(reference: &Value, working: &Value) -> Vec<FieldChange> {
    let mut changes = Vec::new();
    match (reference, working) {
        (Value::Object(old), Value::Object(new)) => walk(&mut Vec::new(), old, new, &mut changes),
        (old, new) if !tree::deep_equal(old, new) => changes.push(FieldChange {
            path: String::new(),
            kind: ChangeKind::Modified,
            before: Some(old.clone()),
            after: Some(new.clone()),
        }),
        _ => {}
    }
    changes
}

fn walk(
    prefix: &mut Vec<String>,
    old: &Map<String, Value>,
    new: &Map<String, Value>,
    changes: &mut Vec<FieldChange>,
) {
    let mut keys: Vec<&String> = old.keys().chain(new.keys()).collect();
    keys.sort();
    keys.dedup();

    for key in keys {
        prefix.push(key.clone());
        let (kind, before, after) = match (old.get(key), new.get(key)) {
            (Some(Value::Object(o)), Some(Value::Object(n))) => {
                walk(prefix, o, n, changes);
                prefix.pop();
                continue;
            }
            (Some(o), Some(n)) if !tree::deep_equal(o, n) => {
                (ChangeKind::Modified, Some(o.clone()), Some(n.clone()))
            }
            (Some(o), None) => (ChangeKind::Removed, Some(o.clone()), None),
            (None, Some(n)) => (ChangeKind::Added, None, Some(n.clone())),
            _ => {
                prefix.pop();
                continue;
            }
        };
        changes.push(FieldChange {
            path: prefix.join("."),
            kind,
            before,
            after,
        });
        prefix.pop();
    }
}
