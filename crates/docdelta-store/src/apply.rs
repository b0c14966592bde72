//! Server-side application of operator documents.
//!
//! This is what a backend does with an update: it takes the stored document
//! and an [`OperatorDocument`] and produces the new stored document. Kinds
//! are applied in emission order (replace, remove, append, setInsert,
//! arrayRemove); because overlapping paths are rejected up front, the order
//! never changes the result.

use docdelta_types::{tree, FieldPath, OperatorDocument, UpdateKind, ID_FIELD};
use serde_json::Value;

use crate::error::{StoreError, StoreResult};

/// Apply `update` to `document` in place.
///
/// On error `document` is left unchanged.
pub fn apply_update(document: &mut Value, update: &OperatorDocument) -> StoreResult<()> {
    if let Some((_, path)) = update
        .entries()
        .into_iter()
        .find(|(_, path)| path.head() == ID_FIELD)
    {
        return Err(StoreError::ImmutableId(path.clone()));
    }
    let conflicts = update.conflicting_paths();
    if !conflicts.is_empty() {
        return Err(StoreError::ConflictingPaths(conflicts));
    }

    let mut next = document.clone();

    for (path, value) in &update.replace {
        tree::set(&mut next, path, value.clone()).map_err(StoreError::UnwritablePath)?;
    }
    for path in update.remove.keys() {
        tree::unset(&mut next, path);
    }
    for (path, list) in &update.append {
        array_at(&mut next, path, UpdateKind::Append)?.extend(list.each_of.iter().cloned());
    }
    for (path, list) in &update.set_insert {
        let items = array_at(&mut next, path, UpdateKind::SetInsert)?;
        for value in &list.each_of {
            if !tree::contains_equal(items, value) {
                items.push(value.clone());
            }
        }
    }
    for (path, removal) in &update.array_remove {
        match tree::get_mut(&mut next, path) {
            None => {}
            Some(Value::Array(items)) => items.retain(|element| !removal.removes(element)),
            Some(_) => {
                return Err(StoreError::NotAnArray {
                    kind: UpdateKind::ArrayRemove,
                    path: path.clone(),
                })
            }
        }
    }

    *document = next;
    Ok(())
}

/// The array at `path`, created empty if absent.
fn array_at<'a>(
    document: &'a mut Value,
    path: &FieldPath,
    kind: UpdateKind,
) -> StoreResult<&'a mut Vec<Value>> {
    if !tree::has(document, path) {
        tree::set(document, path, Value::Array(Vec::new())).map_err(StoreError::UnwritablePath)?;
    }
    match tree::get_mut(document, path) {
        Some(Value::Array(items)) => Ok(items),
        _ => Err(StoreError::NotAnArray {
            kind,
            path: path.clone(),
        }),
    }
}
