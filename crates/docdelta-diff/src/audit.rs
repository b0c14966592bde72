//! Cross-check of field changes against pending operators.
//!
//! A persisted document's pending [`OperatorDocument`] should account for
//! every field that differs from the snapshot: applying it to the snapshot
//! must reproduce the working copy. An audit pairs each change with the
//! entries whose paths overlap it and lists the entries that touch no change
//! at all.

use docdelta_types::{FieldPath, OperatorDocument, UpdateKind};
use serde::Serialize;
use serde_json::Value;

use crate::change::{field_changes, FieldChange};

/// A pending entry, named by kind and path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Entry {
    pub kind: UpdateKind,
    pub path: FieldPath,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AuditedChange {
    #[serde(flatten)]
    pub change: FieldChange,
    /// Pending entries whose path overlaps this change.
    pub covered_by: Vec<Entry>,
}

/// Result of [`audit`].
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ChangeAudit {
    pub changes: Vec<AuditedChange>,
    /// Pending entries that overlap no change. They are harmless to send but
    /// change nothing, e.g. a replace that was later set back to the
    /// snapshot value, or a by-shape pull that matched no element.
    pub idle: Vec<Entry>,
}

impl ChangeAudit {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty() && self.idle.is_empty()
    }

    /// Changes no pending entry accounts for.
    pub fn uncovered(&self) -> impl Iterator<Item = &FieldChange> {
        self.changes
            .iter()
            .filter(|c| c.covered_by.is_empty())
            .map(|c| &c.change)
    }

    /// Returns `true` if every change is covered by some pending entry.
    pub fn is_consistent(&self) -> bool {
        self.uncovered().next().is_none()
    }
}

/// Diff `reference` against `working` and match each change to `pending`.
///
/// For a document that has never been persisted, `pending` is empty by
/// construction and every change shows as uncovered.
pub fn audit(reference: &Value, working: &Value, pending: &OperatorDocument) -> ChangeAudit {
    let entries: Vec<Entry> = pending
        .entries()
        .into_iter()
        .map(|(kind, path)| Entry {
            kind,
            path: path.clone(),
        })
        .collect();
    let mut touched = vec![false; entries.len()];

    let changes = field_changes(reference, working)
        .into_iter()
        .map(|change| {
            let covered_by = match FieldPath::parse(&change.path) {
                Ok(path) => entries
                    .iter()
                    .enumerate()
                    .filter(|(_, entry)| entry.path.overlaps(&path))
                    .map(|(i, entry)| {
                        touched[i] = true;
                        entry.clone()
                    })
                    .collect(),
                Err(_) => Vec::new(),
            };
            AuditedChange { change, covered_by }
        })
        .collect();

    let idle = entries
        .into_iter()
        .zip(touched)
        .filter_map(|(entry, touched)| (!touched).then_some(entry))
        .collect();

    ChangeAudit { changes, idle }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::ChangeKind;
    use serde_json::json;

    fn ops(value: Value) -> OperatorDocument {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn operators_cover_their_changes() {
        let reference = json!({ "a": 1, "b": "x", "c": ["x"], "o": { "k": 1 } });
        let working = json!({ "a": 2, "c": ["x", "y"], "o": { "k": 1, "n": { "m": 0 } } });
        let pending = ops(json!({
            "replace": { "a": 2, "o.n.m": 0 },
            "remove": { "b": true },
            "append": { "c": { "eachOf": ["y"] } }
        }));

        let report = audit(&reference, &working, &pending);
        assert!(report.is_consistent());
        assert!(report.idle.is_empty());
        assert_eq!(report.changes.len(), 4);
        let nested = report.changes.iter().find(|c| c.change.path == "o.n").unwrap();
        assert_eq!(nested.change.kind, ChangeKind::Added);
        assert_eq!(nested.covered_by[0].path.as_str(), "o.n.m");
    }

    #[test]
    fn array_element_writes_cover_the_array() {
        let reference = json!({ "c": ["x", "y"] });
        let working = json!({ "c": ["x", null] });
        let report = audit(&reference, &working, &ops(json!({ "remove": { "c.1": true } })));
        assert!(report.is_consistent());
    }

    #[test]
    fn reports_uncovered_changes_and_idle_entries() {
        let reference = json!({ "a": 1, "b": 1 });
        let working = json!({ "a": 1, "b": 2 });
        let report = audit(&reference, &working, &ops(json!({ "replace": { "a": 1 } })));

        let uncovered: Vec<&str> = report.uncovered().map(|c| c.path.as_str()).collect();
        assert_eq!(uncovered, vec!["b"]);
        assert!(!report.is_consistent());
        assert_eq!(report.idle.len(), 1);
        assert_eq!(report.idle[0].kind, UpdateKind::Replace);
    }

    #[test]
    fn nothing_pending_and_nothing_changed() {
        let doc = json!({ "a": 1 });
        let report = audit(&doc, &doc, &OperatorDocument::new());
        assert!(report.is_empty());
        assert!(report.is_consistent());
    }

    #[test]
    fn serializes_flat() {
        let report = audit(
            &json!({}),
            &json!({ "a": 1 }),
            &ops(json!({ "replace": { "a": 1 } })),
        );
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            json!({
                "changes": [{
                    "path": "a",
                    "kind": "added",
                    "after": 1,
                    "covered_by": [{ "kind": "replace", "path": "a" }]
                }],
                "idle": []
            })
        );
    }
}
