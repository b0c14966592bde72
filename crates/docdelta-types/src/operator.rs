//! Update operator documents.
//!
//! An [`OperatorDocument`] is the compiled form of a set of pending changes:
//! five independent maps, one per [`UpdateKind`], each keyed by field path.
//! Its serde representation is the canonical wire shape, in which empty kinds
//! are omitted entirely:
//!
//! ```json
//! {
//!   "replace":     { "a": 2 },
//!   "remove":      { "b": true },
//!   "append":      { "c": { "eachOf": [1, 2] } },
//!   "setInsert":   { "d": { "eachOf": ["x"] } },
//!   "arrayRemove": { "e": { "anyOf": [3] }, "f": { "kind": "old" } }
//! }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::path::FieldPath;
use crate::tree;

/// The five kinds of update operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UpdateKind {
    /// Overwrite the value at a path.
    Replace,
    /// Delete the value at a path.
    Remove,
    /// Append values to an array.
    Append,
    /// Append values to an array unless already present.
    SetInsert,
    /// Remove matching elements from an array.
    ArrayRemove,
}

impl UpdateKind {
    /// Every kind, in emission order.
    pub const ALL: [UpdateKind; 5] = [
        UpdateKind::Replace,
        UpdateKind::Remove,
        UpdateKind::Append,
        UpdateKind::SetInsert,
        UpdateKind::ArrayRemove,
    ];

    /// Top-level key in the canonical operator document.
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateKind::Replace => "replace",
            UpdateKind::Remove => "remove",
            UpdateKind::Append => "append",
            UpdateKind::SetInsert => "setInsert",
            UpdateKind::ArrayRemove => "arrayRemove",
        }
    }

    /// Top-level key in the given dialect.
    pub fn operator_name(&self, dialect: Dialect) -> &'static str {
        match (dialect, self) {
            (Dialect::Canonical, kind) => kind.as_str(),
            (Dialect::Mongo, UpdateKind::Replace) => "$set",
            (Dialect::Mongo, UpdateKind::Remove) => "$unset",
            (Dialect::Mongo, UpdateKind::Append) => "$push",
            (Dialect::Mongo, UpdateKind::SetInsert) => "$addToSet",
            (Dialect::Mongo, UpdateKind::ArrayRemove) => "$pull",
        }
    }
}

impl fmt::Display for UpdateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Naming scheme used when rendering an operator document.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// `replace` / `remove` / `append` / `setInsert` / `arrayRemove`.
    #[default]
    Canonical,
    /// `$set` / `$unset` / `$push` / `$addToSet` / `$pull`.
    Mongo,
}

impl Dialect {
    fn each_key(self) -> &'static str {
        match self {
            Dialect::Canonical => "eachOf",
            Dialect::Mongo => "$each",
        }
    }

    fn any_of_key(self) -> &'static str {
        match self {
            Dialect::Canonical => "anyOf",
            Dialect::Mongo => "$in",
        }
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "canonical" => Ok(Dialect::Canonical),
            "mongo" => Ok(Dialect::Mongo),
            other => Err(format!("unknown dialect {other:?} (expected canonical or mongo)")),
        }
    }
}

/// Accumulated list of values for `append` and `setInsert`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EachOf {
    #[serde(rename = "eachOf")]
    pub each_of: Vec<Value>,
}

impl EachOf {
    pub fn new(values: Vec<Value>) -> Self {
        Self { each_of: values }
    }
}

/// Array element removal descriptor.
///
/// A path carries one form or the other, never both.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArrayRemoval {
    /// Remove every element equal to one of these values (see [`tree::deep_equal`]).
    AnyOf {
        #[serde(rename = "anyOf")]
        any_of: Vec<Value>,
    },
    /// Remove every element matching this shape (see [`tree::is_match`]).
    Matching(Map<String, Value>),
}

impl ArrayRemoval {
    /// Returns `true` if `element` would be removed by this descriptor.
    pub fn removes(&self, element: &Value) -> bool {
        match self {
            ArrayRemoval::AnyOf { any_of } => tree::contains_equal(any_of, element),
            ArrayRemoval::Matching(matcher) => tree::is_match(element, matcher),
        }
    }

    pub fn is_any_of(&self) -> bool {
        matches!(self, ArrayRemoval::AnyOf { .. })
    }

    fn render(&self, dialect: Dialect) -> Value {
        match self {
            ArrayRemoval::AnyOf { any_of } => {
                let mut payload = Map::new();
                payload.insert(dialect.any_of_key().to_string(), Value::Array(any_of.clone()));
                Value::Object(payload)
            }
            ArrayRemoval::Matching(matcher) => Value::Object(matcher.clone()),
        }
    }
}

/// Two pending entries whose paths overlap.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathConflict {
    pub first: (UpdateKind, FieldPath),
    pub second: (UpdateKind, FieldPath),
}

impl fmt::Display for PathConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} overlaps {} {}",
            self.first.0, self.first.1, self.second.0, self.second.1
        )
    }
}

/// Compiled set of update operators, one map per [`UpdateKind`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OperatorDocument {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub replace: BTreeMap<FieldPath, Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub remove: BTreeMap<FieldPath, bool>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub append: BTreeMap<FieldPath, EachOf>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub set_insert: BTreeMap<FieldPath, EachOf>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub array_remove: BTreeMap<FieldPath, ArrayRemoval>,
}

impl OperatorDocument {
    /// A fresh, empty operator document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if no kind has any entry.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of entries across all kinds.
    pub fn len(&self) -> usize {
        self.replace.len()
            + self.remove.len()
            + self.append.len()
            + self.set_insert.len()
            + self.array_remove.len()
    }

    /// Number of entries of one kind.
    pub fn count(&self, kind: UpdateKind) -> usize {
        match kind {
            UpdateKind::Replace => self.replace.len(),
            UpdateKind::Remove => self.remove.len(),
            UpdateKind::Append => self.append.len(),
            UpdateKind::SetInsert => self.set_insert.len(),
            UpdateKind::ArrayRemove => self.array_remove.len(),
        }
    }

    /// The kinds that have at least one entry, in emission order.
    pub fn kinds(&self) -> Vec<UpdateKind> {
        UpdateKind::ALL
            .into_iter()
            .filter(|kind| self.count(*kind) > 0)
            .collect()
    }

    /// Every `(kind, path)` pair, in emission order.
    pub fn entries(&self) -> Vec<(UpdateKind, &FieldPath)> {
        let mut out = Vec::with_capacity(self.len());
        out.extend(self.replace.keys().map(|p| (UpdateKind::Replace, p)));
        out.extend(self.remove.keys().map(|p| (UpdateKind::Remove, p)));
        out.extend(self.append.keys().map(|p| (UpdateKind::Append, p)));
        out.extend(self.set_insert.keys().map(|p| (UpdateKind::SetInsert, p)));
        out.extend(self.array_remove.keys().map(|p| (UpdateKind::ArrayRemove, p)));
        out
    }

    /// Render to JSON in the given dialect, omitting empty kinds.
    pub fn render(&self, dialect: Dialect) -> Value {
        let mut out = Map::new();
        for kind in self.kinds() {
            out.insert(
                kind.operator_name(dialect).to_string(),
                Value::Object(self.payloads(kind, dialect)),
            );
        }
        Value::Object(out)
    }

    /// Canonical JSON rendering. Equivalent to serializing with serde.
    pub fn to_value(&self) -> Value {
        self.render(Dialect::Canonical)
    }

    /// A single flat map of path to canonical payload across all kinds.
    ///
    /// Kinds are merged in emission order, so on a path collision the later
    /// kind wins. This is a diagnostic view, not an operator document.
    pub fn flatten(&self) -> BTreeMap<String, Value> {
        let mut flat = BTreeMap::new();
        for kind in UpdateKind::ALL {
            flat.extend(self.payloads(kind, Dialect::Canonical));
        }
        flat
    }

    /// Every pair of entries whose paths are equal or nested in one another.
    ///
    /// Document databases reject update documents in which two operators
    /// touch overlapping paths, so a non-empty result means the document
    /// cannot be applied as one update.
    pub fn conflicting_paths(&self) -> Vec<PathConflict> {
        let entries = self.entries();
        let mut conflicts = Vec::new();
        for (i, (first_kind, first_path)) in entries.iter().enumerate() {
            for (second_kind, second_path) in &entries[i + 1..] {
                if first_path.overlaps(second_path) {
                    conflicts.push(PathConflict {
                        first: (*first_kind, (*first_path).clone()),
                        second: (*second_kind, (*second_path).clone()),
                    });
                }
            }
        }
        conflicts
    }

    fn payloads(&self, kind: UpdateKind, dialect: Dialect) -> Map<String, Value> {
        let each = |list: &EachOf| {
            let mut payload = Map::new();
            payload.insert(dialect.each_key().to_string(), Value::Array(list.each_of.clone()));
            Value::Object(payload)
        };
        match kind {
            UpdateKind::Replace => self
                .replace
                .iter()
                .map(|(path, value)| (path.to_string(), value.clone()))
                .collect(),
            UpdateKind::Remove => self
                .remove
                .iter()
                .map(|(path, flag)| (path.to_string(), Value::Bool(*flag)))
                .collect(),
            UpdateKind::Append => self
                .append
                .iter()
                .map(|(path, list)| (path.to_string(), each(list)))
                .collect(),
            UpdateKind::SetInsert => self
                .set_insert
                .iter()
                .map(|(path, list)| (path.to_string(), each(list)))
                .collect(),
            UpdateKind::ArrayRemove => self
                .array_remove
                .iter()
                .map(|(path, removal)| (path.to_string(), removal.render(dialect)))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn p(s: &str) -> FieldPath {
        FieldPath::parse(s).unwrap()
    }

    fn sample() -> OperatorDocument {
        let mut doc = OperatorDocument::new();
        doc.replace.insert(p("a"), json!(2));
        doc.remove.insert(p("b"), true);
        doc.append.insert(p("c"), EachOf::new(vec![json!(1), json!(2)]));
        doc.set_insert.insert(p("d"), EachOf::new(vec![json!("x")]));
        doc.array_remove.insert(
            p("e"),
            ArrayRemoval::AnyOf {
                any_of: vec![json!(3)],
            },
        );
        doc.array_remove.insert(
            p("f"),
            ArrayRemoval::Matching(json!({ "kind": "old" }).as_object().unwrap().clone()),
        );
        doc
    }

    #[test]
    fn empty_document_renders_as_empty_object() {
        let doc = OperatorDocument::new();
        assert!(doc.is_empty());
        assert_eq!(serde_json::to_value(&doc).unwrap(), json!({}));
        assert_eq!(doc.to_value(), json!({}));
        assert!(doc.kinds().is_empty());
    }

    #[test]
    fn empty_kinds_are_omitted() {
        let mut doc = OperatorDocument::new();
        doc.remove.insert(p("gone"), true);
        assert_eq!(serde_json::to_value(&doc).unwrap(), json!({ "remove": { "gone": true } }));
        assert_eq!(doc.kinds(), vec![UpdateKind::Remove]);
    }

    #[test]
    fn canonical_shape() {
        let expected = json!({
            "replace": { "a": 2 },
            "remove": { "b": true },
            "append": { "c": { "eachOf": [1, 2] } },
            "setInsert": { "d": { "eachOf": ["x"] } },
            "arrayRemove": { "e": { "anyOf": [3] }, "f": { "kind": "old" } }
        });
        let doc = sample();
        assert_eq!(serde_json::to_value(&doc).unwrap(), expected);
        assert_eq!(doc.to_value(), expected);
        assert_eq!(doc.len(), 6);
    }

    #[test]
    fn mongo_dialect_shape() {
        assert_eq!(
            sample().render(Dialect::Mongo),
            json!({
                "$set": { "a": 2 },
                "$unset": { "b": true },
                "$push": { "c": { "$each": [1, 2] } },
                "$addToSet": { "d": { "$each": ["x"] } },
                "$pull": { "e": { "$in": [3] }, "f": { "kind": "old" } }
            })
        );
    }

    #[test]
    fn deserializes_canonical_shape() {
        let doc: OperatorDocument = serde_json::from_value(sample().to_value()).unwrap();
        assert_eq!(doc, sample());
        assert!(doc.array_remove[&p("e")].is_any_of());
        assert!(!doc.array_remove[&p("f")].is_any_of());
    }

    #[test]
    fn rejects_unknown_operator_keys() {
        let err = serde_json::from_value::<OperatorDocument>(json!({ "$inc": { "a": 1 } }));
        assert!(err.is_err());
    }

    #[test]
    fn flatten_later_kinds_win() {
        let mut doc = OperatorDocument::new();
        doc.replace.insert(p("a"), json!(1));
        doc.remove.insert(p("a"), true);
        doc.append.insert(p("b"), EachOf::new(vec![json!(1)]));
        let flat = doc.flatten();
        assert_eq!(flat.len(), 2);
        assert_eq!(flat["a"], json!(true));
        assert_eq!(flat["b"], json!({ "eachOf": [1] }));
    }

    #[test]
    fn removal_descriptors() {
        let any = ArrayRemoval::AnyOf {
            any_of: vec![json!("x"), json!({ "k": 1 })],
        };
        assert!(any.removes(&json!("x")));
        assert!(any.removes(&json!({ "k": 1 })));
        assert!(!any.removes(&json!({ "k": 1, "j": 2 })));

        let shape = ArrayRemoval::Matching(json!({ "k": 1 }).as_object().unwrap().clone());
        assert!(shape.removes(&json!({ "k": 1, "j": 2 })));
        assert!(!shape.removes(&json!("x")));
    }

    #[test]
    fn detects_overlapping_paths() {
        let mut doc = OperatorDocument::new();
        doc.replace.insert(p("a.0"), json!(5));
        doc.append.insert(p("a"), EachOf::new(vec![json!(2)]));
        doc.remove.insert(p("b"), true);
        doc.replace.insert(p("bc"), json!(1));

        let conflicts = doc.conflicting_paths();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].first, (UpdateKind::Replace, p("a.0")));
        assert_eq!(conflicts[0].second, (UpdateKind::Append, p("a")));
        assert_eq!(conflicts[0].to_string(), "replace a.0 overlaps append a");
    }

    #[test]
    fn sample_has_no_conflicts() {
        assert!(sample().conflicting_paths().is_empty());
    }

    #[test]
    fn dialect_parsing() {
        assert_eq!("mongo".parse::<Dialect>().unwrap(), Dialect::Mongo);
        assert_eq!("canonical".parse::<Dialect>().unwrap(), Dialect::Canonical);
        assert!("sql".parse::<Dialect>().is_err());
        assert_eq!(Dialect::default(), Dialect::Canonical);
    }
}
