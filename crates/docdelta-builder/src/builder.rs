use std::collections::BTreeMap;
use std::ops::Index;

use docdelta_diff::{audit, field_changes, ChangeAudit, FieldChange};
use docdelta_store::{DocumentBackend, StoreResult};
use docdelta_types::{tree, ArrayRemoval, DocumentId, FieldPath, OperatorDocument, ID_FIELD};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::{type_name, BuildError, BuildResult};
use crate::options::BuilderOptions;

/// What a successful [`UpdateBuilder::persist`] call sent to the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PersistOutcome {
    /// The whole document was inserted.
    Inserted,
    /// An update with this many operator entries was applied.
    Updated { entries: usize },
    /// Nothing was pending, so the backend was not contacted.
    Unchanged,
}

/// Change-tracking builder for one document edit session.
///
/// Holds the reference snapshot, the working copy and the pending operator
/// document. Mutations edit the working copy and, unless the document has
/// never been persisted, merge an entry into the pending operators. A new
/// document records no operators at all: its first persist inserts the
/// working copy verbatim.
///
/// Fields of the working copy read like attributes of the builder:
/// `builder["status"]` indexes the working copy (yielding `null` when
/// absent) and [`get`](Self::get) resolves nested paths. There is no
/// write-through indexing; the mutation methods are the only way in.
#[derive(Debug)]
pub struct UpdateBuilder {
    id: DocumentId,
    reference: Value,
    working: Value,
    pending: OperatorDocument,
    is_new: bool,
    options: BuilderOptions,
}

impl UpdateBuilder {
    // ---- Construction ----

    /// Start a brand-new document.
    ///
    /// `_id` is optional; a fresh UUID v4 is generated when absent. A
    /// supplied `_id` must itself be a valid UUID v4.
    pub fn create(base: Value, options: BuilderOptions) -> BuildResult<Self> {
        let mut document = match base {
            Value::Object(map) => map,
            other => return Err(BuildError::NotAnObject(type_name(&other))),
        };
        if !document.contains_key(ID_FIELD) {
            document.insert(ID_FIELD.to_string(), DocumentId::new().into());
        }
        Self::from_document(Value::Object(document), true, options)
    }

    /// Load an existing, already persisted document. It must carry a valid
    /// UUID v4 `_id`.
    pub fn load(document: Value, options: BuilderOptions) -> BuildResult<Self> {
        Self::from_document(document, false, options)
    }

    fn from_document(document: Value, is_new: bool, options: BuilderOptions) -> BuildResult<Self> {
        if !document.is_object() {
            return Err(BuildError::NotAnObject(type_name(&document)));
        }
        let id = DocumentId::from_document(&document)
            .map_err(BuildError::InvalidIdentity)?
            .ok_or(BuildError::MissingIdentity)?;
        debug!(%id, is_new, "builder created");
        Ok(Self {
            id,
            reference: document.clone(),
            working: document,
            pending: OperatorDocument::new(),
            is_new,
            options,
        })
    }

    // ---- State ----

    /// The document identity.
    pub fn id(&self) -> DocumentId {
        self.id
    }

    /// `true` until the first successful persist of a created document.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    pub fn options(&self) -> &BuilderOptions {
        &self.options
    }

    /// The last persisted (or loaded) state.
    pub fn reference(&self) -> &Value {
        &self.reference
    }

    /// Returns `true` if any operator is pending.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    // ---- Reads ----

    /// Resolve a dot path in the working copy. Malformed paths resolve to
    /// nothing.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let path = FieldPath::parse(path).ok()?;
        tree::get(&self.working, &path)
    }

    /// A top-level field of the working copy.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.working.get(name)
    }

    /// Deep copy of the working copy.
    pub fn value(&self) -> Value {
        self.working.clone()
    }

    /// Deep copy of the pending operators. Empty kinds are omitted when it
    /// is serialized or rendered.
    pub fn query(&self) -> OperatorDocument {
        self.pending.clone()
    }

    /// Flat map of every touched path to its pending payload.
    ///
    /// See [`OperatorDocument::flatten`] for collision rules.
    pub fn modified_paths(&self) -> BTreeMap<String, Value> {
        self.pending.flatten()
    }

    /// Field-level differences between the reference and the working copy.
    pub fn changes(&self) -> Vec<FieldChange> {
        field_changes(&self.reference, &self.working)
    }

    /// [`changes`](Self::changes) matched against the pending operators.
    ///
    /// On a loaded document every change is covered. A new document records
    /// no operators, so everything it holds shows as uncovered.
    pub fn audit(&self) -> ChangeAudit {
        audit(&self.reference, &self.working, &self.pending)
    }

    // ---- Mutations ----

    /// Set `path` to `value`. A no-op if the path already holds an equal
    /// value; otherwise the latest value for the path wins.
    pub fn replace(&mut self, path: &str, value: impl Into<Value>) -> BuildResult<()> {
        let path = Self::mutable_path(path)?;
        let value = value.into();
        if tree::get(&self.working, &path).is_some_and(|current| tree::deep_equal(current, &value)) {
            return Ok(());
        }
        tree::set(&mut self.working, &path, value.clone()).map_err(BuildError::UnwritablePath)?;
        if self.is_new {
            return Ok(());
        }
        debug!(%path, "pending replace");
        self.pending.replace.insert(path, value);
        Ok(())
    }

    /// Delete `path`. A no-op if nothing is there.
    pub fn remove(&mut self, path: &str) -> BuildResult<()> {
        let path = Self::mutable_path(path)?;
        if tree::unset(&mut self.working, &path).is_none() {
            return Ok(());
        }
        if self.is_new {
            return Ok(());
        }
        debug!(%path, "pending remove");
        self.pending.remove.insert(path, true);
        Ok(())
    }

    /// Append `values` to the array at `path`, creating it if absent.
    ///
    /// Repeated calls on one path accumulate into a single pending append.
    pub fn append<I>(&mut self, path: &str, values: I) -> BuildResult<()>
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let path = Self::mutable_path(path)?;
        self.check_array(&path, "append")?;
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();

        match tree::get_mut(&mut self.working, &path) {
            Some(Value::Array(items)) => items.extend(values.iter().cloned()),
            _ => tree::set(&mut self.working, &path, Value::Array(values.clone()))
                .map_err(BuildError::UnwritablePath)?,
        }
        if self.is_new {
            return Ok(());
        }
        debug!(%path, count = values.len(), "pending append");
        self.pending
            .append
            .entry(path)
            .or_default()
            .each_of
            .extend(values);
        Ok(())
    }

    /// Add each of `values` to the array at `path` unless an equal element
    /// is already there (or earlier in the same batch). Creates the array if
    /// absent.
    ///
    /// Only the values actually inserted are merged into the pending entry.
    pub fn set_insert<I>(&mut self, path: &str, values: I) -> BuildResult<()>
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let path = Self::mutable_path(path)?;
        self.check_array(&path, "set-insert")?;

        let existing = tree::get(&self.working, &path).and_then(Value::as_array);
        let created = existing.is_none();
        let mut inserted: Vec<Value> = Vec::new();
        for value in values.into_iter().map(Into::into) {
            let present = existing.is_some_and(|items| tree::contains_equal(items, &value));
            if !present && !tree::contains_equal(&inserted, &value) {
                inserted.push(value);
            }
        }

        match tree::get_mut(&mut self.working, &path) {
            Some(Value::Array(items)) => items.extend(inserted.iter().cloned()),
            _ => tree::set(&mut self.working, &path, Value::Array(inserted.clone()))
                .map_err(BuildError::UnwritablePath)?,
        }
        if self.is_new || (inserted.is_empty() && !created) {
            return Ok(());
        }
        debug!(%path, count = inserted.len(), "pending set-insert");
        let pending = &mut self.pending.set_insert.entry(path).or_default().each_of;
        for value in inserted {
            if !tree::contains_equal(pending, &value) {
                pending.push(value);
            }
        }
        Ok(())
    }

    /// Remove every element of the array at `path` equal to any of `values`.
    ///
    /// A no-op when the array is absent, empty, or holds none of the values.
    /// Removed values accumulate into one pending any-of removal. Fails with
    /// a conflict if a by-shape removal is already pending for the path.
    pub fn pull_values<I>(&mut self, path: &str, values: I) -> BuildResult<()>
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let path = Self::mutable_path(path)?;
        self.check_array(&path, "pull")?;
        if let Some(ArrayRemoval::Matching(_)) = self.pending.array_remove.get(&path) {
            return Err(BuildError::PullConflict {
                path,
                attempted: "pull by value",
                existing: "pull by shape",
            });
        }
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();

        let Some(Value::Array(items)) = tree::get_mut(&mut self.working, &path) else {
            return Ok(());
        };
        let mut removed: Vec<Value> = Vec::new();
        items.retain(|element| {
            if tree::contains_equal(&values, element) {
                removed.push(element.clone());
                false
            } else {
                true
            }
        });
        if self.is_new || removed.is_empty() {
            return Ok(());
        }

        debug!(%path, count = removed.len(), "pending pull by value");
        let entry = self
            .pending
            .array_remove
            .entry(path)
            .or_insert_with(|| ArrayRemoval::AnyOf { any_of: Vec::new() });
        if let ArrayRemoval::AnyOf { any_of } = entry {
            for value in removed {
                if !tree::contains_equal(any_of, &value) {
                    any_of.push(value);
                }
            }
        }
        Ok(())
    }

    /// Remove every element of the array at `path` that matches `matcher`
    /// (see [`tree::is_match`]).
    ///
    /// A no-op when the array is absent or empty. Fails with a conflict if
    /// any removal, of either style, is already pending for the path.
    pub fn pull_match(&mut self, path: &str, matcher: Map<String, Value>) -> BuildResult<()> {
        let path = Self::mutable_path(path)?;
        self.check_array(&path, "pull")?;
        if let Some(existing) = self.pending.array_remove.get(&path) {
            let existing = if existing.is_any_of() {
                "pull by value"
            } else {
                "pull by shape"
            };
            return Err(BuildError::PullConflict {
                path,
                attempted: "pull by shape",
                existing,
            });
        }

        let Some(Value::Array(items)) = tree::get_mut(&mut self.working, &path) else {
            return Ok(());
        };
        if items.is_empty() {
            return Ok(());
        }
        items.retain(|element| !tree::is_match(element, &matcher));
        if self.is_new {
            return Ok(());
        }
        debug!(%path, "pending pull by shape");
        self.pending
            .array_remove
            .insert(path, ArrayRemoval::Matching(matcher));
        Ok(())
    }

    // ---- Persistence ----

    /// Write pending changes to `backend`.
    ///
    /// A new document is inserted whole; an existing one is updated with the
    /// pending operators, or left alone if none are pending. On success the
    /// reference snapshot becomes a copy of the working copy and the pending
    /// operators are cleared. On failure nothing changes, so the call can be
    /// retried.
    pub async fn persist<B>(&mut self, backend: &B) -> StoreResult<PersistOutcome>
    where
        B: DocumentBackend + ?Sized,
    {
        let outcome = if self.is_new {
            backend.insert_new(&self.working).await?;
            self.is_new = false;
            info!(id = %self.id, "inserted new document");
            PersistOutcome::Inserted
        } else if !self.pending.is_empty() {
            backend.update_by_id(&self.id, &self.pending).await?;
            let entries = self.pending.len();
            info!(id = %self.id, entries, kinds = ?self.pending.kinds(), "applied update");
            PersistOutcome::Updated { entries }
        } else {
            debug!(id = %self.id, "nothing to persist");
            PersistOutcome::Unchanged
        };
        self.sync();
        Ok(outcome)
    }

    /// Discard pending operators and restore the working copy from the
    /// reference snapshot. The backend is not contacted.
    pub fn rollback(&mut self) {
        debug!(id = %self.id, discarded = self.pending.len(), "rollback");
        self.pending = OperatorDocument::new();
        self.working = self.reference.clone();
    }

    fn sync(&mut self) {
        self.pending = OperatorDocument::new();
        self.reference = self.working.clone();
    }

    // ---- Helpers ----

    fn mutable_path(path: &str) -> BuildResult<FieldPath> {
        let path = FieldPath::parse(path).map_err(BuildError::InvalidPath)?;
        if path.head() == ID_FIELD {
            return Err(BuildError::ImmutableIdentity(path));
        }
        Ok(path)
    }

    /// Array operators only accept arrays. Existing documents are checked
    /// against the reference snapshot, new ones against the working copy;
    /// the working copy must hold an array (or nothing) either way.
    fn check_array(&self, path: &FieldPath, operation: &'static str) -> BuildResult<()> {
        let base = if self.is_new {
            &self.working
        } else {
            &self.reference
        };
        for current in [tree::get(base, path), tree::get(&self.working, path)]
            .into_iter()
            .flatten()
        {
            if !current.is_array() {
                return Err(BuildError::NotAnArray {
                    operation,
                    path: path.clone(),
                    found: type_name(current),
                });
            }
        }
        Ok(())
    }
}

impl Index<&str> for UpdateBuilder {
    type Output = Value;

    /// Top-level field of the working copy, or `null` when absent.
    fn index(&self, field: &str) -> &Value {
        &self.working[field]
    }
}


#[cfg(test)]
mod properties {
    use super::*;
    use docdelta_store::apply_update;
    use proptest::prelude::*;
    use serde_json::json;

    fn loaded() -> UpdateBuilder {
        UpdateBuilder::load(
            json!({
                "_id": DocumentId::new().to_string(),
                "arr": [0],
                "n": 0,
                "s": "s",
                "o": { "k": 1 }
            }),
            BuilderOptions::default(),
        )
        .unwrap()
    }

    fn small_value() -> impl Strategy<Value = Value> + Clone {
        prop_oneof![
            any::<i8>().prop_map(|n| json!(n)),
            "[a-c]".prop_map(Value::String),
            any::<bool>().prop_map(Value::Bool),
        ]
    }

    /// One mutation against a path chosen from a fixed family per kind, so
    /// different kinds never touch overlapping paths. Removals target fields
    /// of the loaded document.
    #[derive(Clone, Debug)]
    enum Step {
        Replace(u8, Value),
        Remove(u8),
        Append(u8, Vec<Value>),
        SetInsert(u8, Vec<Value>),
        Pull(Vec<Value>),
    }

    fn step() -> impl Strategy<Value = Step> {
        let values = proptest::collection::vec(small_value(), 0..3);
        prop_oneof![
            (0u8..3, small_value()).prop_map(|(k, v)| Step::Replace(k, v)),
            (0u8..3).prop_map(Step::Remove),
            (0u8..2, values.clone()).prop_map(|(k, v)| Step::Append(k, v)),
            (0u8..2, values.clone()).prop_map(|(k, v)| Step::SetInsert(k, v)),
            values.prop_map(Step::Pull),
        ]
    }

    fn run(b: &mut UpdateBuilder, step: &Step) {
        let result = match step {
            Step::Replace(k, v) => b.replace(&format!("r{k}"), v.clone()),
            Step::Remove(k) => b.remove(["n", "s", "o.k"][usize::from(*k)]),
            Step::Append(k, v) => b.append(&format!("app{k}"), v.clone()),
            Step::SetInsert(k, v) => b.set_insert(&format!("set{k}"), v.clone()),
            Step::Pull(v) => b.pull_values("arr", v.clone()),
        };
        result.unwrap();
    }

    proptest! {
        #[test]
        fn replace_twice_is_idempotent(v in small_value()) {
            let mut b = loaded();
            b.replace("field", v.clone()).unwrap();
            let once = b.query();
            b.replace("field", v).unwrap();
            prop_assert_eq!(b.query(), once);
            prop_assert_eq!(b.query().len(), 1);
        }

        #[test]
        fn append_composes(a in small_value(), rest in proptest::collection::vec(small_value(), 0..4)) {
            let mut b = loaded();
            b.append("p", [a.clone()]).unwrap();
            b.append("p", rest.clone()).unwrap();
            let mut all = vec![a];
            all.extend(rest);
            prop_assert_eq!(b["p"].clone(), Value::Array(all.clone()));
            prop_assert_eq!(b.query().to_value(), json!({ "append": { "p": { "eachOf": all } } }));
        }

        #[test]
        fn pulling_absent_values_changes_nothing(v in "[d-z]{1,3}") {
            let mut b = loaded();
            b.pull_values("arr", [v]).unwrap();
            prop_assert!(!b.has_pending());
            prop_assert_eq!(b.value(), b.reference().clone());
        }

        #[test]
        fn repeated_pull_values_never_conflicts(batches in proptest::collection::vec(
            proptest::collection::vec(0i8..4, 0..3), 1..5,
        )) {
            let mut b = UpdateBuilder::load(
                json!({ "_id": DocumentId::new().to_string(), "arr": [0, 1, 2, 3, 0, 1] }),
                BuilderOptions::default(),
            ).unwrap();
            for batch in &batches {
                b.pull_values("arr", batch.iter().map(|n| json!(n))).unwrap();
            }
            prop_assert!(b.query().count(docdelta_types::UpdateKind::ArrayRemove) <= 1);
        }

        #[test]
        fn new_documents_compile_nothing(steps in proptest::collection::vec(step(), 0..12)) {
            let mut b = UpdateBuilder::create(json!({ "arr": [0] }), BuilderOptions::default()).unwrap();
            for s in &steps {
                run(&mut b, s);
            }
            prop_assert!(b.query().is_empty());
        }

        #[test]
        fn compiled_update_reproduces_working_copy(steps in proptest::collection::vec(step(), 0..12)) {
            let mut b = loaded();
            for s in &steps {
                run(&mut b, s);
            }
            let mut replayed = b.reference().clone();
            apply_update(&mut replayed, &b.query()).unwrap();
            prop_assert_eq!(replayed, b.value());
        }

        #[test]
        fn every_change_is_covered(steps in proptest::collection::vec(step(), 0..12)) {
            let mut b = loaded();
            for s in &steps {
                run(&mut b, s);
            }
            let report = b.audit();
            prop_assert!(report.is_consistent(), "{:?}", report);
        }
    }
}
