//! Serializable mutation scripts.
//!
//! A [`Mutation`] names one builder call and its arguments, so a sequence of
//! edits can be stored as JSON or TOML and replayed against a builder.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::builder::UpdateBuilder;
use crate::error::{BuildError, BuildResult};

/// One builder call, tagged by `op`.
///
/// ```json
/// { "op": "append", "path": "tags", "values": ["new"] }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase", deny_unknown_fields)]
pub enum Mutation {
    Replace { path: String, value: Value },
    Remove { path: String },
    Append { path: String, values: Vec<Value> },
    SetInsert { path: String, values: Vec<Value> },
    PullValues { path: String, values: Vec<Value> },
    PullMatch { path: String, matcher: Map<String, Value> },
}

impl Mutation {
    /// The dot path this mutation targets.
    pub fn path(&self) -> &str {
        match self {
            Mutation::Replace { path, .. }
            | Mutation::Remove { path }
            | Mutation::Append { path, .. }
            | Mutation::SetInsert { path, .. }
            | Mutation::PullValues { path, .. }
            | Mutation::PullMatch { path, .. } => path,
        }
    }

    /// Perform this mutation on `builder`.
    pub fn apply(&self, builder: &mut UpdateBuilder) -> BuildResult<()> {
        match self {
            Mutation::Replace { path, value } => builder.replace(path, value.clone()),
            Mutation::Remove { path } => builder.remove(path),
            Mutation::Append { path, values } => builder.append(path, values.iter().cloned()),
            Mutation::SetInsert { path, values } => {
                builder.set_insert(path, values.iter().cloned())
            }
            Mutation::PullValues { path, values } => {
                builder.pull_values(path, values.iter().cloned())
            }
            Mutation::PullMatch { path, matcher } => builder.pull_match(path, matcher.clone()),
        }
    }
}

impl UpdateBuilder {
    /// Apply mutations in order, stopping at the first failure.
    ///
    /// Mutations before the failing one stay applied; the error carries the
    /// zero-based index of the one that failed.
    pub fn apply_all<'a, I>(&mut self, mutations: I) -> BuildResult<()>
    where
        I: IntoIterator<Item = &'a Mutation>,
    {
        for (index, mutation) in mutations.into_iter().enumerate() {
            mutation
                .apply(self)
                .map_err(|source| BuildError::AtMutation {
                    index,
                    source: Box::new(source),
                })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::BuilderOptions;
    use docdelta_types::DocumentId;
    use serde_json::json;

    fn loaded() -> UpdateBuilder {
        UpdateBuilder::load(
            json!({ "_id": DocumentId::new().to_string(), "a": 1, "c": ["x", { "k": 1 }] }),
            BuilderOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn deserialize_script() {
        let script: Vec<Mutation> = serde_json::from_value(json!([
            { "op": "replace", "path": "a", "value": 2 },
            { "op": "remove", "path": "b" },
            { "op": "append", "path": "c", "values": [1] },
            { "op": "setInsert", "path": "d", "values": [1, 1] },
            { "op": "pullValues", "path": "c", "values": ["x"] },
            { "op": "pullMatch", "path": "e", "matcher": { "k": 1 } }
        ]))
        .unwrap();
        assert_eq!(script.len(), 6);
        assert_eq!(script[3], Mutation::SetInsert { path: "d".into(), values: vec![json!(1), json!(1)] });
        assert_eq!(script[5].path(), "e");
    }

    #[test]
    fn unknown_ops_and_fields_are_rejected() {
        assert!(serde_json::from_value::<Mutation>(json!({ "op": "rename", "path": "a" })).is_err());
        assert!(serde_json::from_value::<Mutation>(json!({ "op": "remove", "path": "a", "x": 1 }))
            .is_err());
    }

    #[test]
    fn apply_all_matches_direct_calls() {
        let script = vec![
            Mutation::Replace { path: "a".into(), value: json!(2) },
            Mutation::Append { path: "c".into(), values: vec![json!("y")] },
            Mutation::PullMatch {
                path: "c".into(),
                matcher: json!({ "k": 1 }).as_object().cloned().unwrap(),
            },
        ];
        let mut scripted = loaded();
        scripted.apply_all(&script).unwrap();

        let mut direct = loaded();
        direct.replace("a", 2).unwrap();
        direct.append("c", ["y"]).unwrap();
        direct
            .pull_match("c", json!({ "k": 1 }).as_object().cloned().unwrap())
            .unwrap();

        assert_eq!(scripted.query(), direct.query());
        assert_eq!(scripted["c"], json!(["x", "y"]));
    }

    #[test]
    fn apply_all_stops_at_first_failure() {
        let script = vec![
            Mutation::Replace { path: "a".into(), value: json!(5) },
            Mutation::Append { path: "a".into(), values: vec![json!(1)] },
            Mutation::Remove { path: "c".into() },
        ];
        let mut b = loaded();
        let err = b.apply_all(&script).unwrap_err();
        assert!(matches!(err, BuildError::AtMutation { index: 1, .. }));
        assert!(err.is_type_error());
        assert!(err.to_string().starts_with("mutation #1 failed"));
        assert_eq!(b["a"], json!(5));
        assert!(b.field("c").is_some());
    }

    #[test]
    fn conflicts_surface_through_scripts() {
        let matcher = json!({ "k": 1 }).as_object().cloned().unwrap();
        let script = vec![
            Mutation::PullValues { path: "c".into(), values: vec![json!("x")] },
            Mutation::PullMatch { path: "c".into(), matcher },
        ];
        let err = loaded().apply_all(&script).unwrap_err();
        assert!(err.is_conflict());
    }
}
