use docdelta_types::{FieldPath, TypeError};
use serde_json::Value;
use thiserror::Error;

/// Errors raised synchronously by builder construction and mutation calls.
///
/// Three families: construction errors (bad or missing identity, non-object
/// root), type errors (array operators on non-arrays, bad paths, writes to
/// `_id`) and conflict errors (incompatible array-removal styles on one
/// path). Persistence failures are not wrapped; `persist` returns the
/// backend's own error.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("document has no _id field")]
    MissingIdentity,

    #[error("invalid document identity: {0}")]
    InvalidIdentity(#[source] TypeError),

    #[error("document root must be an object, got {0}")]
    NotAnObject(&'static str),

    #[error("invalid field path: {0}")]
    InvalidPath(#[source] TypeError),

    #[error("cannot {operation} at {path}: existing value is {found}, not an array")]
    NotAnArray {
        operation: &'static str,
        path: FieldPath,
        found: &'static str,
    },

    #[error("{0}")]
    UnwritablePath(#[source] TypeError),

    #[error("cannot modify identity field {0}")]
    ImmutableIdentity(FieldPath),

    #[error("cannot {attempted} at {path}: a {existing} is already pending; persist first")]
    PullConflict {
        path: FieldPath,
        attempted: &'static str,
        existing: &'static str,
    },

    #[error("mutation #{index} failed: {source}")]
    AtMutation {
        index: usize,
        #[source]
        source: Box<BuildError>,
    },
}

impl BuildError {
    /// Missing or invalid identity, or a non-object document.
    pub fn is_construction(&self) -> bool {
        match self {
            BuildError::MissingIdentity
            | BuildError::InvalidIdentity(_)
            | BuildError::NotAnObject(_) => true,
            BuildError::AtMutation { source, .. } => source.is_construction(),
            _ => false,
        }
    }

    /// An operation was applied to a value or path it does not accept, or a
    /// write would have had to replace or pad an existing array.
    pub fn is_type_error(&self) -> bool {
        match self {
            BuildError::NotAnArray { .. }
            | BuildError::InvalidPath(_)
            | BuildError::UnwritablePath(_)
            | BuildError::ImmutableIdentity(_) => true,
            BuildError::AtMutation { source, .. } => source.is_type_error(),
            _ => false,
        }
    }

    /// Two array-removal styles collided on one path.
    pub fn is_conflict(&self) -> bool {
        match self {
            BuildError::PullConflict { .. } => true,
            BuildError::AtMutation { source, .. } => source.is_conflict(),
            _ => false,
        }
    }
}

/// Convenience alias for builder results.
pub type BuildResult<T> = Result<T, BuildError>;

/// JSON type name of a value, for error messages.
pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
