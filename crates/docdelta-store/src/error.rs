use docdelta_types::{DocumentId, FieldPath, PathConflict, TypeError, UpdateKind};

/// Errors from document backend operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No document with this identity exists.
    #[error("document not found: {0}")]
    NotFound(DocumentId),

    /// A document with this identity was already inserted.
    #[error("document already exists: {0}")]
    AlreadyExists(DocumentId),

    /// The document to insert carries no `_id` field.
    #[error("document has no _id field")]
    MissingId,

    /// The `_id` field is present but not a valid UUID v4.
    #[error("invalid document id: {0}")]
    InvalidId(#[from] TypeError),

    /// The document is not shaped like a document (e.g. the root is not an object).
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// A replace or a created array could not be written at its path.
    #[error("unwritable path: {0}")]
    UnwritablePath(#[source] TypeError),

    /// An update tried to change the `_id` field.
    #[error("update may not modify _id (path {0})")]
    ImmutableId(FieldPath),

    /// An array operator targeted a value that is not an array.
    #[error("cannot apply {kind} to non-array value at {path}")]
    NotAnArray { kind: UpdateKind, path: FieldPath },

    /// Two operators in one update touch overlapping paths.
    #[error("update touches overlapping paths: {}", describe(.0))]
    ConflictingPaths(Vec<PathConflict>),

    /// The backend refused the write for a backend-specific reason.
    #[error("backend rejected the write: {0}")]
    Rejected(String),
}

fn describe(conflicts: &[PathConflict]) -> String {
    conflicts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result alias for backend operations.
pub type StoreResult<T> = Result<T, StoreError>;
