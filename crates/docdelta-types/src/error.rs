use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid document id: {0}")]
    InvalidId(String),

    #[error("document id {id} is UUID version {actual}, expected version 4")]
    WrongUuidVersion { id: String, actual: usize },

    #[error("invalid field path {path:?}: {reason}")]
    InvalidPath { path: String, reason: &'static str },

    #[error("cannot write {path}: {reason}")]
    UnwritablePath { path: String, reason: String },
}
