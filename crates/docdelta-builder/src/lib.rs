//! Change-tracking update builder.
//!
//! An [`UpdateBuilder`] holds two copies of one document: the reference
//! snapshot (what the backend last acknowledged) and the working copy (what
//! the caller has built since). Every mutation method edits the working copy
//! immediately and records the matching update operator, so persisting sends
//! only what changed rather than the whole document.
//!
//! ```ignore
//! let mut doc = UpdateBuilder::load(stored, BuilderOptions::default())?;
//! doc.replace("status", json!("shipped"))?;
//! doc.append("history", [json!("shipped")])?;
//! doc.persist(&backend).await?;
//! ```

pub mod builder;
pub mod error;
pub mod mutation;
pub mod options;

pub use builder::{PersistOutcome, UpdateBuilder};
pub use error::{BuildError, BuildResult};
pub use mutation::Mutation;
pub use options::BuilderOptions;

// Re-export key types
pub use docdelta_diff::{ChangeAudit, ChangeKind, FieldChange};
pub use docdelta_store::{DocumentBackend, InMemoryBackend, StoreError, StoreResult};
pub use docdelta_types::{ArrayRemoval, Dialect, DocumentId, EachOf, FieldPath, OperatorDocument, UpdateKind};
