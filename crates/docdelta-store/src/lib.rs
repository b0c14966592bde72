//! Persistence backends for docdelta.
//!
//! A backend accepts two kinds of write: inserting a brand-new document
//! verbatim, and updating an existing document by identity with a compiled
//! [`OperatorDocument`](docdelta_types::OperatorDocument).
//!
//! # Backends
//!
//! All backends implement the [`DocumentBackend`] trait:
//!
//! - [`InMemoryBackend`] -- `HashMap`-based store for tests, demos, and embedding
//!
//! # Design Rules
//!
//! 1. A write either applies completely or leaves the stored document untouched.
//! 2. Updates whose operators touch overlapping paths are rejected, as a
//!    document database would.
//! 3. The `_id` field is immutable once inserted.
//! 4. All errors are propagated to the caller, never retried.

pub mod apply;
pub mod error;
pub mod memory;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use apply::apply_update;
pub use error::{StoreError, StoreResult};
pub use memory::{InMemoryBackend, WriteRecord};
pub use traits::DocumentBackend;
