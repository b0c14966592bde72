//! Change audits for docdelta.
//!
//! The builder never derives operators from a diff; it records them as
//! mutations happen. This crate goes the other way round for diagnostics:
//! it diffs the reference snapshot against the working copy and checks that
//! the pending operators account for every difference.
//!
//! # Key Types
//!
//! - [`FieldChange`] -- One added, removed or modified field, keyed by dot path
//! - [`ChangeAudit`] -- Field changes paired with the pending entries covering them
//! - [`unified`] -- Line diff of two pretty-printed versions, for display

pub mod audit;
pub mod change;
pub mod render;

pub use audit::{audit, AuditedChange, ChangeAudit, Entry};
pub use change::{field_changes, ChangeKind, FieldChange};
pub use render::unified;
