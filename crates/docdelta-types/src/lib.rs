//! Foundation types for docdelta.
//!
//! This crate provides the identity, addressing, and operator types shared by
//! every other docdelta crate. Every other docdelta crate depends on
//! `docdelta-types`.
//!
//! # Key Types
//!
//! - [`DocumentId`] -- UUID v4 document identity
//! - [`FieldPath`] -- Parsed dot-separated field path (`x.y.z`)
//! - [`OperatorDocument`] -- Compiled set of pending update operators
//! - [`ArrayRemoval`] -- Any-of or by-shape array element removal descriptor
//! - [`tree`] -- Pure get/set/unset/has/is_match functions over JSON trees

pub mod error;
pub mod identity;
pub mod operator;
pub mod path;
pub mod tree;

pub use error::TypeError;
pub use identity::{DocumentId, ID_FIELD};
pub use operator::{ArrayRemoval, Dialect, EachOf, OperatorDocument, PathConflict, UpdateKind};
pub use path::FieldPath;
