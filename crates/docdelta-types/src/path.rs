//! Dot-separated field paths.
//!
//! A [`FieldPath`] addresses a location inside a document: `a.b.c` walks
//! object keys `a`, `b`, `c`. When a segment meets an array it is read as an
//! element index, so `tags.0` is the first element of `tags`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// A validated, dot-separated path into a document.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FieldPath {
    raw: String,
    segments: Vec<String>,
}

impl FieldPath {
    /// Parse a dot-separated path. Empty paths and empty segments are rejected.
    pub fn parse(raw: &str) -> Result<Self, TypeError> {
        if raw.is_empty() {
            return Err(TypeError::InvalidPath {
                path: raw.to_string(),
                reason: "path is empty",
            });
        }
        let segments: Vec<String> = raw.split('.').map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(TypeError::InvalidPath {
                path: raw.to_string(),
                reason: "path contains an empty segment",
            });
        }
        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// The path as written, e.g. `x.y.z`.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The individual segments.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The first segment (the top-level field name).
    pub fn head(&self) -> &str {
        &self.segments[0]
    }

    /// Number of segments. Always at least one.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Paths are never empty; provided for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Returns `true` if `self` equals `other` or is a segment-wise ancestor
    /// of it. `a.b` is a prefix of `a.b.c` but not of `a.bc`.
    pub fn is_prefix_of(&self, other: &FieldPath) -> bool {
        self.segments.len() <= other.segments.len()
            && self.segments.iter().zip(&other.segments).all(|(a, b)| a == b)
    }

    /// Returns `true` if either path is a prefix of the other, i.e. writing
    /// one would touch the location addressed by the other.
    pub fn overlaps(&self, other: &FieldPath) -> bool {
        self.is_prefix_of(other) || other.is_prefix_of(self)
    }
}

impl fmt::Debug for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldPath({})", self.raw)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for FieldPath {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for FieldPath {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl TryFrom<&str> for FieldPath {
    type Error = TypeError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl From<FieldPath> for String {
    fn from(path: FieldPath) -> Self {
        path.raw
    }
}

impl AsRef<str> for FieldPath {
    fn as_ref(&self) -> &str {
        &self.raw
    }
}
