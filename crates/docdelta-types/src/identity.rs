use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::TypeError;

/// Name of the identity field carried by every document.
pub const ID_FIELD: &str = "_id";

/// Identity of a persisted document.
///
/// A `DocumentId` is always a version-4 UUID. It serializes as its hyphenated
/// string form, which is also how it appears in the document's `_id` field.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentId(Uuid);

impl DocumentId {
    /// Generate a fresh random identity.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID, rejecting anything that is not version 4.
    pub fn from_uuid(uuid: Uuid) -> Result<Self, TypeError> {
        match uuid.get_version_num() {
            4 => Ok(Self(uuid)),
            actual => Err(TypeError::WrongUuidVersion {
                id: uuid.to_string(),
                actual,
            }),
        }
    }

    /// Parse and validate a string identity.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let uuid = Uuid::parse_str(s).map_err(|e| TypeError::InvalidId(format!("{s:?}: {e}")))?;
        Self::from_uuid(uuid)
    }

    /// Read the identity out of a document's `_id` field.
    ///
    /// Returns `Ok(None)` when the document has no `_id`. A present `_id` that
    /// is not a string or not a valid UUID v4 is an error.
    pub fn from_document(document: &Value) -> Result<Option<Self>, TypeError> {
        match document.get(ID_FIELD) {
            None => Ok(None),
            Some(Value::String(s)) => Self::parse(s).map(Some),
            Some(other) => Err(TypeError::InvalidId(format!(
                "{ID_FIELD} must be a string, got {other}"
            ))),
        }
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Short representation (first 8 characters of the UUID).
    pub fn short_id(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for DocumentId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DocumentId {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<DocumentId> for String {
    fn from(id: DocumentId) -> Self {
        id.0.to_string()
    }
}

impl From<DocumentId> for Value {
    fn from(id: DocumentId) -> Self {
        Value::String(id.0.to_string())
    }
}

impl fmt::Debug for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DocumentId({})", self.short_id())
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
