use serde::{Deserialize, Serialize};

/// Caller-settable builder options.
///
/// Whether a builder is new is not an option: it is fixed by the constructor
/// used ([`UpdateBuilder::create`](crate::UpdateBuilder::create) or
/// [`UpdateBuilder::load`](crate::UpdateBuilder::load)).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderOptions {
    /// Reserved for optimistic concurrency through a version key. Recorded
    /// and exposed, but does not yet change the emitted operators.
    pub use_version_key: bool,
}

impl BuilderOptions {
    pub fn with_version_key(mut self, enabled: bool) -> Self {
        self.use_version_key = enabled;
        self
    }
}
