use std::path::Path;

use anyhow::Context;
use docdelta_builder::BuilderOptions;
use docdelta_types::Dialect;
use serde::{Deserialize, Serialize};

/// Settings read from the optional `--config` TOML file.
///
/// ```toml
/// dialect = "mongo"
///
/// [builder]
/// use_version_key = false
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    pub dialect: Dialect,
    pub builder: BuilderOptions,
}

impl CliConfig {
    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load from `path`, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// The dialect to render with: the flag if given, else the file's.
    pub fn dialect_or(&self, flag: Option<Dialect>) -> Dialect {
        flag.unwrap_or(self.dialect)
    }
}
