//! Engine configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default command prefix.
pub const DEFAULT_PREFIX: &str = "/";

/// Settings shared by invocation and suggestion.
///
/// ```toml
/// prefix = "!"
/// suggestion_limit = 20
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Literal every command line must start with.
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Maximum number of suggestions returned; unlimited when unset.
    #[serde(default)]
    pub suggestion_limit: Option<usize>,
}

fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            suggestion_limit: None,
        }
    }
}

impl EngineConfig {
    /// Parses a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Loads a TOML file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_suggestion_limit(mut self, limit: usize) -> Self {
        self.suggestion_limit = Some(limit);
        self
    }
}
