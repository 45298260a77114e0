//! Contract configuration via `prefbox.toml`
//!
//! The same settings the builder takes, read from a file so they can change
//! without recompiling. Unknown values are rejected when the file is loaded.

use prefbox_core::{Binding, DefaultMode, PrefError, PrefResult, SavePolicy, StoreMode};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Conventional config file name
pub const CONFIG_FILE_NAME: &str = "prefbox.toml";

/// Settings loaded from `prefbox.toml`
///
/// # Example
///
/// ```toml
/// binding = "named"
/// name = "settings"
/// mode = "private"
/// save_policy = "commit"
/// default_mode = "null"
/// version = 2
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PrefBoxConfig {
    /// `"default"`, `"scoped"` or `"named"`
    #[serde(default = "default_binding")]
    pub binding: String,
    /// Scope or store name; required for scoped and named bindings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Store mode requested from the provider
    #[serde(default)]
    pub mode: StoreMode,
    /// Contract-level save policy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_policy: Option<SavePolicy>,
    /// Contract-level default mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_mode: Option<DefaultMode>,
    /// Declared schema version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i32>,
}

fn default_binding() -> String {
    "default".to_string()
}

impl Default for PrefBoxConfig {
    fn default() -> Self {
        PrefBoxConfig {
            binding: default_binding(),
            name: None,
            mode: StoreMode::default(),
            save_policy: None,
            default_mode: None,
            version: None,
        }
    }
}

impl PrefBoxConfig {
    /// Parse and validate a config document
    pub fn from_toml(content: &str) -> PrefResult<Self> {
        let config: PrefBoxConfig = toml::from_str(content)
            .map_err(|e| PrefError::Config(format!("invalid {}: {}", CONFIG_FILE_NAME, e)))?;
        config.binding()?;
        Ok(config)
    }

    /// Read and validate a config file
    pub fn from_file(path: &Path) -> PrefResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Write the commented default config if `path` does not exist yet
    pub fn write_default_if_missing(path: &Path) -> PrefResult<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml())?;
        }
        Ok(())
    }

    /// Default config file content, with comments
    pub fn default_toml() -> &'static str {
        r#"# prefbox configuration
#
# Store binding: "default" (one per application), "scoped" or "named".
# Scoped and named bindings need a name.
binding = "default"
# name = "settings"

# Store mode: "private" or "multi_process"
mode = "private"

# Flush after writes: "apply" (async), "commit" (sync) or "none"
# save_policy = "apply"

# Fallback when nothing is stored: "empty" or "null"
# default_mode = "empty"

# Schema version for migrations
# version = 1
"#
    }

    /// Binding described by `binding` and `name`
    pub fn binding(&self) -> PrefResult<Binding> {
        let name = self.name.clone().filter(|n| !n.is_empty());
        match (self.binding.as_str(), name) {
            ("default", _) => Ok(Binding::Default),
            ("scoped", Some(name)) => Ok(Binding::Scoped(name)),
            ("named", Some(name)) => Ok(Binding::Named(name)),
            ("scoped" | "named", None) => Err(PrefError::Config(format!(
                "binding = \"{}\" requires a non-empty name",
                self.binding
            ))),
            (other, _) => Err(PrefError::Config(format!(
                "Invalid binding '{}' in {}. Expected \"default\", \"scoped\" or \"named\".",
                other, CONFIG_FILE_NAME
            ))),
        }
    }
}
