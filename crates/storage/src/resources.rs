//! Map-backed resource lookup

use crate::traits::ResourceLookup;
use prefbox_core::{PrefError, PrefResult};
use rustc_hash::FxHashMap;
use std::path::Path;

/// Resource lookup over an in-memory table
///
/// Values are strings; numeric and boolean resources are parsed by the caller
/// into the storage kind it needs.
#[derive(Debug, Clone, Default)]
pub struct MapResources {
    values: FxHashMap<String, String>,
}

impl MapResources {
    /// Empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry, builder style
    pub fn with(mut self, identifier: impl Into<String>, value: impl ToString) -> Self {
        self.insert(identifier, value);
        self
    }

    /// Add or replace an entry
    pub fn insert(&mut self, identifier: impl Into<String>, value: impl ToString) {
        self.values.insert(identifier.into(), value.to_string());
    }

    /// Load a flat TOML table
    ///
    /// Strings are taken verbatim; integers, floats and booleans are kept in
    /// their TOML text form. Nested tables are flattened with `.`.
    ///
    /// ```toml
    /// default_volume = 1
    /// [keys]
    /// volume = "audio.volume"
    /// ```
    pub fn from_toml(content: &str) -> PrefResult<Self> {
        let table: toml::Table = content
            .parse()
            .map_err(|e: toml::de::Error| PrefError::Config(format!("invalid resources: {}", e)))?;
        let mut resources = Self::new();
        flatten("", &table, &mut resources)?;
        Ok(resources)
    }

    /// Load a TOML resource file
    pub fn from_file(path: impl AsRef<Path>) -> PrefResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True if empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn flatten(prefix: &str, table: &toml::Table, out: &mut MapResources) -> PrefResult<()> {
    for (name, value) in table {
        let id = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{}.{}", prefix, name)
        };
        match value {
            toml::Value::String(s) => out.insert(id, s),
            toml::Value::Integer(i) => out.insert(id, i),
            toml::Value::Float(f) => out.insert(id, f),
            toml::Value::Boolean(b) => out.insert(id, b),
            toml::Value::Table(inner) => flatten(&id, inner, out)?,
            other => {
                return Err(PrefError::Config(format!(
                    "resource '{}' has unsupported type {}",
                    id,
                    other.type_str()
                )))
            }
        }
    }
    Ok(())
}

impl ResourceLookup for MapResources {
    fn resolve_string(&self, identifier: &str) -> PrefResult<String> {
        self.values
            .get(identifier)
            .cloned()
            .ok_or_else(|| PrefError::ResourceNotFound(identifier.to_string()))
    }
}
