//! Storage primitives
//!
//! This module defines:
//! - StorageKind: the six primitive kinds a settings store can hold
//! - StoredValue: a primitive tagged with its kind
//!
//! ## Primitive model
//!
//! Exactly six kinds exist: Bool, Float, Int, Long, String, StringSet.
//! Every domain type reaches the store as one of them, through a codec.
//! There are no implicit coercions: `Int(1)` is never equal to `Long(1)`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Kind of primitive held under a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageKind {
    /// Boolean
    Bool,
    /// 32-bit float
    Float,
    /// 32-bit signed integer
    Int,
    /// 64-bit signed integer
    Long,
    /// UTF-8 string
    String,
    /// Unordered set of strings
    StringSet,
}

impl StorageKind {
    /// All kinds, in declaration order
    pub const ALL: [StorageKind; 6] = [
        StorageKind::Bool,
        StorageKind::Float,
        StorageKind::Int,
        StorageKind::Long,
        StorageKind::String,
        StorageKind::StringSet,
    ];

    /// Name used in error messages and logs
    pub fn name(&self) -> &'static str {
        match self {
            StorageKind::Bool => "Bool",
            StorageKind::Float => "Float",
            StorageKind::Int => "Int",
            StorageKind::Long => "Long",
            StorageKind::String => "String",
            StorageKind::StringSet => "StringSet",
        }
    }

    /// Parse a textual resource into a primitive of this kind
    ///
    /// Used for symbolic default values, which the resource lookup only
    /// hands out as strings. Sets are not expressible this way.
    pub fn parse(&self, raw: &str) -> Option<StoredValue> {
        let raw_trimmed = raw.trim();
        match self {
            StorageKind::Bool => raw_trimmed.parse().ok().map(StoredValue::Bool),
            StorageKind::Float => raw_trimmed.parse().ok().map(StoredValue::Float),
            StorageKind::Int => raw_trimmed.parse().ok().map(StoredValue::Int),
            StorageKind::Long => raw_trimmed.parse().ok().map(StoredValue::Long),
            StorageKind::String => Some(StoredValue::String(raw.to_string())),
            StorageKind::StringSet => None,
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A primitive as held by the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StoredValue {
    /// Boolean value
    Bool(bool),
    /// 32-bit float
    Float(f32),
    /// 32-bit signed integer
    Int(i32),
    /// 64-bit signed integer
    Long(i64),
    /// UTF-8 string
    String(String),
    /// Set of strings
    StringSet(BTreeSet<String>),
}

impl StoredValue {
    /// Kind of this primitive
    pub fn kind(&self) -> StorageKind {
        match self {
            StoredValue::Bool(_) => StorageKind::Bool,
            StoredValue::Float(_) => StorageKind::Float,
            StoredValue::Int(_) => StorageKind::Int,
            StoredValue::Long(_) => StorageKind::Long,
            StoredValue::String(_) => StorageKind::String,
            StoredValue::StringSet(_) => StorageKind::StringSet,
        }
    }

    /// Get as bool if this is a Bool value
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            StoredValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as f32 if this is a Float value
    pub fn as_float(&self) -> Option<f32> {
        match self {
            StoredValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get as i32 if this is an Int value
    pub fn as_int(&self) -> Option<i32> {
        match self {
            StoredValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as i64 if this is a Long value
    pub fn as_long(&self) -> Option<i64> {
        match self {
            StoredValue::Long(l) => Some(*l),
            _ => None,
        }
    }

    /// Get as &str if this is a String value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            StoredValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as a set if this is a StringSet value
    pub fn as_string_set(&self) -> Option<&BTreeSet<String>> {
        match self {
            StoredValue::StringSet(s) => Some(s),
            _ => None,
        }
    }
}

// ============================================================================
// From implementations for ergonomic API usage
// ============================================================================

impl From<bool> for StoredValue {
    fn from(b: bool) -> Self {
        StoredValue::Bool(b)
    }
}

impl From<f32> for StoredValue {
    fn from(f: f32) -> Self {
        StoredValue::Float(f)
    }
}

impl From<i32> for StoredValue {
    fn from(i: i32) -> Self {
        StoredValue::Int(i)
    }
}

impl From<i64> for StoredValue {
    fn from(l: i64) -> Self {
        StoredValue::Long(l)
    }
}

impl From<&str> for StoredValue {
    fn from(s: &str) -> Self {
        StoredValue::String(s.to_string())
    }
}

impl From<String> for StoredValue {
    fn from(s: String) -> Self {
        StoredValue::String(s)
    }
}

impl From<BTreeSet<String>> for StoredValue {
    fn from(s: BTreeSet<String>) -> Self {
        StoredValue::StringSet(s)
    }
}
