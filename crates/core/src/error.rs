//! Error types for prefbox
//!
//! Every failure the engine can surface is a variant of [`PrefError`].
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! All variants describe programmer-error class failures (a misdeclared
//! contract, a default of the wrong type, an unsupported downgrade) or
//! boundary failures reported by a store implementation. None of them are
//! retried by the engine.

use crate::value::StorageKind;
use std::io;
use thiserror::Error;

/// Result type alias for prefbox operations
pub type PrefResult<T> = std::result::Result<T, PrefError>;

/// Error types for prefbox
#[derive(Debug, Error)]
pub enum PrefError {
    /// No codec is registered or declared for a domain type
    #[error("No codec found for type {type_name}")]
    NoCodecFound {
        /// Name of the type that has no codec
        type_name: String,
    },

    /// An operation cannot be resolved or invoked the way it was declared
    #[error("Unsupported operation '{operation}': {reason}")]
    UnsupportedOperation {
        /// Declared operation name
        operation: String,
        /// What is missing or mismatched
        reason: String,
    },

    /// A default value does not have the operation's value type
    #[error("Default value type {found} does not match declared type {expected}")]
    DefaultTypeMismatch {
        /// Declared value type of the operation
        expected: String,
        /// Type of the supplied default
        found: String,
    },

    /// Persisted schema version is newer than the declared one and no
    /// downgrade handler exists
    #[error("Downgrade from version {old} to {new} not supported")]
    DowngradeNotSupported {
        /// Persisted version
        old: i32,
        /// Declared version
        new: i32,
    },

    /// A call argument is missing or malformed
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A stored primitive could not be turned back into its domain type
    #[error("Failed to decode {type_name}: {reason}")]
    CodecDecode {
        /// Domain type being decoded
        type_name: String,
        /// Decoder message
        reason: String,
    },

    /// An enumeration codec met a persisted name with no matching variant
    #[error("Unknown variant '{name}' for {type_name}")]
    UnknownVariant {
        /// Enumeration type
        type_name: String,
        /// Persisted variant name
        name: String,
    },

    /// The key holds a primitive of another storage kind
    #[error("Key '{key}' holds a {actual} value, expected {expected}")]
    KindMismatch {
        /// Storage key
        key: String,
        /// Kind the caller asked for
        expected: StorageKind,
        /// Kind actually stored
        actual: StorageKind,
    },

    /// A symbolic identifier has no entry in the resource lookup
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    /// I/O error from a file-backed store
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration file could not be read or is invalid
    #[error("Config error: {0}")]
    Config(String),

    /// Storage layer error
    #[error("Storage error: {0}")]
    Storage(String),
}

impl PrefError {
    /// Build an `UnsupportedOperation` error
    pub fn unsupported(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        PrefError::UnsupportedOperation {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Build a `NoCodecFound` error
    pub fn no_codec(type_name: impl Into<String>) -> Self {
        PrefError::NoCodecFound {
            type_name: type_name.into(),
        }
    }

    /// Build a `DefaultTypeMismatch` error
    pub fn default_mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        PrefError::DefaultTypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Build an `InvalidArgument` error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        PrefError::InvalidArgument(msg.into())
    }

    /// Build a `CodecDecode` error
    pub fn decode(type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        PrefError::CodecDecode {
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }

    /// True for failures raised while decoding a stored primitive
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            PrefError::CodecDecode { .. } | PrefError::UnknownVariant { .. }
        )
    }
}

impl From<serde_json::Error> for PrefError {
    fn from(e: serde_json::Error) -> Self {
        PrefError::Serialization(e.to_string())
    }
}
