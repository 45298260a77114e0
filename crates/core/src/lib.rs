//! Core types and traits for prefbox
//!
//! This crate defines the foundational types used throughout the system:
//! - StorageKind / StoredValue: the six primitives a settings store holds
//! - Codec / ErasedCodec / ValueType: typed mapping from domain values to primitives
//! - CodecRegistry: process-wide codec lookup with lazy enumeration codecs
//! - SavePolicy, DefaultMode, Binding, StoreMode, StoreIdentity, Uri
//! - PrefError: Error type hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod error;
pub mod registry;
pub mod types;
pub mod value;

pub use codec::{
    shared, BoolCodec, Codec, DateCodec, DomainValue, DoubleCodec, EnumCodec, ErasedCodec,
    FloatCodec, IntCodec, JsonCodec, LongCodec, SharedCodec, StringCodec, StringSetCodec,
    UriCodec, ValueType,
};
pub use error::{PrefError, PrefResult};
pub use registry::CodecRegistry;
pub use types::{Binding, DefaultMode, SavePolicy, StoreIdentity, StoreMode, Uri};
pub use value::{StorageKind, StoredValue};
