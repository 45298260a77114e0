//! Codecs between domain types and storage primitives
//!
//! A [`Codec`] turns one domain type into exactly one [`StorageKind`] and
//! back. The engine only ever talks to codecs through the type-erased
//! [`ErasedCodec`] view, so descriptors can hold codecs of different value
//! types side by side.
//!
//! ## Absence
//!
//! Codecs never see an absent domain value. The engine handles absence
//! itself: writing "no value" removes the key, and reading a key with no
//! primitive (and no default) yields no value without calling `decode`.
//! `decode` may still report absence, for codecs that reserve a sentinel
//! primitive (the date codec treats `i64::MIN` that way).
//!
//! ## Zero vs absent
//!
//! - `zero_value()` is the canonical empty primitive, used by
//!   `DefaultMode::Empty` (`false`, `0`, `""`, empty set).
//! - `absent_value()` is what the store is asked to fall back to when a
//!   listener reads a key with nothing stored. For numeric and boolean
//!   codecs this is the zero; for strings and sets it is nothing.

mod extra;
mod standard;

pub use extra::{DateCodec, DoubleCodec, EnumCodec, JsonCodec, UriCodec};
pub use standard::{BoolCodec, FloatCodec, IntCodec, LongCodec, StringCodec, StringSetCodec};

use crate::error::{PrefError, PrefResult};
use crate::value::{StorageKind, StoredValue};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// A decoded domain value, type-erased
pub type DomainValue = Box<dyn Any + Send>;

/// Shared handle to a type-erased codec
pub type SharedCodec = Arc<dyn ErasedCodec>;

/// Reversible mapping between a domain type and one storage primitive
///
/// `decode(encode(x))` must be semantically equal to `x` for every valid `x`.
pub trait Codec: Send + Sync + 'static {
    /// Domain type handled by this codec
    type Value: Any + Send;

    /// Storage kind every encoded value has
    fn storage_kind(&self) -> StorageKind;

    /// Canonical empty primitive, or `None` when the type has no empty form
    fn zero_value(&self) -> Option<StoredValue>;

    /// Fallback primitive when nothing is stored
    fn absent_value(&self) -> Option<StoredValue> {
        None
    }

    /// Encode a domain value into its primitive
    fn encode(&self, value: &Self::Value) -> PrefResult<StoredValue>;

    /// Decode a primitive back into the domain type
    fn decode(&self, stored: StoredValue) -> PrefResult<Option<Self::Value>>;
}

/// Object-safe view of a [`Codec`]
///
/// Implemented for every `Codec`; not meant to be implemented by hand.
pub trait ErasedCodec: Send + Sync {
    /// `TypeId` of the domain type
    fn value_type_id(&self) -> TypeId;

    /// Name of the domain type, for diagnostics
    fn value_type_name(&self) -> &'static str;

    /// See [`Codec::storage_kind`]
    fn storage_kind(&self) -> StorageKind;

    /// See [`Codec::zero_value`]
    fn zero_value(&self) -> Option<StoredValue>;

    /// See [`Codec::absent_value`]
    fn absent_value(&self) -> Option<StoredValue>;

    /// Encode a value that must be of the codec's domain type
    fn encode_erased(&self, value: &dyn Any) -> PrefResult<StoredValue>;

    /// Decode into a boxed domain value
    fn decode_erased(&self, stored: StoredValue) -> PrefResult<Option<DomainValue>>;
}

impl<C: Codec> ErasedCodec for C {
    fn value_type_id(&self) -> TypeId {
        TypeId::of::<C::Value>()
    }

    fn value_type_name(&self) -> &'static str {
        std::any::type_name::<C::Value>()
    }

    fn storage_kind(&self) -> StorageKind {
        Codec::storage_kind(self)
    }

    fn zero_value(&self) -> Option<StoredValue> {
        Codec::zero_value(self)
    }

    fn absent_value(&self) -> Option<StoredValue> {
        Codec::absent_value(self)
    }

    fn encode_erased(&self, value: &dyn Any) -> PrefResult<StoredValue> {
        let typed = value.downcast_ref::<C::Value>().ok_or_else(|| {
            PrefError::invalid_argument(format!(
                "codec for {} received a value of another type",
                std::any::type_name::<C::Value>()
            ))
        })?;
        self.encode(typed)
    }

    fn decode_erased(&self, stored: StoredValue) -> PrefResult<Option<DomainValue>> {
        Ok(self
            .decode(stored)?
            .map(|value| Box::new(value) as DomainValue))
    }
}

/// Wrap a codec into a shareable, type-erased handle
pub fn shared<C: Codec>(codec: C) -> SharedCodec {
    Arc::new(codec)
}

/// Build the "wrong primitive" decode error shared by all built-in codecs
pub(crate) fn unexpected_kind<T: ?Sized>(expected: StorageKind, stored: &StoredValue) -> PrefError {
    PrefError::decode(
        std::any::type_name::<T>(),
        format!("expected {} primitive, found {}", expected, stored.kind()),
    )
}

// ============================================================================
// ValueType
// ============================================================================

/// Canonical domain type of an operation
///
/// Mirrors the distinction between non-nullable primitives (`bool`, `i32`,
/// ...) and nullable values. Codec lookup always uses the nullable form;
/// the flag only matters for `DefaultMode::Null`, which non-nullable
/// primitives ignore.
#[derive(Clone)]
pub struct ValueType {
    id: TypeId,
    name: &'static str,
    primitive: bool,
    lazy_codec: Option<fn() -> SharedCodec>,
}

impl ValueType {
    /// Nullable value of type `T`
    pub fn of<T: Any>() -> Self {
        ValueType {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            primitive: false,
            lazy_codec: None,
        }
    }

    /// Non-nullable primitive of type `T`
    pub fn primitive<T: Any>() -> Self {
        ValueType {
            primitive: true,
            ..Self::of::<T>()
        }
    }

    /// Non-nullable `bool`
    pub fn bool() -> Self {
        Self::primitive::<bool>()
    }

    /// Non-nullable `f32`
    pub fn float() -> Self {
        Self::primitive::<f32>()
    }

    /// Non-nullable `f64`
    pub fn double() -> Self {
        Self::primitive::<f64>()
    }

    /// Non-nullable `i32`
    pub fn int() -> Self {
        Self::primitive::<i32>()
    }

    /// Non-nullable `i64`
    pub fn long() -> Self {
        Self::primitive::<i64>()
    }

    /// Nullable enumeration stored by variant name
    ///
    /// The registry instantiates an [`EnumCodec`] for `E` the first time it
    /// is asked for one.
    pub fn enumeration<E>() -> Self
    where
        E: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        ValueType {
            lazy_codec: Some(|| shared(EnumCodec::<E>::new())),
            ..Self::of::<E>()
        }
    }

    /// Same type in its nullable form
    pub fn boxed(&self) -> Self {
        ValueType {
            primitive: false,
            ..self.clone()
        }
    }

    /// `TypeId` of the domain type
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Name of the domain type
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// True for non-nullable primitives
    pub fn is_primitive(&self) -> bool {
        self.primitive
    }

    /// True if the domain type is `T`
    pub fn is<T: Any>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }

    pub(crate) fn lazy_codec(&self) -> Option<fn() -> SharedCodec> {
        self.lazy_codec
    }
}

impl PartialEq for ValueType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ValueType {}

impl fmt::Debug for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.primitive {
            write!(f, "ValueType({}, primitive)", self.name)
        } else {
            write!(f, "ValueType({})", self.name)
        }
    }
}
