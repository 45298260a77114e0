//! Convenience codecs for types the store cannot hold natively

use super::{unexpected_kind, Codec};
use crate::error::{PrefError, PrefResult};
use crate::types::Uri;
use crate::value::{StorageKind, StoredValue};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;

/// `f64` as Long, through its IEEE-754 bit pattern
///
/// A Float primitive would lose precision; the bit pattern is lossless,
/// including NaN payloads and signed zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct DoubleCodec;

impl Codec for DoubleCodec {
    type Value = f64;

    fn storage_kind(&self) -> StorageKind {
        StorageKind::Long
    }

    fn zero_value(&self) -> Option<StoredValue> {
        Some(StoredValue::Long(0.0f64.to_bits() as i64))
    }

    fn absent_value(&self) -> Option<StoredValue> {
        self.zero_value()
    }

    fn encode(&self, value: &f64) -> PrefResult<StoredValue> {
        Ok(StoredValue::Long(value.to_bits() as i64))
    }

    fn decode(&self, stored: StoredValue) -> PrefResult<Option<f64>> {
        match stored {
            StoredValue::Long(bits) => Ok(Some(f64::from_bits(bits as u64))),
            other => Err(unexpected_kind::<f64>(StorageKind::Long, &other)),
        }
    }
}

/// `DateTime<Utc>` as Long epoch milliseconds
///
/// `i64::MIN` is reserved to mean "no date", so an empty default decodes to
/// no value instead of 1970-01-01.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateCodec;

impl DateCodec {
    /// Primitive reserved for "no date"
    pub const ABSENT: i64 = i64::MIN;
}

impl Codec for DateCodec {
    type Value = DateTime<Utc>;

    fn storage_kind(&self) -> StorageKind {
        StorageKind::Long
    }

    fn zero_value(&self) -> Option<StoredValue> {
        Some(StoredValue::Long(Self::ABSENT))
    }

    fn absent_value(&self) -> Option<StoredValue> {
        self.zero_value()
    }

    fn encode(&self, value: &DateTime<Utc>) -> PrefResult<StoredValue> {
        Ok(StoredValue::Long(value.timestamp_millis()))
    }

    fn decode(&self, stored: StoredValue) -> PrefResult<Option<DateTime<Utc>>> {
        match stored {
            StoredValue::Long(Self::ABSENT) => Ok(None),
            StoredValue::Long(millis) => DateTime::<Utc>::from_timestamp_millis(millis)
                .map(Some)
                .ok_or_else(|| {
                    PrefError::decode(
                        std::any::type_name::<DateTime<Utc>>(),
                        format!("{} ms is out of range", millis),
                    )
                }),
            other => Err(unexpected_kind::<DateTime<Utc>>(StorageKind::Long, &other)),
        }
    }
}

/// [`Uri`] as String
#[derive(Debug, Clone, Copy, Default)]
pub struct UriCodec;

impl Codec for UriCodec {
    type Value = Uri;

    fn storage_kind(&self) -> StorageKind {
        StorageKind::String
    }

    fn zero_value(&self) -> Option<StoredValue> {
        None
    }

    fn encode(&self, value: &Uri) -> PrefResult<StoredValue> {
        Ok(StoredValue::String(value.as_str().to_string()))
    }

    fn decode(&self, stored: StoredValue) -> PrefResult<Option<Uri>> {
        match stored {
            StoredValue::String(s) => Ok(Some(Uri::parse(s))),
            other => Err(unexpected_kind::<Uri>(StorageKind::String, &other)),
        }
    }
}

/// Unit-variant enumeration as String, by variant name
///
/// Variant names come from the type's serde representation, so
/// `#[serde(rename = "...")]` changes what is persisted. Decoding a name
/// that no longer matches a variant fails with `UnknownVariant`.
pub struct EnumCodec<E> {
    _marker: PhantomData<fn() -> E>,
}

impl<E> EnumCodec<E> {
    /// Create a codec for `E`
    pub fn new() -> Self {
        EnumCodec {
            _marker: PhantomData,
        }
    }
}

impl<E> Default for EnumCodec<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Codec for EnumCodec<E>
where
    E: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    type Value = E;

    fn storage_kind(&self) -> StorageKind {
        StorageKind::String
    }

    fn zero_value(&self) -> Option<StoredValue> {
        None
    }

    fn encode(&self, value: &E) -> PrefResult<StoredValue> {
        match serde_json::to_value(value)? {
            serde_json::Value::String(name) => Ok(StoredValue::String(name)),
            other => Err(PrefError::invalid_argument(format!(
                "{} is not a unit variant (serialized as {})",
                std::any::type_name::<E>(),
                other
            ))),
        }
    }

    fn decode(&self, stored: StoredValue) -> PrefResult<Option<E>> {
        match stored {
            StoredValue::String(name) => {
                serde_json::from_value(serde_json::Value::String(name.clone()))
                    .map(Some)
                    .map_err(|_| PrefError::UnknownVariant {
                        type_name: std::any::type_name::<E>().to_string(),
                        name,
                    })
            }
            other => Err(unexpected_kind::<E>(StorageKind::String, &other)),
        }
    }
}

/// Any serde type as a JSON String
///
/// Not registered by default; declare it as an override for the
/// operations, keys or types that need it.
pub struct JsonCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonCodec<T> {
    /// Create a codec for `T`
    pub fn new() -> Self {
        JsonCodec {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Codec for JsonCodec<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    type Value = T;

    fn storage_kind(&self) -> StorageKind {
        StorageKind::String
    }

    fn zero_value(&self) -> Option<StoredValue> {
        None
    }

    fn encode(&self, value: &T) -> PrefResult<StoredValue> {
        Ok(StoredValue::String(serde_json::to_string(value)?))
    }

    fn decode(&self, stored: StoredValue) -> PrefResult<Option<T>> {
        match stored {
            StoredValue::String(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|e| PrefError::decode(std::any::type_name::<T>(), e.to_string())),
            other => Err(unexpected_kind::<T>(StorageKind::String, &other)),
        }
    }
}
