//! Codecs for the types the store holds natively

use super::{unexpected_kind, Codec};
use crate::error::PrefResult;
use crate::value::{StorageKind, StoredValue};
use std::collections::BTreeSet;

/// `bool` as Bool
#[derive(Debug, Clone, Copy, Default)]
pub struct BoolCodec;

impl Codec for BoolCodec {
    type Value = bool;

    fn storage_kind(&self) -> StorageKind {
        StorageKind::Bool
    }

    fn zero_value(&self) -> Option<StoredValue> {
        Some(StoredValue::Bool(false))
    }

    fn absent_value(&self) -> Option<StoredValue> {
        self.zero_value()
    }

    fn encode(&self, value: &bool) -> PrefResult<StoredValue> {
        Ok(StoredValue::Bool(*value))
    }

    fn decode(&self, stored: StoredValue) -> PrefResult<Option<bool>> {
        match stored {
            StoredValue::Bool(b) => Ok(Some(b)),
            other => Err(unexpected_kind::<bool>(StorageKind::Bool, &other)),
        }
    }
}

/// `f32` as Float
#[derive(Debug, Clone, Copy, Default)]
pub struct FloatCodec;

impl Codec for FloatCodec {
    type Value = f32;

    fn storage_kind(&self) -> StorageKind {
        StorageKind::Float
    }

    fn zero_value(&self) -> Option<StoredValue> {
        Some(StoredValue::Float(0.0))
    }

    fn absent_value(&self) -> Option<StoredValue> {
        self.zero_value()
    }

    fn encode(&self, value: &f32) -> PrefResult<StoredValue> {
        Ok(StoredValue::Float(*value))
    }

    fn decode(&self, stored: StoredValue) -> PrefResult<Option<f32>> {
        match stored {
            StoredValue::Float(f) => Ok(Some(f)),
            other => Err(unexpected_kind::<f32>(StorageKind::Float, &other)),
        }
    }
}

/// `i32` as Int
#[derive(Debug, Clone, Copy, Default)]
pub struct IntCodec;

impl Codec for IntCodec {
    type Value = i32;

    fn storage_kind(&self) -> StorageKind {
        StorageKind::Int
    }

    fn zero_value(&self) -> Option<StoredValue> {
        Some(StoredValue::Int(0))
    }

    fn absent_value(&self) -> Option<StoredValue> {
        self.zero_value()
    }

    fn encode(&self, value: &i32) -> PrefResult<StoredValue> {
        Ok(StoredValue::Int(*value))
    }

    fn decode(&self, stored: StoredValue) -> PrefResult<Option<i32>> {
        match stored {
            StoredValue::Int(i) => Ok(Some(i)),
            other => Err(unexpected_kind::<i32>(StorageKind::Int, &other)),
        }
    }
}

/// `i64` as Long
#[derive(Debug, Clone, Copy, Default)]
pub struct LongCodec;

impl Codec for LongCodec {
    type Value = i64;

    fn storage_kind(&self) -> StorageKind {
        StorageKind::Long
    }

    fn zero_value(&self) -> Option<StoredValue> {
        Some(StoredValue::Long(0))
    }

    fn absent_value(&self) -> Option<StoredValue> {
        self.zero_value()
    }

    fn encode(&self, value: &i64) -> PrefResult<StoredValue> {
        Ok(StoredValue::Long(*value))
    }

    fn decode(&self, stored: StoredValue) -> PrefResult<Option<i64>> {
        match stored {
            StoredValue::Long(l) => Ok(Some(l)),
            other => Err(unexpected_kind::<i64>(StorageKind::Long, &other)),
        }
    }
}

/// `String` as String
#[derive(Debug, Clone, Copy, Default)]
pub struct StringCodec;

impl Codec for StringCodec {
    type Value = String;

    fn storage_kind(&self) -> StorageKind {
        StorageKind::String
    }

    fn zero_value(&self) -> Option<StoredValue> {
        Some(StoredValue::String(String::new()))
    }

    fn encode(&self, value: &String) -> PrefResult<StoredValue> {
        Ok(StoredValue::String(value.clone()))
    }

    fn decode(&self, stored: StoredValue) -> PrefResult<Option<String>> {
        match stored {
            StoredValue::String(s) => Ok(Some(s)),
            other => Err(unexpected_kind::<String>(StorageKind::String, &other)),
        }
    }
}

/// `BTreeSet<String>` as StringSet
#[derive(Debug, Clone, Copy, Default)]
pub struct StringSetCodec;

impl Codec for StringSetCodec {
    type Value = BTreeSet<String>;

    fn storage_kind(&self) -> StorageKind {
        StorageKind::StringSet
    }

    fn zero_value(&self) -> Option<StoredValue> {
        Some(StoredValue::StringSet(BTreeSet::new()))
    }

    fn encode(&self, value: &BTreeSet<String>) -> PrefResult<StoredValue> {
        Ok(StoredValue::StringSet(value.clone()))
    }

    fn decode(&self, stored: StoredValue) -> PrefResult<Option<BTreeSet<String>>> {
        match stored {
            StoredValue::StringSet(s) => Ok(Some(s)),
            other => Err(unexpected_kind::<BTreeSet<String>>(
                StorageKind::StringSet,
                &other,
            )),
        }
    }
}
