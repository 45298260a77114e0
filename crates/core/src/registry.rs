//! Process-wide codec registry
//!
//! Maps a domain type to the codec that stores it. Built-in codecs are
//! registered up front; enumeration codecs are instantiated the first time
//! an enumeration type is looked up and cached from then on.
//!
//! # Thread Safety
//!
//! The registry is a `DashMap` behind a `once_cell` `Lazy`. Lookups are
//! lock-free reads; the lazy enum insertion only locks the target shard and
//! happens at most once per type (`entry().or_insert_with`).

use crate::codec::{
    shared, BoolCodec, Codec, DateCodec, DoubleCodec, FloatCodec, IntCodec, LongCodec,
    SharedCodec, StringCodec, StringSetCodec, UriCodec, ValueType,
};
use crate::error::{PrefError, PrefResult};
use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::any::TypeId;
use tracing::debug;

/// Global registry shared by every contract in the process
static GLOBAL: Lazy<CodecRegistry> = Lazy::new(CodecRegistry::with_builtins);

/// Map from domain type to codec
pub struct CodecRegistry {
    codecs: DashMap<TypeId, SharedCodec>,
}

impl CodecRegistry {
    /// The process-wide registry
    pub fn global() -> &'static CodecRegistry {
        &GLOBAL
    }

    /// A registry with no codecs at all
    pub fn empty() -> Self {
        CodecRegistry {
            codecs: DashMap::new(),
        }
    }

    /// A registry holding the standard and extra codecs
    ///
    /// Standard: `bool`, `f32`, `i32`, `i64`, `String`, `BTreeSet<String>`.
    /// Extra: `f64`, `DateTime<Utc>`, `Uri`.
    pub fn with_builtins() -> Self {
        let registry = Self::empty();
        registry.register(BoolCodec);
        registry.register(FloatCodec);
        registry.register(IntCodec);
        registry.register(LongCodec);
        registry.register(StringCodec);
        registry.register(StringSetCodec);
        registry.register(DoubleCodec);
        registry.register(DateCodec);
        registry.register(UriCodec);
        registry
    }

    /// Register (or replace) the codec for `C::Value`
    pub fn register<C: Codec>(&self, codec: C) {
        self.register_shared(shared(codec));
    }

    /// Register (or replace) a type-erased codec under its value type
    pub fn register_shared(&self, codec: SharedCodec) {
        self.codecs.insert(codec.value_type_id(), codec);
    }

    /// Codec for a type, instantiating a lazy (enumeration) codec if needed
    pub fn lookup(&self, value_type: &ValueType) -> Option<SharedCodec> {
        if let Some(codec) = self.codecs.get(&value_type.id()) {
            return Some(codec.clone());
        }

        let make = value_type.lazy_codec()?;
        let codec = self
            .codecs
            .entry(value_type.id())
            .or_insert_with(|| {
                debug!(
                    target: "prefbox::codec",
                    value_type = value_type.name(),
                    "Instantiated enumeration codec"
                );
                make()
            })
            .clone();
        Some(codec)
    }

    /// Resolve the codec for a type, honouring an explicit override
    ///
    /// The override must handle the same domain type; a registry miss fails
    /// with `NoCodecFound`.
    pub fn resolve(
        &self,
        value_type: &ValueType,
        explicit: Option<&SharedCodec>,
    ) -> PrefResult<SharedCodec> {
        if let Some(codec) = explicit {
            if codec.value_type_id() != value_type.id() {
                return Err(PrefError::invalid_argument(format!(
                    "codec for {} cannot store {}",
                    codec.value_type_name(),
                    value_type.name()
                )));
            }
            return Ok(codec.clone());
        }

        self.lookup(value_type)
            .ok_or_else(|| PrefError::no_codec(value_type.name()))
    }

    /// True if a codec for this type is already cached
    pub fn contains(&self, value_type: &ValueType) -> bool {
        self.codecs.contains_key(&value_type.id())
    }

    /// Number of cached codecs
    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    /// True if no codec is registered
    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
