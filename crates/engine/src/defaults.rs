//! Default value resolution
//!
//! A get whose key holds nothing falls back, in order, to:
//! 1. the call-time default argument,
//! 2. the operation's static default (literal or resource),
//! 3. the default mode: `Empty` gives the codec's zero, `Null` gives nothing.
//!
//! Non-nullable primitives always use `Empty`, whatever mode is declared.

use crate::contract::DefaultSource;
use prefbox_core::{DefaultMode, PrefError, PrefResult, SharedCodec, StorageKind, StoredValue, ValueType};
use prefbox_storage::ResourceLookup;
use std::any::{Any, TypeId};

/// Fallback plan of one get, fixed when its descriptor is built
#[derive(Debug, Clone, PartialEq)]
pub struct DefaultPlan {
    static_default: Option<StoredValue>,
    mode: DefaultMode,
}

impl DefaultPlan {
    /// Build the plan for an operation
    ///
    /// The static default is resolved and validated here, so a literal of the
    /// wrong kind or an unparsable resource fails the contract build.
    pub fn build(
        value_type: &ValueType,
        codec: &SharedCodec,
        declared_mode: DefaultMode,
        source: Option<&DefaultSource>,
        resources: &dyn ResourceLookup,
    ) -> PrefResult<Self> {
        let kind = codec.storage_kind();
        let static_default = match source {
            None => None,
            Some(DefaultSource::Literal(value)) => {
                if value.kind() != kind {
                    return Err(PrefError::default_mismatch(
                        format!("{} ({})", value_type.name(), kind),
                        value.kind().name(),
                    ));
                }
                Some(value.clone())
            }
            Some(DefaultSource::Resource(id)) => Some(parse_resource(value_type, kind, id, resources)?),
        };

        let mode = if value_type.is_primitive() {
            DefaultMode::Empty
        } else {
            declared_mode
        };

        Ok(DefaultPlan { static_default, mode })
    }

    /// Effective default mode
    pub fn mode(&self) -> DefaultMode {
        self.mode
    }

    /// Resolved static default, if any
    pub fn static_default(&self) -> Option<&StoredValue> {
        self.static_default.as_ref()
    }

    /// Primitive the store should fall back to
    ///
    /// `call_time` is the already-encoded call-time default.
    pub fn resolve(&self, codec: &SharedCodec, call_time: Option<StoredValue>) -> Option<StoredValue> {
        call_time
            .or_else(|| self.static_default.clone())
            .or_else(|| match self.mode {
                DefaultMode::Empty => codec.zero_value(),
                DefaultMode::Null => None,
            })
    }
}

fn parse_resource(
    value_type: &ValueType,
    kind: StorageKind,
    id: &str,
    resources: &dyn ResourceLookup,
) -> PrefResult<StoredValue> {
    if kind == StorageKind::StringSet {
        return Err(PrefError::unsupported(
            id,
            "resource defaults cannot produce a string set",
        ));
    }
    let raw = resources.resolve_string(id)?;
    kind.parse(&raw).ok_or_else(|| {
        PrefError::default_mismatch(
            format!("{} ({})", value_type.name(), kind),
            format!("resource '{}' = '{}'", id, raw),
        )
    })
}

/// Fail unless a call-time default has the operation's value type
///
/// Runs on every call that supplies a default, used or not.
pub fn check_default_type<T: Any>(value_type: &ValueType, _default: &T) -> PrefResult<()> {
    if TypeId::of::<T>() == value_type.id() {
        Ok(())
    } else {
        Err(PrefError::default_mismatch(
            value_type.name(),
            std::any::type_name::<T>(),
        ))
    }
}
