//! Operation descriptors
//!
//! Turns a [`ContractSpec`] into one immutable [`OperationDescriptor`] per
//! operation, once, when a `PrefBox` is built. Everything that can be decided
//! ahead of a call is decided here: the storage key, the operation kind, the
//! codec, the default plan and the save policy. Anything that cannot be
//! resolved fails the build.
//!
//! # Kind inference
//!
//! | Declaration | Kind |
//! |-------------|------|
//! | `Remove` marker | Remove |
//! | `RegisterListener` / `UnregisterListener` marker | listener kinds |
//! | key, returns `Unit`/`Contract`/`Transaction` | Set |
//! | key, returns a value | Get |
//! | no key, no marker, forwardable name | Passthrough |

use crate::contract::{ContractSpec, KeySource, Marker, OperationSpec, ResourceKey, Returns};
use crate::defaults::DefaultPlan;
use prefbox_core::{
    CodecRegistry, DefaultMode, PrefError, PrefResult, SavePolicy, SharedCodec, StoredValue,
    ValueType,
};
use prefbox_storage::ResourceLookup;
use rustc_hash::FxHashMap;
use std::any::TypeId;
use std::sync::Arc;
use tracing::debug;

/// Store or transaction method a passthrough operation forwards to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Forward {
    /// `store.contains(key)`
    Contains,
    /// `store.all()`
    GetAll,
    /// Raw primitive under a key, whatever its kind
    GetRaw,
    /// `transaction.put(key, value)`
    Put,
    /// `transaction.remove(key)`
    Remove,
    /// `transaction.clear()`
    Clear,
    /// `transaction.apply_async()`
    Apply,
    /// `transaction.commit_sync()`
    Commit,
}

impl Forward {
    /// Every forwardable method
    pub const ALL: [Forward; 8] = [
        Forward::Contains,
        Forward::GetAll,
        Forward::GetRaw,
        Forward::Put,
        Forward::Remove,
        Forward::Clear,
        Forward::Apply,
        Forward::Commit,
    ];

    /// Operation name that selects this method
    pub fn name(&self) -> &'static str {
        match self {
            Forward::Contains => "contains",
            Forward::GetAll => "get_all",
            Forward::GetRaw => "get_raw",
            Forward::Put => "put",
            Forward::Remove => "remove",
            Forward::Clear => "clear",
            Forward::Apply => "apply",
            Forward::Commit => "commit",
        }
    }

    /// Method selected by an operation name
    pub fn from_name(name: &str) -> Option<Forward> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    /// Declared parameter types the method takes
    pub fn params(&self) -> Vec<ValueType> {
        match self {
            Forward::Contains | Forward::GetRaw | Forward::Remove => vec![ValueType::of::<String>()],
            Forward::Put => vec![ValueType::of::<String>(), ValueType::of::<StoredValue>()],
            Forward::GetAll | Forward::Clear | Forward::Apply | Forward::Commit => Vec::new(),
        }
    }
}

/// How a remove finds its key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyArgument {
    /// The declared key
    Declared,
    /// A literal key passed at call time
    Literal,
    /// A symbolic key passed at call time
    Symbolic,
}

/// Kind-specific part of a descriptor
#[derive(Clone)]
pub enum DescriptorKind {
    /// Read and decode
    Get {
        /// Codec bound to the value type
        codec: SharedCodec,
        /// Fallback plan
        defaults: DefaultPlan,
        /// True if the operation takes a call-time default
        takes_default: bool,
    },
    /// Encode and write
    Set {
        /// Codec bound to the value type
        codec: SharedCodec,
    },
    /// Remove a key
    Remove {
        /// Where the key comes from
        key_argument: KeyArgument,
    },
    /// Add change listeners
    RegisterListener {
        /// Codec used to decode values for the listeners
        codec: SharedCodec,
    },
    /// Remove change listeners
    UnregisterListener,
    /// Forward to the store or transaction
    Passthrough(Forward),
}

impl DescriptorKind {
    /// Short name for logs and errors
    pub fn label(&self) -> &'static str {
        match self {
            DescriptorKind::Get { .. } => "get",
            DescriptorKind::Set { .. } => "set",
            DescriptorKind::Remove { .. } => "remove",
            DescriptorKind::RegisterListener { .. } => "register",
            DescriptorKind::UnregisterListener => "unregister",
            DescriptorKind::Passthrough(_) => "passthrough",
        }
    }
}

/// Resolved, immutable description of one operation
#[derive(Clone)]
pub struct OperationDescriptor {
    name: String,
    key: Option<String>,
    value_type: Option<ValueType>,
    save_policy: SavePolicy,
    returns: Returns,
    kind: DescriptorKind,
}

impl OperationDescriptor {
    /// Declared name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolved storage key; `None` for call-time keys and passthroughs
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Domain value type, for gets, sets and listener operations
    pub fn value_type(&self) -> Option<&ValueType> {
        self.value_type.as_ref()
    }

    /// Effective save policy
    pub fn save_policy(&self) -> SavePolicy {
        self.save_policy
    }

    /// Declared return shape
    pub fn returns(&self) -> &Returns {
        &self.returns
    }

    /// Kind-specific payload
    pub fn kind(&self) -> &DescriptorKind {
        &self.kind
    }

    /// Fail unless this operation handles `T`
    pub(crate) fn expect_type<T: 'static>(&self) -> PrefResult<&ValueType> {
        match &self.value_type {
            Some(ty) if ty.id() == TypeId::of::<T>() => Ok(ty),
            Some(ty) => Err(PrefError::unsupported(
                &self.name,
                format!("handles {}, not {}", ty.name(), std::any::type_name::<T>()),
            )),
            None => Err(PrefError::unsupported(&self.name, "has no value type")),
        }
    }
}

impl std::fmt::Debug for OperationDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind.label())
            .field("key", &self.key)
            .field("value_type", &self.value_type)
            .field("save_policy", &self.save_policy)
            .finish()
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Contract-level settings the descriptors fall back to
#[derive(Debug, Clone, Copy)]
pub struct ContractDefaults {
    /// Save policy for operations without their own
    pub save_policy: SavePolicy,
    /// Default mode for operations without their own
    pub default_mode: DefaultMode,
}

/// Builds descriptors for one contract
pub struct DescriptorBuilder<'a> {
    registry: &'a CodecRegistry,
    resources: &'a dyn ResourceLookup,
    defaults: ContractDefaults,
    key_codecs: FxHashMap<String, SharedCodec>,
    type_codecs: FxHashMap<TypeId, SharedCodec>,
}

impl<'a> DescriptorBuilder<'a> {
    /// Builder resolving keys through `resources` and codecs through `registry`
    ///
    /// Symbolic keys of key-level codec overrides are resolved here.
    pub fn new(
        contract: &ContractSpec,
        registry: &'a CodecRegistry,
        resources: &'a dyn ResourceLookup,
        defaults: ContractDefaults,
    ) -> PrefResult<Self> {
        let mut key_codecs = FxHashMap::default();
        for (source, codec) in &contract.key_codecs {
            let key = resolve_key(resources, source)?;
            key_codecs.insert(key, codec.clone());
        }
        let type_codecs = contract
            .type_codecs
            .iter()
            .map(|c| (c.value_type_id(), c.clone()))
            .collect();
        Ok(DescriptorBuilder {
            registry,
            resources,
            defaults,
            key_codecs,
            type_codecs,
        })
    }

    /// Build every operation of `contract`, keyed by name
    pub fn build_all(
        &self,
        contract: &ContractSpec,
    ) -> PrefResult<FxHashMap<String, Arc<OperationDescriptor>>> {
        let mut descriptors = FxHashMap::default();
        for op in &contract.operations {
            if descriptors.contains_key(&op.name) {
                return Err(PrefError::unsupported(&op.name, "declared more than once"));
            }
            let descriptor = self.build(op)?;
            debug!(
                target: "prefbox::build",
                contract = %contract.name,
                operation = %op.name,
                kind = descriptor.kind.label(),
                key = ?descriptor.key,
                "Built descriptor"
            );
            descriptors.insert(op.name.clone(), Arc::new(descriptor));
        }
        Ok(descriptors)
    }

    /// Build one operation
    pub fn build(&self, op: &OperationSpec) -> PrefResult<OperationDescriptor> {
        let key = op
            .key
            .as_ref()
            .map(|source| resolve_key(self.resources, source))
            .transpose()?;
        let save_policy = op.save_policy.unwrap_or(self.defaults.save_policy);

        let (value_type, kind) = match (op.marker, &key) {
            (Some(Marker::Remove), _) => (None, self.remove(op, key.is_some())?),
            (Some(Marker::RegisterListener), Some(k)) => {
                let ty = self.listened_type(op)?;
                let codec = self.codec(op, k, &ty)?;
                (Some(ty), DescriptorKind::RegisterListener { codec })
            }
            (Some(Marker::UnregisterListener), Some(_)) => {
                let ty = self.listened_type(op)?;
                (Some(ty), DescriptorKind::UnregisterListener)
            }
            (Some(_), None) => {
                return Err(PrefError::unsupported(&op.name, "listener operations need a key"))
            }
            (None, Some(k)) => match &op.returns {
                Returns::Value(ty) => {
                    let kind = self.get(op, k, ty)?;
                    (Some(ty.clone()), kind)
                }
                _ => {
                    let ty = self.set_type(op)?;
                    let codec = self.codec(op, k, &ty)?;
                    (Some(ty), DescriptorKind::Set { codec })
                }
            },
            (None, None) => (None, DescriptorKind::Passthrough(self.passthrough(op)?)),
        };

        if matches!(kind, DescriptorKind::Set { .. } | DescriptorKind::Remove { .. })
            && !op.returns.is_chaining()
        {
            return Err(PrefError::unsupported(
                &op.name,
                "writes return nothing, the contract or the transaction",
            ));
        }
        if matches!(
            kind,
            DescriptorKind::RegisterListener { .. } | DescriptorKind::UnregisterListener
        ) && op.returns != Returns::Unit
        {
            return Err(PrefError::unsupported(&op.name, "listener operations return nothing"));
        }

        Ok(OperationDescriptor {
            name: op.name.clone(),
            key,
            value_type,
            save_policy,
            returns: op.returns.clone(),
            kind,
        })
    }

    fn get(&self, op: &OperationSpec, key: &str, ty: &ValueType) -> PrefResult<DescriptorKind> {
        let takes_default = match op.params.as_slice() {
            [] => false,
            [param] if param == ty => true,
            [param] => return Err(PrefError::default_mismatch(ty.name(), param.name())),
            _ => {
                return Err(PrefError::unsupported(
                    &op.name,
                    "a get takes at most one default parameter",
                ))
            }
        };
        let codec = self.codec(op, key, ty)?;
        let mode = op.default_mode.unwrap_or(self.defaults.default_mode);
        let defaults = DefaultPlan::build(ty, &codec, mode, op.default.as_ref(), self.resources)?;
        Ok(DescriptorKind::Get {
            codec,
            defaults,
            takes_default,
        })
    }

    fn set_type(&self, op: &OperationSpec) -> PrefResult<ValueType> {
        match op.params.as_slice() {
            [ty] => Ok(ty.clone()),
            params => Err(PrefError::unsupported(
                &op.name,
                format!("a set takes exactly one value, found {} parameters", params.len()),
            )),
        }
    }

    fn listened_type(&self, op: &OperationSpec) -> PrefResult<ValueType> {
        match op.params.as_slice() {
            [ty] => Ok(ty.clone()),
            _ => Err(PrefError::unsupported(
                &op.name,
                "listener operations declare exactly one listened value type",
            )),
        }
    }

    fn remove(&self, op: &OperationSpec, has_key: bool) -> PrefResult<DescriptorKind> {
        let key_argument = match (has_key, op.params.as_slice()) {
            (true, []) => KeyArgument::Declared,
            (false, [p]) if p.is::<String>() => KeyArgument::Literal,
            (false, [p]) if p.is::<ResourceKey>() => KeyArgument::Symbolic,
            (true, _) => {
                return Err(PrefError::unsupported(&op.name, "a keyed remove takes no parameters"))
            }
            (false, _) => {
                return Err(PrefError::unsupported(
                    &op.name,
                    "a remove without a key takes one String or ResourceKey parameter",
                ))
            }
        };
        Ok(DescriptorKind::Remove { key_argument })
    }

    fn passthrough(&self, op: &OperationSpec) -> PrefResult<Forward> {
        let forward = Forward::from_name(&op.name).ok_or_else(|| {
            PrefError::unsupported(&op.name, "no key, no marker and no forwardable method of that name")
        })?;
        if op.params != forward.params() {
            return Err(PrefError::unsupported(
                &op.name,
                format!("parameters {:?} do not match {:?}", op.params, forward.params()),
            ));
        }
        Ok(forward)
    }

    /// Codec precedence: operation, key, type, registry
    fn codec(&self, op: &OperationSpec, key: &str, ty: &ValueType) -> PrefResult<SharedCodec> {
        let explicit = op
            .codec
            .as_ref()
            .or_else(|| self.key_codecs.get(key))
            .or_else(|| self.type_codecs.get(&ty.id()));
        self.registry.resolve(ty, explicit).map_err(|e| match e {
            PrefError::InvalidArgument(reason) => PrefError::unsupported(&op.name, reason),
            other => other,
        })
    }
}

/// Resolve a key source to its storage key
pub fn resolve_key(resources: &dyn ResourceLookup, source: &KeySource) -> PrefResult<String> {
    match source {
        KeySource::Literal(key) => Ok(key.clone()),
        KeySource::Resource(id) => resources.resolve_string(id),
    }
}
