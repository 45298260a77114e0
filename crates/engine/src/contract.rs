//! Contract declarations
//!
//! A contract is a named set of operations. Each [`OperationSpec`] states
//! what an operation looks like (key, parameters, return shape, markers and
//! per-operation overrides); the descriptor builder turns the whole
//! [`ContractSpec`] into resolved descriptors once, when a `PrefBox` is built.
//!
//! # Example
//!
//! ```ignore
//! use prefbox_engine::{ContractSpec, OperationSpec, Returns};
//! use prefbox_core::{ValueType, StoredValue};
//!
//! let contract = ContractSpec::new("Settings")
//!     .operation(OperationSpec::getter("volume", "audio.volume", ValueType::int())
//!         .default_value(StoredValue::Int(5)))
//!     .operation(OperationSpec::setter("set_volume", "audio.volume", ValueType::int())
//!         .returns(Returns::Contract));
//! ```

use prefbox_core::{shared, Codec, DefaultMode, SavePolicy, SharedCodec, StoredValue, ValueType};

/// Where an operation's storage key comes from
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeySource {
    /// The key itself
    Literal(String),
    /// A symbolic identifier resolved through the resource lookup
    Resource(String),
}

/// Call-time key argument resolved through the resource lookup
///
/// Declaring a remove operation's parameter as `ResourceKey` instead of
/// `String` makes `remove_key` treat its argument as a symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceKey(pub String);

/// Explicit operation markers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Marker {
    /// Remove the key
    Remove,
    /// Register change listeners for the key
    RegisterListener,
    /// Unregister change listeners for the key
    UnregisterListener,
}

/// Declared return shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Returns {
    /// Nothing
    Unit,
    /// The contract instance, for chaining
    Contract,
    /// The pending transaction; exposes the commit outcome
    Transaction,
    /// A domain value
    Value(ValueType),
}

impl Returns {
    /// True for the shapes a set may return
    pub fn is_chaining(&self) -> bool {
        !matches!(self, Returns::Value(_))
    }
}

/// Static default of a get
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultSource {
    /// A primitive literal, of the codec's storage kind
    Literal(StoredValue),
    /// A resource identifier, parsed into the codec's storage kind
    Resource(String),
}

/// Declaration of one operation
#[derive(Clone)]
pub struct OperationSpec {
    pub(crate) name: String,
    pub(crate) key: Option<KeySource>,
    pub(crate) marker: Option<Marker>,
    pub(crate) params: Vec<ValueType>,
    pub(crate) returns: Returns,
    pub(crate) codec: Option<SharedCodec>,
    pub(crate) default_mode: Option<DefaultMode>,
    pub(crate) default: Option<DefaultSource>,
    pub(crate) save_policy: Option<SavePolicy>,
}

impl OperationSpec {
    /// Operation with no key, no parameters and no return value
    pub fn new(name: impl Into<String>) -> Self {
        OperationSpec {
            name: name.into(),
            key: None,
            marker: None,
            params: Vec::new(),
            returns: Returns::Unit,
            codec: None,
            default_mode: None,
            default: None,
            save_policy: None,
        }
    }

    /// Get of `value_type` under a literal key
    pub fn getter(name: impl Into<String>, key: impl Into<String>, value_type: ValueType) -> Self {
        Self::new(name).key(key).returns(Returns::Value(value_type))
    }

    /// Set of `value_type` under a literal key, returning nothing
    pub fn setter(name: impl Into<String>, key: impl Into<String>, value_type: ValueType) -> Self {
        Self::new(name).key(key).param(value_type)
    }

    /// Remove of a literal key
    pub fn remover(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self::new(name).key(key).marker(Marker::Remove)
    }

    /// Use a literal storage key
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(KeySource::Literal(key.into()));
        self
    }

    /// Use a symbolic storage key
    pub fn key_resource(mut self, identifier: impl Into<String>) -> Self {
        self.key = Some(KeySource::Resource(identifier.into()));
        self
    }

    /// Set an explicit marker
    pub fn marker(mut self, marker: Marker) -> Self {
        self.marker = Some(marker);
        self
    }

    /// Append a parameter
    pub fn param(mut self, value_type: ValueType) -> Self {
        self.params.push(value_type);
        self
    }

    /// Declare the return shape
    pub fn returns(mut self, returns: Returns) -> Self {
        self.returns = returns;
        self
    }

    /// Override the codec for this operation
    pub fn codec<C: Codec>(self, codec: C) -> Self {
        self.shared_codec(shared(codec))
    }

    /// Override the codec for this operation with a shared handle
    pub fn shared_codec(mut self, codec: SharedCodec) -> Self {
        self.codec = Some(codec);
        self
    }

    /// Override the contract's default mode
    pub fn default_mode(mut self, mode: DefaultMode) -> Self {
        self.default_mode = Some(mode);
        self
    }

    /// Static default as a primitive literal
    pub fn default_value(mut self, value: impl Into<StoredValue>) -> Self {
        self.default = Some(DefaultSource::Literal(value.into()));
        self
    }

    /// Static default looked up through the resource lookup
    pub fn default_resource(mut self, identifier: impl Into<String>) -> Self {
        self.default = Some(DefaultSource::Resource(identifier.into()));
        self
    }

    /// Override the contract's save policy
    pub fn save_policy(mut self, policy: SavePolicy) -> Self {
        self.save_policy = Some(policy);
        self
    }

    /// Declared name
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for OperationSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationSpec")
            .field("name", &self.name)
            .field("key", &self.key)
            .field("marker", &self.marker)
            .field("params", &self.params)
            .field("returns", &self.returns)
            .field("codec", &self.codec.as_ref().map(|c| c.value_type_name()))
            .field("default", &self.default)
            .finish()
    }
}

/// Declaration of a whole contract
#[derive(Clone)]
pub struct ContractSpec {
    pub(crate) name: String,
    pub(crate) operations: Vec<OperationSpec>,
    pub(crate) save_policy: SavePolicy,
    pub(crate) default_mode: DefaultMode,
    pub(crate) key_codecs: Vec<(KeySource, SharedCodec)>,
    pub(crate) type_codecs: Vec<SharedCodec>,
}

impl ContractSpec {
    /// Empty contract with `Apply` saves and `Empty` defaults
    pub fn new(name: impl Into<String>) -> Self {
        ContractSpec {
            name: name.into(),
            operations: Vec::new(),
            save_policy: SavePolicy::default(),
            default_mode: DefaultMode::default(),
            key_codecs: Vec::new(),
            type_codecs: Vec::new(),
        }
    }

    /// Add an operation
    pub fn operation(mut self, op: OperationSpec) -> Self {
        self.operations.push(op);
        self
    }

    /// Contract-level save policy
    pub fn save_policy(mut self, policy: SavePolicy) -> Self {
        self.save_policy = policy;
        self
    }

    /// Contract-level default mode
    pub fn default_mode(mut self, mode: DefaultMode) -> Self {
        self.default_mode = mode;
        self
    }

    /// Codec for every operation on a key
    pub fn key_codec(mut self, key: KeySource, codec: SharedCodec) -> Self {
        self.key_codecs.push((key, codec));
        self
    }

    /// Codec for every operation on a domain type
    pub fn type_codec(mut self, codec: SharedCodec) -> Self {
        self.type_codecs.push(codec);
        self
    }

    /// Contract name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared operations, in declaration order
    pub fn operations(&self) -> &[OperationSpec] {
        &self.operations
    }
}

impl std::fmt::Debug for ContractSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContractSpec")
            .field("name", &self.name)
            .field("operations", &self.operations.len())
            .field("save_policy", &self.save_policy)
            .field("default_mode", &self.default_mode)
            .finish()
    }
}
