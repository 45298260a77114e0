//! Builder for contract instances
//!
//! Collects the binding, policies, codec overrides and schema version, then
//! builds a [`PrefBox`]:
//!
//! 1. open the store for the binding,
//! 2. resolve every operation into a descriptor (invalid contracts fail here,
//!    before anything is written),
//! 3. run the schema migration,
//! 4. subscribe the listener table to the store.
//!
//! ```ignore
//! let prefs = PrefBoxBuilder::new(provider, contract)
//!     .binding(Binding::Named("settings".into()))
//!     .save_policy(SavePolicy::Commit)
//!     .version(2)
//!     .handler(Arc::new(MyMigrations))
//!     .build()?;
//! ```

use crate::config::PrefBoxConfig;
use crate::contract::{ContractSpec, KeySource};
use crate::descriptor::{ContractDefaults, DescriptorBuilder};
use crate::listeners::ListenerTable;
use crate::migration::{MigrationRunner, VersionHandler};
use crate::prefbox::{PrefBox, PrefBoxInner};
use parking_lot::Mutex;
use prefbox_core::{
    shared, Binding, Codec, CodecRegistry, DefaultMode, PrefResult, SavePolicy, SharedCodec,
    StoreMode,
};
use prefbox_storage::StoreProvider;
use std::sync::Arc;
use tracing::info;

/// Builder for [`PrefBox`]
pub struct PrefBoxBuilder {
    provider: Arc<dyn StoreProvider>,
    contract: ContractSpec,
    binding: Binding,
    mode: StoreMode,
    save_policy: Option<SavePolicy>,
    default_mode: Option<DefaultMode>,
    version: Option<i32>,
    handler: Option<Arc<dyn VersionHandler>>,
    registry: Option<Arc<CodecRegistry>>,
}

impl PrefBoxBuilder {
    /// Builder for `contract` over stores from `provider`
    ///
    /// Defaults: the application-wide binding, private mode, the contract's
    /// own policies, no schema version, the global codec registry.
    pub fn new(provider: Arc<dyn StoreProvider>, contract: ContractSpec) -> Self {
        PrefBoxBuilder {
            provider,
            contract,
            binding: Binding::Default,
            mode: StoreMode::Private,
            save_policy: None,
            default_mode: None,
            version: None,
            handler: None,
            registry: None,
        }
    }

    /// Choose the store binding
    pub fn binding(mut self, binding: Binding) -> Self {
        self.binding = binding;
        self
    }

    /// Choose the store mode
    pub fn mode(mut self, mode: StoreMode) -> Self {
        self.mode = mode;
        self
    }

    /// Override the contract-level save policy
    pub fn save_policy(mut self, policy: SavePolicy) -> Self {
        self.save_policy = Some(policy);
        self
    }

    /// Override the contract-level default mode
    pub fn default_mode(mut self, mode: DefaultMode) -> Self {
        self.default_mode = Some(mode);
        self
    }

    /// Codec for every operation on a literal key
    pub fn codec_for_key<C: Codec>(mut self, key: impl Into<String>, codec: C) -> Self {
        self.contract = self.contract.key_codec(KeySource::Literal(key.into()), shared(codec));
        self
    }

    /// Codec for every operation on a symbolic key
    pub fn codec_for_key_resource<C: Codec>(mut self, identifier: impl Into<String>, codec: C) -> Self {
        self.contract = self
            .contract
            .key_codec(KeySource::Resource(identifier.into()), shared(codec));
        self
    }

    /// Codec for every operation on `C::Value`
    pub fn codec_for_type<C: Codec>(mut self, codec: C) -> Self {
        self.contract = self.contract.type_codec(shared(codec));
        self
    }

    /// Codec for one operation, replacing any declared on it
    pub fn codec_for_operation(mut self, op: &str, codec: SharedCodec) -> Self {
        self.contract.operations = self
            .contract
            .operations
            .into_iter()
            .map(|spec| {
                if spec.name == op {
                    spec.shared_codec(codec.clone())
                } else {
                    spec
                }
            })
            .collect();
        self
    }

    /// Declare the schema version
    pub fn version(mut self, version: i32) -> Self {
        self.version = Some(version);
        self
    }

    /// Handler invoked when the persisted version differs
    pub fn handler(mut self, handler: Arc<dyn VersionHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Resolve codecs through `registry` instead of the global one
    pub fn registry(mut self, registry: Arc<CodecRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Apply a loaded config
    ///
    /// Only the settings present in the config are applied.
    pub fn with_config(mut self, config: &PrefBoxConfig) -> PrefResult<Self> {
        self.binding = config.binding()?;
        self.mode = config.mode;
        if let Some(policy) = config.save_policy {
            self.save_policy = Some(policy);
        }
        if let Some(mode) = config.default_mode {
            self.default_mode = Some(mode);
        }
        if let Some(version) = config.version {
            self.version = Some(version);
        }
        Ok(self)
    }

    /// Build the instance
    ///
    /// # Errors
    ///
    /// - `UnsupportedOperation` / `NoCodecFound` / `DefaultTypeMismatch` for
    ///   a contract that cannot be resolved
    /// - `DowngradeNotSupported` or the handler's error if migration fails
    /// - store and resource errors from the provider
    pub fn build(self) -> PrefResult<PrefBox> {
        let bound = self.provider.open(&self.binding, self.mode)?;
        let resources = self.provider.resources();

        let registry: &CodecRegistry = match &self.registry {
            Some(registry) => registry,
            None => CodecRegistry::global(),
        };
        let defaults = ContractDefaults {
            save_policy: self.save_policy.unwrap_or(self.contract.save_policy),
            default_mode: self.default_mode.unwrap_or(self.contract.default_mode),
        };
        let descriptors = DescriptorBuilder::new(&self.contract, registry, resources.as_ref(), defaults)?
            .build_all(&self.contract)?;

        if self.version.is_some() {
            let versions = self.provider.version_store()?;
            MigrationRunner::new(bound.store.as_ref(), versions.as_ref(), &bound.identity)
                .run(self.version, self.handler.as_deref())?;
        }

        let (listeners, subscription) = ListenerTable::attach(Arc::clone(&bound.store));
        let editor = bound.store.open_transaction();

        info!(
            target: "prefbox::build",
            contract = %self.contract.name,
            identity = %bound.identity,
            binding = self.binding.label(),
            operations = descriptors.len(),
            "Built contract instance"
        );

        Ok(PrefBox::from_inner(PrefBoxInner {
            contract: self.contract.name,
            bound,
            resources,
            descriptors,
            editor: Mutex::new(editor),
            listeners,
            _subscription: subscription,
        }))
    }
}

impl std::fmt::Debug for PrefBoxBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrefBoxBuilder")
            .field("contract", &self.contract.name)
            .field("binding", &self.binding)
            .field("mode", &self.mode)
            .field("save_policy", &self.save_policy)
            .field("default_mode", &self.default_mode)
            .field("version", &self.version)
            .finish()
    }
}
