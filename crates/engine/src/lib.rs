//! Contract engine for prefbox
//!
//! This crate turns declared contracts into working instances:
//! - contract: operation and contract declarations
//! - descriptor: one-time resolution of operations into descriptors
//! - defaults: fallback values for gets
//! - prefbox: the `PrefBox` instance and call dispatch
//! - listeners: weak change listeners
//! - migration: schema version upgrades and downgrades
//! - builder / config: construction from code or `prefbox.toml`
//!
//! The engine only knows stores through the `prefbox-storage` traits.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod builder;
pub mod config;
pub mod contract;
pub mod defaults;
pub mod descriptor;
pub mod listeners;
pub mod migration;
pub mod prefbox;

pub use builder::PrefBoxBuilder;
pub use config::{PrefBoxConfig, CONFIG_FILE_NAME};
pub use contract::{ContractSpec, DefaultSource, KeySource, Marker, OperationSpec, ResourceKey, Returns};
pub use defaults::DefaultPlan;
pub use descriptor::{
    ContractDefaults, DescriptorBuilder, DescriptorKind, Forward, KeyArgument, OperationDescriptor,
};
pub use listeners::{ListenerTable, ValueListener};
pub use migration::{persisted_version, Migration, MigrationRunner, VersionHandler};
pub use prefbox::{Forwarded, PrefBox, Returned};
