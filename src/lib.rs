//! prefbox - typed, contract-driven settings over untyped key-value stores
//!
//! Declare a contract of named operations, build it against a store, and
//! call it with domain types. prefbox encodes values through codecs,
//! resolves defaults, flushes according to the save policy, notifies weak
//! listeners of changes, and migrates stored data between schema versions.
//!
//! # Quick Start
//!
//! ```ignore
//! use prefbox::{ContractSpec, MemoryProvider, OperationSpec, PrefBoxBuilder, ValueType};
//! use std::sync::Arc;
//!
//! let contract = ContractSpec::new("Settings")
//!     .operation(OperationSpec::getter("volume", "volume", ValueType::int()).default_value(5))
//!     .operation(OperationSpec::setter("set_volume", "volume", ValueType::int()));
//!
//! let prefs = PrefBoxBuilder::new(Arc::new(MemoryProvider::new("app")), contract).build()?;
//! assert_eq!(prefs.get::<i32>("volume")?, Some(5));
//! prefs.set("set_volume", 7)?;
//! ```
//!
//! # Crates
//!
//! - `prefbox-core`: primitives, codecs, the codec registry, errors
//! - `prefbox-storage`: store traits and the bundled stores
//! - `prefbox-engine`: contracts, dispatch, listeners, migrations

pub use prefbox_core::*;
pub use prefbox_engine::*;
pub use prefbox_storage::*;
