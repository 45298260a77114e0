//! Boundary traits between the engine and its backing stores
//!
//! The engine never assumes a concrete store. It consumes:
//! - KvStore: primitive reads, a transaction factory and a change callback
//! - Transaction: batched writes flushed asynchronously or synchronously
//! - ResourceLookup: symbolic identifier to string resolution
//! - StoreProvider: binding mode to store handle and identity

use crate::subscribers::Subscription;
use prefbox_core::{Binding, PrefError, PrefResult, StorageKind, StoreIdentity, StoreMode, StoredValue};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Name of the store holding schema version records
///
/// Reserved: no binding may name it.
pub const VERSION_STORE_NAME: &str = "prefbox.versions";

/// Callback invoked with the key of every changed entry
///
/// Runs on the thread that flushed the change.
pub type ChangeCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// A persistent key-value settings store
pub trait KvStore: Send + Sync {
    /// Read the primitive under `key`, or `default` if nothing is stored
    ///
    /// Fails with `KindMismatch` if the key holds a primitive of another kind.
    fn get(
        &self,
        key: &str,
        kind: StorageKind,
        default: Option<StoredValue>,
    ) -> PrefResult<Option<StoredValue>>;

    /// True if any primitive is stored under `key`
    fn contains(&self, key: &str) -> bool;

    /// Primitive under `key` whatever its kind, or `None`
    fn get_raw(&self, key: &str) -> Option<StoredValue>;

    /// Snapshot of every entry
    fn all(&self) -> BTreeMap<String, StoredValue>;

    /// Start a new pending transaction
    fn open_transaction(&self) -> Box<dyn Transaction>;

    /// Register a change callback; it stays active until the handle drops
    fn subscribe(&self, on_change: ChangeCallback) -> Subscription;
}

/// Pending writes against a [`KvStore`]
///
/// Edits are invisible until flushed. A flush applies `clear` first, then
/// puts and removes in the order they were made, and leaves the
/// transaction empty and reusable.
pub trait Transaction: Send {
    /// Stage a primitive under `key`; the value carries its storage kind
    fn put(&mut self, key: &str, value: StoredValue);

    /// Stage removal of `key`
    fn remove(&mut self, key: &str);

    /// Stage removal of every key
    fn clear(&mut self);

    /// Flush without waiting for persistence
    fn apply_async(&mut self);

    /// Flush and wait; `false` if the store could not persist the edits
    fn commit_sync(&mut self) -> bool;
}

/// Resolves symbolic identifiers to strings
pub trait ResourceLookup: Send + Sync {
    /// String for `identifier`, or `ResourceNotFound`
    fn resolve_string(&self, identifier: &str) -> PrefResult<String>;
}

/// A store handle together with its identity
#[derive(Clone)]
pub struct BoundStore {
    /// The store holding domain data
    pub store: Arc<dyn KvStore>,
    /// Identity joining the store to its version record
    pub identity: StoreIdentity,
}

/// Supplies stores by binding mode
pub trait StoreProvider: Send + Sync {
    /// Store and identity for a binding
    ///
    /// Opening the same identity twice returns the same underlying store.
    fn open(&self, binding: &Binding, mode: StoreMode) -> PrefResult<BoundStore>;

    /// Store holding schema version records, separate from all domain data
    fn version_store(&self) -> PrefResult<Arc<dyn KvStore>>;

    /// Resource lookup for symbolic keys and defaults
    fn resources(&self) -> Arc<dyn ResourceLookup>;
}

/// Derive a store identity from a binding
///
/// Scoped and named bindings need a non-empty name other than
/// [`VERSION_STORE_NAME`].
pub fn identity_for(app: &str, binding: &Binding) -> PrefResult<StoreIdentity> {
    match binding {
        Binding::Default => Ok(StoreIdentity::default_for(app)),
        Binding::Scoped(scope) if scope.is_empty() => Err(PrefError::invalid_argument(
            "Cannot use a scoped binding with an empty scope name",
        )),
        Binding::Named(name) if name.is_empty() => Err(PrefError::invalid_argument(
            "Cannot use a named binding with an empty name",
        )),
        Binding::Scoped(name) | Binding::Named(name) if name == VERSION_STORE_NAME => {
            Err(PrefError::invalid_argument(format!(
                "Store name '{}' is reserved for version records",
                name
            )))
        }
        Binding::Scoped(name) | Binding::Named(name) => Ok(StoreIdentity::new(name.clone())),
    }
}
