//! Contract instances and call dispatch
//!
//! A [`PrefBox`] answers calls against a built contract. Every call names an
//! operation; the cached descriptor decides what happens:
//!
//! - get: resolve the default, read, decode
//! - set: encode, stage in the pending transaction, apply the save policy
//! - remove: stage the removal, apply the save policy
//! - register / unregister: update the listener table
//! - passthrough: forward to the store or the pending transaction
//!
//! # Pending transaction
//!
//! Each instance owns one pending transaction. Writes stage into it; a flush
//! swaps it for a fresh one and flushes the old one after the lock is
//! released, so listeners fired by the flush may write back into the same
//! instance.

use crate::contract::Returns;
use crate::defaults::check_default_type;
use crate::descriptor::{DescriptorKind, Forward, KeyArgument, OperationDescriptor};
use crate::listeners::{ListenerTable, ValueListener};
use parking_lot::Mutex;
use prefbox_core::{PrefError, PrefResult, SavePolicy, StoreIdentity, StoredValue};
use prefbox_storage::{BoundStore, KvStore, ResourceLookup, Subscription, Transaction};
use rustc_hash::FxHashMap;
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Result of a write
#[derive(Debug, Clone)]
pub enum Returned {
    /// The operation returns nothing
    Nothing,
    /// The operation returns its contract instance, for chaining
    Contract(PrefBox),
    /// The operation returns the transaction
    Transaction {
        /// Outcome of the synchronous flush, if the save policy committed
        committed: Option<bool>,
    },
}

impl Returned {
    /// The chained instance, if the operation returns one
    pub fn contract(&self) -> Option<&PrefBox> {
        match self {
            Returned::Contract(prefbox) => Some(prefbox),
            _ => None,
        }
    }

    /// Commit outcome, if the operation returns the transaction and committed
    pub fn committed(&self) -> Option<bool> {
        match self {
            Returned::Transaction { committed } => *committed,
            _ => None,
        }
    }
}

/// Result of a forwarded call
#[derive(Debug, Clone, PartialEq)]
pub enum Forwarded {
    /// The method returns nothing
    Nothing,
    /// `contains` and `commit`
    Bool(bool),
    /// `get_raw`
    Value(Option<StoredValue>),
    /// `get_all`
    Entries(BTreeMap<String, StoredValue>),
}

pub(crate) struct PrefBoxInner {
    pub(crate) contract: String,
    pub(crate) bound: BoundStore,
    pub(crate) resources: Arc<dyn ResourceLookup>,
    pub(crate) descriptors: FxHashMap<String, Arc<OperationDescriptor>>,
    pub(crate) editor: Mutex<Box<dyn Transaction>>,
    pub(crate) listeners: Arc<ListenerTable>,
    pub(crate) _subscription: Subscription,
}

/// Typed facade over a key-value store, answering calls of one contract
///
/// Cloning is cheap; clones share the store binding, the pending transaction
/// and the listener table.
#[derive(Clone)]
pub struct PrefBox {
    inner: Arc<PrefBoxInner>,
}

impl PrefBox {
    pub(crate) fn from_inner(inner: PrefBoxInner) -> Self {
        PrefBox {
            inner: Arc::new(inner),
        }
    }

    /// Contract name
    pub fn contract(&self) -> &str {
        &self.inner.contract
    }

    /// Identity of the bound store
    pub fn identity(&self) -> &StoreIdentity {
        &self.inner.bound.identity
    }

    /// The bound store
    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.inner.bound.store
    }

    /// Descriptor of an operation
    pub fn descriptor(&self, op: &str) -> Option<&Arc<OperationDescriptor>> {
        self.inner.descriptors.get(op)
    }

    /// True if both handles are the same instance
    pub fn ptr_eq(a: &PrefBox, b: &PrefBox) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    fn lookup(&self, op: &str) -> PrefResult<&Arc<OperationDescriptor>> {
        self.inner
            .descriptors
            .get(op)
            .ok_or_else(|| PrefError::unsupported(op, format!("not declared by {}", self.inner.contract)))
    }

    fn wrong_kind(descriptor: &OperationDescriptor, call: &str) -> PrefError {
        PrefError::unsupported(
            descriptor.name(),
            format!("is a {} operation, called as {}", descriptor.kind().label(), call),
        )
    }

    fn declared_key(descriptor: &OperationDescriptor) -> PrefResult<&str> {
        descriptor
            .key()
            .ok_or_else(|| PrefError::unsupported(descriptor.name(), "has no declared key"))
    }

    // ========================================================================
    // Get
    // ========================================================================

    /// Read the value of a get operation
    pub fn get<T: Any>(&self, op: &str) -> PrefResult<Option<T>> {
        self.read::<T>(op, None)
    }

    /// Read the value of a get operation declared with a default parameter
    ///
    /// `default` is type-checked on every call, even when a value is stored.
    pub fn get_or<T: Any>(&self, op: &str, default: T) -> PrefResult<Option<T>> {
        let descriptor = self.lookup(op)?;
        let value_type = descriptor
            .value_type()
            .ok_or_else(|| Self::wrong_kind(descriptor, "get_or"))?;
        check_default_type(value_type, &default)?;
        match descriptor.kind() {
            DescriptorKind::Get { takes_default: true, .. } => self.read(op, Some(&default)),
            DescriptorKind::Get { .. } => Err(PrefError::unsupported(op, "declares no default parameter")),
            _ => Err(Self::wrong_kind(descriptor, "get_or")),
        }
    }

    fn read<T: Any>(&self, op: &str, call_default: Option<&T>) -> PrefResult<Option<T>> {
        let descriptor = self.lookup(op)?;
        let DescriptorKind::Get { codec, defaults, .. } = descriptor.kind() else {
            return Err(Self::wrong_kind(descriptor, "get"));
        };
        descriptor.expect_type::<T>()?;
        let key = Self::declared_key(descriptor)?;

        let call_time = call_default
            .map(|d| codec.encode_erased(d as &dyn Any))
            .transpose()?;
        let fallback = defaults.resolve(codec, call_time);
        let stored = self.inner.bound.store.get(key, codec.storage_kind(), fallback)?;

        debug!(target: "prefbox::dispatch", op, key, found = stored.is_some(), "get");
        let Some(stored) = stored else {
            return Ok(None);
        };
        let decoded = codec.decode_erased(stored)?;
        decoded
            .map(|boxed| {
                boxed
                    .downcast::<T>()
                    .map(|b| *b)
                    .map_err(|_| PrefError::decode(std::any::type_name::<T>(), "codec produced another type"))
            })
            .transpose()
    }

    // ========================================================================
    // Set / Remove
    // ========================================================================

    /// Write a value through a set operation
    pub fn set<T: Any + Send>(&self, op: &str, value: T) -> PrefResult<Returned> {
        self.write(op, Some(value))
    }

    /// Write a value, or remove the key when `value` is `None`
    pub fn set_opt<T: Any + Send>(&self, op: &str, value: Option<T>) -> PrefResult<Returned> {
        self.write(op, value)
    }

    fn write<T: Any + Send>(&self, op: &str, value: Option<T>) -> PrefResult<Returned> {
        let descriptor = self.lookup(op)?;
        let DescriptorKind::Set { codec } = descriptor.kind() else {
            return Err(Self::wrong_kind(descriptor, "set"));
        };
        descriptor.expect_type::<T>()?;
        let key = Self::declared_key(descriptor)?;

        let encoded = value.map(|v| codec.encode_erased(&v as &dyn Any)).transpose()?;
        debug!(target: "prefbox::dispatch", op, key, remove = encoded.is_none(), "set");
        self.stage_and_save(descriptor, |txn| match encoded {
            Some(stored) => txn.put(key, stored),
            None => txn.remove(key),
        })
    }

    /// Remove the declared key of a remove operation
    pub fn remove(&self, op: &str) -> PrefResult<Returned> {
        let descriptor = self.lookup(op)?;
        match descriptor.kind() {
            DescriptorKind::Remove { key_argument: KeyArgument::Declared } => {
                let key = Self::declared_key(descriptor)?;
                debug!(target: "prefbox::dispatch", op, key, "remove");
                self.stage_and_save(descriptor, |txn| txn.remove(key))
            }
            DescriptorKind::Remove { .. } => Err(PrefError::unsupported(op, "takes a key argument, use remove_key")),
            _ => Err(Self::wrong_kind(descriptor, "remove")),
        }
    }

    /// Remove a key passed at call time
    ///
    /// The key is literal or symbolic, as the operation declares.
    pub fn remove_key(&self, op: &str, key: &str) -> PrefResult<Returned> {
        let descriptor = self.lookup(op)?;
        let key = match descriptor.kind() {
            DescriptorKind::Remove { key_argument: KeyArgument::Literal } => key.to_string(),
            DescriptorKind::Remove { key_argument: KeyArgument::Symbolic } => {
                self.inner.resources.resolve_string(key)?
            }
            DescriptorKind::Remove { .. } => {
                return Err(PrefError::unsupported(op, "has a declared key, use remove"))
            }
            _ => return Err(Self::wrong_kind(descriptor, "remove_key")),
        };
        debug!(target: "prefbox::dispatch", op, key = %key, "remove");
        self.stage_and_save(descriptor, |txn| txn.remove(&key))
    }

    fn stage_and_save(
        &self,
        descriptor: &OperationDescriptor,
        stage: impl FnOnce(&mut dyn Transaction),
    ) -> PrefResult<Returned> {
        let policy = descriptor.save_policy();
        let flushing = {
            let mut editor = self.inner.editor.lock();
            stage(&mut **editor);
            match policy {
                SavePolicy::None => None,
                SavePolicy::Apply | SavePolicy::Commit => Some(std::mem::replace(
                    &mut *editor,
                    self.inner.bound.store.open_transaction(),
                )),
            }
        };

        let committed = match (policy, flushing) {
            (SavePolicy::Commit, Some(mut txn)) => Some(txn.commit_sync()),
            (SavePolicy::Apply, Some(mut txn)) => {
                txn.apply_async();
                None
            }
            _ => None,
        };

        Ok(match descriptor.returns() {
            Returns::Contract => Returned::Contract(self.clone()),
            Returns::Transaction => Returned::Transaction { committed },
            Returns::Unit | Returns::Value(_) => Returned::Nothing,
        })
    }

    // ========================================================================
    // Listeners
    // ========================================================================

    /// Register a change listener for the operation's key
    ///
    /// The instance keeps only a weak reference.
    pub fn register<T, L>(&self, op: &str, listener: &Arc<L>) -> PrefResult<()>
    where
        T: Any,
        L: ValueListener<T> + ?Sized + 'static,
    {
        self.register_all(op, std::slice::from_ref(listener))
    }

    /// Register several change listeners at once
    pub fn register_all<T, L>(&self, op: &str, listeners: &[Arc<L>]) -> PrefResult<()>
    where
        T: Any,
        L: ValueListener<T> + ?Sized + 'static,
    {
        let descriptor = self.lookup(op)?;
        let DescriptorKind::RegisterListener { codec } = descriptor.kind() else {
            return Err(Self::wrong_kind(descriptor, "register"));
        };
        descriptor.expect_type::<T>()?;
        let key = Self::declared_key(descriptor)?;
        for listener in listeners {
            self.inner.listeners.register::<T, L>(key, codec, listener);
        }
        Ok(())
    }

    /// Unregister a change listener; unknown listeners are ignored
    pub fn unregister<T, L>(&self, op: &str, listener: &Arc<L>) -> PrefResult<()>
    where
        T: Any,
        L: ValueListener<T> + ?Sized + 'static,
    {
        self.unregister_all(op, std::slice::from_ref(listener))
    }

    /// Unregister several change listeners at once
    pub fn unregister_all<T, L>(&self, op: &str, listeners: &[Arc<L>]) -> PrefResult<()>
    where
        T: Any,
        L: ValueListener<T> + ?Sized + 'static,
    {
        let descriptor = self.lookup(op)?;
        if !matches!(descriptor.kind(), DescriptorKind::UnregisterListener) {
            return Err(Self::wrong_kind(descriptor, "unregister"));
        }
        descriptor.expect_type::<T>()?;
        let key = Self::declared_key(descriptor)?;
        for listener in listeners {
            self.inner.listeners.unregister(key, listener);
        }
        Ok(())
    }

    // ========================================================================
    // Passthrough
    // ========================================================================

    /// Forward a call to the store or the pending transaction
    ///
    /// Keys are passed as `StoredValue::String`.
    pub fn forward(&self, op: &str, args: &[StoredValue]) -> PrefResult<Forwarded> {
        let descriptor = self.lookup(op)?;
        let DescriptorKind::Passthrough(forward) = descriptor.kind() else {
            return Err(Self::wrong_kind(descriptor, "forward"));
        };
        let store = &self.inner.bound.store;
        debug!(target: "prefbox::dispatch", op, method = forward.name(), "forward");

        let result = match (forward, args) {
            (Forward::Contains, [StoredValue::String(key)]) => Forwarded::Bool(store.contains(key)),
            (Forward::GetAll, []) => Forwarded::Entries(store.all()),
            (Forward::GetRaw, [StoredValue::String(key)]) => {
                Forwarded::Value(store.get_raw(key))
            }
            (Forward::Put, [StoredValue::String(key), value]) => {
                self.inner.editor.lock().put(key, value.clone());
                Forwarded::Nothing
            }
            (Forward::Remove, [StoredValue::String(key)]) => {
                self.inner.editor.lock().remove(key);
                Forwarded::Nothing
            }
            (Forward::Clear, []) => {
                self.inner.editor.lock().clear();
                Forwarded::Nothing
            }
            (Forward::Apply, []) => {
                self.take_editor().apply_async();
                Forwarded::Nothing
            }
            (Forward::Commit, []) => Forwarded::Bool(self.take_editor().commit_sync()),
            (forward, args) => {
                return Err(PrefError::unsupported(
                    op,
                    format!("{} does not take {} argument(s) of those kinds", forward.name(), args.len()),
                ))
            }
        };
        Ok(result)
    }

    fn take_editor(&self) -> Box<dyn Transaction> {
        let mut editor = self.inner.editor.lock();
        std::mem::replace(&mut *editor, self.inner.bound.store.open_transaction())
    }
}

impl std::fmt::Debug for PrefBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrefBox")
            .field("contract", &self.inner.contract)
            .field("identity", &self.inner.bound.identity)
            .field("operations", &self.inner.descriptors.len())
            .finish()
    }
}
