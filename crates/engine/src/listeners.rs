//! Change listeners
//!
//! Listeners are held weakly: the table never keeps one alive. Registering
//! hands the table an `Arc`; once the caller drops its last clone, the entry
//! stops being invoked and is purged by the next change of its key.
//!
//! Entry identity is the address of the listener allocation, so registering
//! the same `Arc` twice for one key keeps a single entry, and unregistering a
//! listener that is not (or no longer) registered does nothing.
//!
//! # Delivery
//!
//! The table subscribes to the store once. On a change of key `K`, every live
//! entry of `K` reads the current primitive (falling back to its codec's
//! absent value), decodes it, and is invoked synchronously on the thread that
//! flushed the change. Entries are snapshotted under the lock and invoked
//! outside it, so listeners may register, unregister or write freely.

use parking_lot::Mutex;
use prefbox_core::{DomainValue, SharedCodec};
use prefbox_storage::{KvStore, Subscription};
use rustc_hash::FxHashMap;
use std::any::Any;
use std::marker::PhantomData;
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

/// Receives the new value of a key after every change
///
/// Implemented for any `Fn(Option<T>) + Send + Sync` closure.
pub trait ValueListener<T>: Send + Sync {
    /// Called with the decoded value; `None` if the key holds nothing
    fn on_value_changed(&self, value: Option<T>);
}

impl<T, F> ValueListener<T> for F
where
    F: Fn(Option<T>) + Send + Sync,
{
    fn on_value_changed(&self, value: Option<T>) {
        self(value)
    }
}

/// Weak reference to a typed listener, erased
trait WeakListener: Send + Sync {
    fn is_alive(&self) -> bool;

    /// Deliver a value; `false` if the listener is gone
    fn deliver(&self, value: Option<DomainValue>) -> bool;
}

struct TypedListener<T, L: ?Sized> {
    listener: Weak<L>,
    _value: PhantomData<fn(T)>,
}

impl<T, L> WeakListener for TypedListener<T, L>
where
    T: Any,
    L: ValueListener<T> + ?Sized,
{
    fn is_alive(&self) -> bool {
        self.listener.strong_count() > 0
    }

    fn deliver(&self, value: Option<DomainValue>) -> bool {
        let Some(listener) = self.listener.upgrade() else {
            return false;
        };
        let typed = value.and_then(|boxed| boxed.downcast::<T>().ok()).map(|boxed| *boxed);
        listener.on_value_changed(typed);
        true
    }
}

#[derive(Clone)]
struct ListenerEntry {
    address: usize,
    target: Arc<dyn WeakListener>,
    codec: SharedCodec,
}

fn address_of<L: ?Sized>(listener: &Arc<L>) -> usize {
    Arc::as_ptr(listener) as *const () as usize
}

/// Per-key weak listener table bound to one store
pub struct ListenerTable {
    store: Arc<dyn KvStore>,
    entries: Mutex<FxHashMap<String, Vec<ListenerEntry>>>,
}

impl ListenerTable {
    /// Create a table and subscribe it to `store`
    ///
    /// The returned subscription must live as long as the table should
    /// receive changes.
    pub fn attach(store: Arc<dyn KvStore>) -> (Arc<ListenerTable>, Subscription) {
        let table = Arc::new(ListenerTable {
            store: Arc::clone(&store),
            entries: Mutex::new(FxHashMap::default()),
        });
        let weak = Arc::downgrade(&table);
        let subscription = store.subscribe(Arc::new(move |key: &str| {
            if let Some(table) = weak.upgrade() {
                table.dispatch(key);
            }
        }));
        (table, subscription)
    }

    /// Add a listener for `key`; a second registration of the same `Arc` is a no-op
    pub fn register<T, L>(&self, key: &str, codec: &SharedCodec, listener: &Arc<L>)
    where
        T: Any,
        L: ValueListener<T> + ?Sized + 'static,
    {
        let address = address_of(listener);
        let mut entries = self.entries.lock();
        let list = entries.entry(key.to_string()).or_default();
        list.retain(|e| e.target.is_alive());
        if list.iter().any(|e| e.address == address) {
            return;
        }
        list.push(ListenerEntry {
            address,
            target: Arc::new(TypedListener::<T, L> {
                listener: Arc::downgrade(listener),
                _value: PhantomData,
            }),
            codec: codec.clone(),
        });
        debug!(target: "prefbox::listen", key, listeners = list.len(), "Registered listener");
    }

    /// Remove a listener from `key`
    pub fn unregister<L: ?Sized>(&self, key: &str, listener: &Arc<L>) {
        let address = address_of(listener);
        let mut entries = self.entries.lock();
        if let Some(list) = entries.get_mut(key) {
            list.retain(|e| e.address != address && e.target.is_alive());
            if list.is_empty() {
                entries.remove(key);
            }
        }
    }

    /// Number of entries registered for `key`, including dead ones not yet purged
    pub fn len(&self, key: &str) -> usize {
        self.entries.lock().get(key).map_or(0, Vec::len)
    }

    /// True if no key has entries
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    fn dispatch(&self, key: &str) {
        let snapshot: Vec<ListenerEntry> = match self.entries.lock().get(key) {
            Some(list) => list.clone(),
            None => return,
        };

        let mut dead = Vec::new();
        for entry in &snapshot {
            if !entry.target.is_alive() {
                dead.push(entry.address);
                continue;
            }
            let value = self
                .store
                .get(key, entry.codec.storage_kind(), entry.codec.absent_value())
                .and_then(|stored| match stored {
                    Some(stored) => entry.codec.decode_erased(stored),
                    None => Ok(None),
                });
            match value {
                Ok(value) => {
                    if !entry.target.deliver(value) {
                        dead.push(entry.address);
                    }
                }
                Err(e) => {
                    warn!(target: "prefbox::listen", key, error = %e, "Skipping listener, value unreadable");
                }
            }
        }

        if !dead.is_empty() {
            let mut entries = self.entries.lock();
            if let Some(list) = entries.get_mut(key) {
                list.retain(|e| !dead.contains(&e.address) || e.target.is_alive());
                if list.is_empty() {
                    entries.remove(key);
                }
            }
            debug!(target: "prefbox::listen", key, purged = dead.len(), "Purged collected listeners");
        }
    }
}

impl std::fmt::Debug for ListenerTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerTable")
            .field("keys", &self.entries.lock().len())
            .finish()
    }
}
