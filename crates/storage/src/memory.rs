//! In-memory key-value store
//!
//! Flushes are applied synchronously under a write lock, for both `apply`
//! and `commit`. Change callbacks run after the lock is released, on the
//! flushing thread.

use crate::edits::PendingEdits;
use crate::subscribers::{SubscriberList, Subscription};
use crate::traits::{ChangeCallback, KvStore, Transaction};
use parking_lot::RwLock;
use prefbox_core::{PrefError, PrefResult, StorageKind, StoredValue};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Flush counters of a [`MemoryStore`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushStats {
    /// Asynchronous flushes
    pub applies: u64,
    /// Synchronous flushes, successful or not
    pub commits: u64,
}

struct MemoryInner {
    name: String,
    entries: RwLock<BTreeMap<String, StoredValue>>,
    subscribers: SubscriberList,
    applies: AtomicU64,
    commits: AtomicU64,
    reject_commits: AtomicBool,
}

/// Thread-safe in-memory store
///
/// Cloning is cheap and every clone sees the same entries.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new(name: impl Into<String>) -> Self {
        MemoryStore {
            inner: Arc::new(MemoryInner {
                name: name.into(),
                entries: RwLock::new(BTreeMap::new()),
                subscribers: SubscriberList::new(),
                applies: AtomicU64::new(0),
                commits: AtomicU64::new(0),
                reject_commits: AtomicBool::new(false),
            }),
        }
    }

    /// Create a store pre-filled with entries
    ///
    /// Seeding does not notify anyone.
    pub fn with_entries<I, K>(name: impl Into<String>, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, StoredValue)>,
        K: Into<String>,
    {
        let store = Self::new(name);
        store
            .inner
            .entries
            .write()
            .extend(entries.into_iter().map(|(k, v)| (k.into(), v)));
        store
    }

    /// Store name, for logs
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Flush counters since creation
    pub fn stats(&self) -> FlushStats {
        FlushStats {
            applies: self.inner.applies.load(Ordering::Relaxed),
            commits: self.inner.commits.load(Ordering::Relaxed),
        }
    }

    /// Make every later commit fail without changing anything
    ///
    /// Lets callers exercise the `commit_sync() == false` path.
    pub fn reject_commits(&self, reject: bool) {
        self.inner.reject_commits.store(reject, Ordering::Relaxed);
    }

    /// Raw primitive under `key`, whatever its kind
    pub fn raw(&self, key: &str) -> Option<StoredValue> {
        self.inner.entries.read().get(key).cloned()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.inner.entries.read().len()
    }

    /// True if the store holds nothing
    pub fn is_empty(&self) -> bool {
        self.inner.entries.read().is_empty()
    }

    /// Number of active change callbacks
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }

    fn flush(&self, edits: PendingEdits) {
        if edits.is_empty() {
            return;
        }
        let changed = {
            let mut entries = self.inner.entries.write();
            edits.apply_to(&mut entries)
        };
        debug!(
            target: "prefbox::store",
            store = %self.inner.name,
            changed = changed.len(),
            "Flushed edits"
        );
        self.inner.subscribers.notify(&changed);
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("name", &self.inner.name)
            .field("entries", &self.len())
            .finish()
    }
}

impl KvStore for MemoryStore {
    fn get(
        &self,
        key: &str,
        kind: StorageKind,
        default: Option<StoredValue>,
    ) -> PrefResult<Option<StoredValue>> {
        match self.inner.entries.read().get(key) {
            Some(value) if value.kind() == kind => Ok(Some(value.clone())),
            Some(value) => Err(PrefError::KindMismatch {
                key: key.to_string(),
                expected: kind,
                actual: value.kind(),
            }),
            None => Ok(default),
        }
    }

    fn contains(&self, key: &str) -> bool {
        self.inner.entries.read().contains_key(key)
    }

    fn get_raw(&self, key: &str) -> Option<StoredValue> {
        self.raw(key)
    }

    fn all(&self) -> BTreeMap<String, StoredValue> {
        self.inner.entries.read().clone()
    }

    fn open_transaction(&self) -> Box<dyn Transaction> {
        Box::new(MemoryTransaction {
            store: self.clone(),
            edits: PendingEdits::new(),
        })
    }

    fn subscribe(&self, on_change: ChangeCallback) -> Subscription {
        self.inner.subscribers.subscribe(on_change)
    }
}

/// Transaction against a [`MemoryStore`]
pub struct MemoryTransaction {
    store: MemoryStore,
    edits: PendingEdits,
}

impl Transaction for MemoryTransaction {
    fn put(&mut self, key: &str, value: StoredValue) {
        self.edits.put(key, value);
    }

    fn remove(&mut self, key: &str) {
        self.edits.remove(key);
    }

    fn clear(&mut self) {
        self.edits.clear();
    }

    fn apply_async(&mut self) {
        self.store.inner.applies.fetch_add(1, Ordering::Relaxed);
        let edits = self.edits.take();
        self.store.flush(edits);
    }

    fn commit_sync(&mut self) -> bool {
        self.store.inner.commits.fetch_add(1, Ordering::Relaxed);
        let edits = self.edits.take();
        if self.store.inner.reject_commits.load(Ordering::Relaxed) {
            debug!(target: "prefbox::store", store = %self.store.inner.name, "Commit rejected");
            return false;
        }
        self.store.flush(edits);
        true
    }
}
