//! Change-callback bookkeeping shared by the bundled stores
//!
//! Callbacks are invoked outside the table lock, so a callback may
//! subscribe, unsubscribe or flush another transaction without deadlocking.

use crate::traits::ChangeCallback;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

#[derive(Default)]
struct SubscriberTable {
    next_id: u64,
    callbacks: BTreeMap<u64, ChangeCallback>,
}

/// Registered change callbacks of one store
#[derive(Clone, Default)]
pub struct SubscriberList {
    table: Arc<Mutex<SubscriberTable>>,
}

impl SubscriberList {
    /// Empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a callback; it is removed when the returned handle drops
    pub fn subscribe(&self, on_change: ChangeCallback) -> Subscription {
        let mut table = self.table.lock();
        let id = table.next_id;
        table.next_id += 1;
        table.callbacks.insert(id, on_change);
        Subscription {
            id,
            table: Arc::downgrade(&self.table),
        }
    }

    /// Invoke every callback once per changed key
    pub fn notify(&self, keys: &[String]) {
        if keys.is_empty() {
            return;
        }
        let callbacks: Vec<ChangeCallback> = self.table.lock().callbacks.values().cloned().collect();
        for key in keys {
            for callback in &callbacks {
                callback(key);
            }
        }
    }

    /// Number of active callbacks
    pub fn len(&self) -> usize {
        self.table.lock().callbacks.len()
    }

    /// True if nothing is subscribed
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Handle keeping a change callback registered
///
/// Dropping it unsubscribes. It does not keep the store alive.
pub struct Subscription {
    id: u64,
    table: Weak<Mutex<SubscriberTable>>,
}

impl Subscription {
    /// A handle attached to nothing, for stores without notifications
    pub fn detached() -> Self {
        Subscription {
            id: 0,
            table: Weak::new(),
        }
    }

    /// True while the callback is still registered
    pub fn is_active(&self) -> bool {
        self.table
            .upgrade()
            .map(|table| table.lock().callbacks.contains_key(&self.id))
            .unwrap_or(false)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(table) = self.table.upgrade() {
            table.lock().callbacks.remove(&self.id);
        }
    }
}
