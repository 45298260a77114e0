//! Staged edits shared by the bundled transactions
//!
//! Edits to one key overwrite each other, so only the last put or remove of a
//! key survives. A staged clear is applied before every other edit, whatever
//! order the calls were made in.

use prefbox_core::StoredValue;
use std::collections::BTreeMap;

/// Edits staged by a transaction and not yet flushed
#[derive(Debug, Clone, Default)]
pub struct PendingEdits {
    clear: bool,
    changes: BTreeMap<String, Option<StoredValue>>,
}

impl PendingEdits {
    /// Nothing staged
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a put
    pub fn put(&mut self, key: &str, value: StoredValue) {
        self.changes.insert(key.to_string(), Some(value));
    }

    /// Stage a removal
    pub fn remove(&mut self, key: &str) {
        self.changes.insert(key.to_string(), None);
    }

    /// Stage a clear
    pub fn clear(&mut self) {
        self.clear = true;
    }

    /// True if nothing is staged
    pub fn is_empty(&self) -> bool {
        !self.clear && self.changes.is_empty()
    }

    /// Move the staged edits out, leaving this empty
    pub fn take(&mut self) -> PendingEdits {
        std::mem::take(self)
    }

    /// Apply the edits to `entries`, returning the keys whose value changed
    ///
    /// Writing a value equal to the current one, or removing a missing key,
    /// is not a change. Keys come back in sorted order.
    pub fn apply_to(self, entries: &mut BTreeMap<String, StoredValue>) -> Vec<String> {
        let mut before: BTreeMap<String, Option<StoredValue>> = BTreeMap::new();

        if self.clear {
            for (key, value) in std::mem::take(entries) {
                before.insert(key, Some(value));
            }
        }

        for (key, edit) in self.changes {
            let previous = match edit {
                Some(value) => entries.insert(key.clone(), value),
                None => entries.remove(&key),
            };
            before.entry(key).or_insert(previous);
        }

        before
            .into_iter()
            .filter(|(key, old)| old.as_ref() != entries.get(key))
            .map(|(key, _)| key)
            .collect()
    }
}
