//! Store boundary for prefbox
//!
//! This crate defines what the engine needs from a key-value settings store
//! and ships reference implementations of it:
//! - KvStore / Transaction: the untyped store and its batched writes
//! - ResourceLookup: symbolic identifier resolution
//! - StoreProvider: binding mode to store handle
//! - MemoryStore / FileStore: in-memory and JSON-file stores
//! - MemoryProvider / DirectoryProvider: providers over those stores
//!
//! # Notifications
//!
//! Both bundled stores notify subscribers only for keys whose value actually
//! changed in a flush, on the flushing thread, after their locks are released.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod edits;
pub mod file;
pub mod memory;
pub mod provider;
pub mod resources;
pub mod subscribers;
pub mod traits;

pub use edits::PendingEdits;
pub use file::{FileStore, FileTransaction};
pub use memory::{FlushStats, MemoryStore, MemoryTransaction};
pub use provider::{DirectoryProvider, MemoryProvider};
pub use resources::MapResources;
pub use subscribers::{SubscriberList, Subscription};
pub use traits::{
    identity_for, BoundStore, ChangeCallback, KvStore, ResourceLookup, StoreProvider, Transaction,
    VERSION_STORE_NAME,
};
