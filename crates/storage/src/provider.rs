//! Store providers
//!
//! A provider maps a binding to a store handle. Opening the same identity
//! twice returns the same store, so every contract bound to one identity
//! shares entries and change notifications.

use crate::file::FileStore;
use crate::memory::MemoryStore;
use crate::resources::MapResources;
use crate::traits::{
    identity_for, BoundStore, KvStore, ResourceLookup, StoreProvider, VERSION_STORE_NAME,
};
use parking_lot::Mutex;
use prefbox_core::{Binding, PrefError, PrefResult, StoreIdentity, StoreMode};
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

// ============================================================================
// MemoryProvider
// ============================================================================

/// Provider of in-memory stores, one per identity
///
/// Stores live as long as the provider.
pub struct MemoryProvider {
    app: String,
    stores: Mutex<FxHashMap<StoreIdentity, MemoryStore>>,
    versions: MemoryStore,
    resources: Arc<dyn ResourceLookup>,
}

impl MemoryProvider {
    /// Provider for application `app` with no resources
    pub fn new(app: impl Into<String>) -> Self {
        Self::with_resources(app, MapResources::new())
    }

    /// Provider for application `app` resolving symbols through `resources`
    pub fn with_resources(app: impl Into<String>, resources: impl ResourceLookup + 'static) -> Self {
        MemoryProvider {
            app: app.into(),
            stores: Mutex::new(FxHashMap::default()),
            versions: MemoryStore::new(VERSION_STORE_NAME),
            resources: Arc::new(resources),
        }
    }

    /// The store behind an identity, if it has been opened
    pub fn store(&self, identity: &StoreIdentity) -> Option<MemoryStore> {
        self.stores.lock().get(identity).cloned()
    }

    /// The store behind a binding, creating it if needed
    pub fn store_for(&self, binding: &Binding) -> PrefResult<MemoryStore> {
        let identity = identity_for(&self.app, binding)?;
        Ok(self.get_or_create(identity))
    }

    /// The version record store, concretely typed
    pub fn versions(&self) -> MemoryStore {
        self.versions.clone()
    }

    fn get_or_create(&self, identity: StoreIdentity) -> MemoryStore {
        self.stores
            .lock()
            .entry(identity)
            .or_insert_with_key(|identity| {
                info!(target: "prefbox::store", identity = %identity, "Created memory store");
                MemoryStore::new(identity.as_str())
            })
            .clone()
    }
}

impl StoreProvider for MemoryProvider {
    fn open(&self, binding: &Binding, _mode: StoreMode) -> PrefResult<BoundStore> {
        let identity = identity_for(&self.app, binding)?;
        let store = self.get_or_create(identity.clone());
        Ok(BoundStore {
            store: Arc::new(store),
            identity,
        })
    }

    fn version_store(&self) -> PrefResult<Arc<dyn KvStore>> {
        Ok(Arc::new(self.versions.clone()))
    }

    fn resources(&self) -> Arc<dyn ResourceLookup> {
        Arc::clone(&self.resources)
    }
}

// ============================================================================
// DirectoryProvider
// ============================================================================

/// Provider of JSON file stores kept in one directory
///
/// Each identity maps to `<identity>.json`; version records live in
/// `prefbox.versions.json` next to them. That file is opened once with the
/// provider and is never reachable through a binding.
pub struct DirectoryProvider {
    app: String,
    dir: PathBuf,
    stores: Mutex<FxHashMap<StoreIdentity, FileStore>>,
    versions: FileStore,
    resources: Arc<dyn ResourceLookup>,
}

impl DirectoryProvider {
    /// Provider rooted at `dir`, created if missing
    pub fn new(app: impl Into<String>, dir: impl AsRef<Path>) -> PrefResult<Self> {
        Self::with_resources(app, dir, MapResources::new())
    }

    /// Provider rooted at `dir` resolving symbols through `resources`
    pub fn with_resources(
        app: impl Into<String>,
        dir: impl AsRef<Path>,
        resources: impl ResourceLookup + 'static,
    ) -> PrefResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        let versions = FileStore::open(
            VERSION_STORE_NAME,
            dir.join(format!("{}.json", VERSION_STORE_NAME)),
            StoreMode::Private,
        )?;
        Ok(DirectoryProvider {
            app: app.into(),
            dir,
            stores: Mutex::new(FxHashMap::default()),
            versions,
            resources: Arc::new(resources),
        })
    }

    /// Root directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Wait for background writes of every opened store
    pub fn sync(&self) {
        let stores: Vec<FileStore> = self.stores.lock().values().cloned().collect();
        for store in stores {
            store.sync();
        }
        self.versions.sync();
    }

    /// The version record store, concretely typed
    pub fn versions(&self) -> FileStore {
        self.versions.clone()
    }

    fn file_store(&self, identity: &StoreIdentity, mode: StoreMode) -> PrefResult<FileStore> {
        let mut stores = self.stores.lock();
        if let Some(store) = stores.get(identity) {
            return Ok(store.clone());
        }
        let name = identity.as_str();
        if name == VERSION_STORE_NAME {
            return Err(PrefError::invalid_argument(format!(
                "store name '{}' is reserved for version records",
                name
            )));
        }
        if name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(PrefError::invalid_argument(format!(
                "store name '{}' cannot be used as a file name",
                name
            )));
        }
        let path = self.dir.join(format!("{}.json", name));
        let store = FileStore::open(name, &path, mode)?;
        info!(
            target: "prefbox::store",
            identity = %identity,
            path = %path.display(),
            "Opened file store"
        );
        stores.insert(identity.clone(), store.clone());
        Ok(store)
    }
}

impl StoreProvider for DirectoryProvider {
    fn open(&self, binding: &Binding, mode: StoreMode) -> PrefResult<BoundStore> {
        let identity = identity_for(&self.app, binding)?;
        let store = self.file_store(&identity, mode)?;
        Ok(BoundStore {
            store: Arc::new(store),
            identity,
        })
    }

    fn version_store(&self) -> PrefResult<Arc<dyn KvStore>> {
        Ok(Arc::new(self.versions.clone()))
    }

    fn resources(&self) -> Arc<dyn ResourceLookup> {
        Arc::clone(&self.resources)
    }
}
