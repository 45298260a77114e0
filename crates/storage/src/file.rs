//! JSON-file-backed key-value store
//!
//! Entries live in memory and are mirrored to one JSON file.
//!
//! - `commit_sync` updates memory, then writes the file (temp file + rename)
//!   before returning. A failed write is logged and reported as `false`.
//! - `apply_async` updates memory and notifies immediately, then hands the
//!   snapshot to the store's writer thread. [`FileStore::sync`] waits until
//!   the writer is idle.
//!
//! The writer thread is started on the first apply and lives as long as the
//! store. It only keeps the newest queued snapshot, so a burst of applies
//! costs one file write. Every write carries a generation number; a write
//! older than the last one on disk is skipped, so a commit racing the writer
//! never rolls the file back.
//!
//! In [`StoreMode::MultiProcess`] the file is re-read before each read if its
//! modification time moved since the last load.

use crate::edits::PendingEdits;
use crate::subscribers::{SubscriberList, Subscription};
use crate::traits::{ChangeCallback, KvStore, Transaction};
use parking_lot::{Condvar, Mutex, RwLock};
use prefbox_core::{PrefError, PrefResult, StorageKind, StoreMode, StoredValue};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::SystemTime;
use tracing::{debug, warn};

type Snapshot = BTreeMap<String, StoredValue>;

/// The backing file, shared with the writer thread
struct Disk {
    name: String,
    path: PathBuf,
    /// Serializes file writes; holds the generation currently on disk
    written: Mutex<u64>,
    loaded_at: Mutex<Option<SystemTime>>,
}

#[derive(Default)]
struct WriteQueue {
    /// Newest snapshot not yet handed to the writer
    pending: Option<(u64, Snapshot)>,
    writing: bool,
    closed: bool,
}

/// Hand-off between appliers and the writer thread
#[derive(Default)]
struct Writer {
    queue: Mutex<WriteQueue>,
    work_ready: Condvar,
    drained: Condvar,
}

struct FileInner {
    disk: Arc<Disk>,
    mode: StoreMode,
    entries: RwLock<Snapshot>,
    subscribers: SubscriberList,
    /// Last generation handed out to a write
    generation: AtomicU64,
    writer: Arc<Writer>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

/// Store persisted as a JSON object in a single file
#[derive(Clone)]
pub struct FileStore {
    inner: Arc<FileInner>,
}

impl FileStore {
    /// Open the store at `path`, loading it if the file exists
    ///
    /// The parent directory must exist. A missing file is an empty store.
    pub fn open(name: impl Into<String>, path: impl AsRef<Path>, mode: StoreMode) -> PrefResult<Self> {
        let path = path.as_ref().to_path_buf();
        let (entries, loaded_at) = read_file(&path)?;
        let name = name.into();
        debug!(
            target: "prefbox::store",
            store = %name,
            path = %path.display(),
            entries = entries.len(),
            "Opened file store"
        );
        Ok(FileStore {
            inner: Arc::new(FileInner {
                disk: Arc::new(Disk {
                    name,
                    path,
                    written: Mutex::new(0),
                    loaded_at: Mutex::new(loaded_at),
                }),
                mode,
                entries: RwLock::new(entries),
                subscribers: SubscriberList::new(),
                generation: AtomicU64::new(0),
                writer: Arc::new(Writer::default()),
                worker: Mutex::new(None),
            }),
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.inner.disk.path
    }

    /// Store mode this store was opened with
    pub fn mode(&self) -> StoreMode {
        self.inner.mode
    }

    /// Wait until every applied snapshot has been written
    pub fn sync(&self) {
        let writer = &self.inner.writer;
        let mut queue = writer.queue.lock();
        while queue.pending.is_some() || queue.writing {
            writer.drained.wait(&mut queue);
        }
    }

    #[cfg(test)]
    fn has_writer(&self) -> bool {
        self.inner.worker.lock().is_some()
    }

    fn refresh(&self) {
        if self.inner.mode != StoreMode::MultiProcess {
            return;
        }
        let disk = &self.inner.disk;
        let modified = match fs::metadata(&disk.path).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(_) => return,
        };
        let mut loaded_at = disk.loaded_at.lock();
        if *loaded_at == Some(modified) {
            return;
        }
        match read_file(&disk.path) {
            Ok((entries, at)) => {
                *self.inner.entries.write() = entries;
                *loaded_at = at;
                debug!(target: "prefbox::store", store = %disk.name, "Reloaded changed file");
            }
            Err(e) => {
                warn!(target: "prefbox::store", store = %disk.name, error = %e, "Reload failed");
            }
        }
    }

    /// Apply edits in memory; returns the snapshot to persist and its generation
    fn apply_in_memory(&self, edits: PendingEdits) -> (u64, Snapshot, Vec<String>) {
        let mut entries = self.inner.entries.write();
        let changed = edits.apply_to(&mut entries);
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        (generation, entries.clone(), changed)
    }

    /// Queue a snapshot for the writer thread, replacing an older queued one
    fn enqueue(&self, generation: u64, snapshot: Snapshot) {
        {
            let mut queue = self.inner.writer.queue.lock();
            let newer_queued = matches!(&queue.pending, Some((queued, _)) if *queued > generation);
            if !newer_queued {
                queue.pending = Some((generation, snapshot));
            }
        }
        self.inner.writer.work_ready.notify_one();
        self.ensure_worker();
    }

    fn ensure_worker(&self) {
        let mut worker = self.inner.worker.lock();
        if worker.is_some() {
            return;
        }
        let writer = Arc::clone(&self.inner.writer);
        let disk = Arc::clone(&self.inner.disk);
        let spawned = thread::Builder::new()
            .name(format!("prefbox-writer-{}", disk.name))
            .spawn(move || write_loop(&writer, &disk));
        match spawned {
            Ok(handle) => *worker = Some(handle),
            Err(e) => {
                warn!(target: "prefbox::store", store = %self.inner.disk.name, error = %e, "Could not start writer, writing inline");
                drop(worker);
                self.write_pending_inline();
            }
        }
    }

    fn write_pending_inline(&self) {
        let writer = &self.inner.writer;
        let pending = {
            let mut queue = writer.queue.lock();
            let pending = queue.pending.take();
            queue.writing = pending.is_some();
            pending
        };
        if let Some((generation, snapshot)) = pending {
            if let Err(e) = self.inner.disk.persist(generation, &snapshot) {
                warn!(target: "prefbox::store", store = %self.inner.disk.name, error = %e, "Write failed");
            }
        }
        writer.queue.lock().writing = false;
        writer.drained.notify_all();
    }
}

/// Writer thread body: write the newest queued snapshot until closed
fn write_loop(writer: &Writer, disk: &Disk) {
    loop {
        let (generation, snapshot) = {
            let mut queue = writer.queue.lock();
            loop {
                if let Some(job) = queue.pending.take() {
                    queue.writing = true;
                    break job;
                }
                if queue.closed {
                    return;
                }
                writer.work_ready.wait(&mut queue);
            }
        };

        if let Err(e) = disk.persist(generation, &snapshot) {
            warn!(target: "prefbox::store", store = %disk.name, error = %e, "Background write failed");
        }

        let mut queue = writer.queue.lock();
        queue.writing = false;
        if queue.pending.is_none() {
            writer.drained.notify_all();
        }
    }
}

impl Drop for FileInner {
    fn drop(&mut self) {
        self.writer.queue.lock().closed = true;
        self.writer.work_ready.notify_all();
        // the writer drains what is queued before it exits
        if let Some(handle) = self.worker.lock().take() {
            if handle.join().is_err() {
                warn!(target: "prefbox::store", store = %self.disk.name, "Writer thread panicked");
            }
        }
    }
}

impl Disk {
    fn persist(&self, generation: u64, snapshot: &Snapshot) -> PrefResult<()> {
        let mut written = self.written.lock();
        if *written >= generation {
            return Ok(());
        }
        let json = serde_json::to_vec_pretty(snapshot)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        *written = generation;

        if let Ok(modified) = fs::metadata(&self.path).and_then(|m| m.modified()) {
            *self.loaded_at.lock() = Some(modified);
        }
        debug!(
            target: "prefbox::store",
            store = %self.name,
            generation,
            entries = snapshot.len(),
            "Wrote store file"
        );
        Ok(())
    }
}

fn read_file(path: &Path) -> PrefResult<(BTreeMap<String, StoredValue>, Option<SystemTime>)> {
    if !path.exists() {
        return Ok((BTreeMap::new(), None));
    }
    let raw = fs::read_to_string(path)?;
    let modified = fs::metadata(path).and_then(|m| m.modified()).ok();
    if raw.trim().is_empty() {
        return Ok((BTreeMap::new(), modified));
    }
    let entries = serde_json::from_str(&raw).map_err(|e| {
        PrefError::Storage(format!("{} is not a valid store file: {}", path.display(), e))
    })?;
    Ok((entries, modified))
}

impl std::fmt::Debug for FileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStore")
            .field("name", &self.inner.disk.name)
            .field("path", &self.inner.disk.path)
            .field("mode", &self.inner.mode)
            .finish()
    }
}

impl KvStore for FileStore {
    fn get(
        &self,
        key: &str,
        kind: StorageKind,
        default: Option<StoredValue>,
    ) -> PrefResult<Option<StoredValue>> {
        self.refresh();
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
        self.refresh();
        self.inner.entries.read().contains_key(key)
    }

    fn get_raw(&self, key: &str) -> Option<StoredValue> {
        self.refresh();
        self.inner.entries.read().get(key).cloned()
    }

    fn all(&self) -> BTreeMap<String, StoredValue> {
        self.refresh();
        self.inner.entries.read().clone()
    }

    fn open_transaction(&self) -> Box<dyn Transaction> {
        Box::new(FileTransaction {
            store: self.clone(),
            edits: PendingEdits::new(),
        })
    }

    fn subscribe(&self, on_change: ChangeCallback) -> Subscription {
        self.inner.subscribers.subscribe(on_change)
    }
}

/// Transaction against a [`FileStore`]
pub struct FileTransaction {
    store: FileStore,
    edits: PendingEdits,
}

impl Transaction for FileTransaction {
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
        let edits = self.edits.take();
        if edits.is_empty() {
            return;
        }
        let (generation, snapshot, changed) = self.store.apply_in_memory(edits);
        self.store.inner.subscribers.notify(&changed);
        self.store.enqueue(generation, snapshot);
    }

    fn commit_sync(&mut self) -> bool {
        let edits = self.edits.take();
        let (generation, snapshot, changed) = self.store.apply_in_memory(edits);
        let outcome = self.store.inner.disk.persist(generation, &snapshot);
        self.store.inner.subscribers.notify(&changed);
        match outcome {
            Ok(()) => true,
            Err(e) => {
                warn!(target: "prefbox::store", store = %self.store.inner.disk.name, error = %e, "Commit failed");
                false
            }
        }
    }
}
