//! Schema version migration
//!
//! A contract may declare a schema version. When it is built against a store
//! identity, the persisted version (0 if none) is compared with the declared
//! one and the version handler is invoked to upgrade or downgrade the data.
//!
//! The handler receives a read-only view of the store and a fresh pending
//! transaction. It must not flush: the runner commits the data transaction
//! first and records the new version only once that commit succeeded. If the
//! handler fails, nothing is written.

use prefbox_core::{PrefError, PrefResult, StorageKind, StoreIdentity, StoredValue};
use prefbox_storage::{KvStore, Transaction};
use tracing::info;

/// Upgrades or downgrades stored data between schema versions
pub trait VersionHandler: Send + Sync {
    /// Migrate data written by version `old` to version `new` (`old < new`)
    fn on_upgrade(
        &self,
        store: &dyn KvStore,
        txn: &mut dyn Transaction,
        old: i32,
        new: i32,
    ) -> PrefResult<()>;

    /// Migrate data written by version `old` to version `new` (`old > new`)
    ///
    /// Fails with `DowngradeNotSupported` unless overridden.
    fn on_downgrade(
        &self,
        _store: &dyn KvStore,
        _txn: &mut dyn Transaction,
        old: i32,
        new: i32,
    ) -> PrefResult<()> {
        Err(PrefError::DowngradeNotSupported { old, new })
    }
}

/// Comparison of the declared and persisted versions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Migration {
    /// The contract declares no version
    NoDeclaredVersion,
    /// Versions match
    Stable(i32),
    /// Persisted version is older
    Upgrade {
        /// Persisted version
        old: i32,
        /// Declared version
        new: i32,
    },
    /// Persisted version is newer
    Downgrade {
        /// Persisted version
        old: i32,
        /// Declared version
        new: i32,
    },
}

impl Migration {
    /// Compare a declared version with a persisted record
    ///
    /// A missing record counts as version 0.
    pub fn plan(declared: Option<i32>, persisted: Option<i32>) -> Migration {
        let Some(new) = declared else {
            return Migration::NoDeclaredVersion;
        };
        let old = persisted.unwrap_or(0);
        match old.cmp(&new) {
            std::cmp::Ordering::Less => Migration::Upgrade { old, new },
            std::cmp::Ordering::Greater => Migration::Downgrade { old, new },
            std::cmp::Ordering::Equal => Migration::Stable(new),
        }
    }
}

/// Persisted schema version of `identity`, if any
pub fn persisted_version(versions: &dyn KvStore, identity: &StoreIdentity) -> PrefResult<Option<i32>> {
    let record = versions.get(identity.as_str(), StorageKind::Int, None)?;
    Ok(record.and_then(|v| v.as_int()))
}

/// Runs migrations for one store identity
pub struct MigrationRunner<'a> {
    store: &'a dyn KvStore,
    versions: &'a dyn KvStore,
    identity: &'a StoreIdentity,
}

impl<'a> MigrationRunner<'a> {
    /// Runner for the data in `store`, recording versions in `versions`
    pub fn new(store: &'a dyn KvStore, versions: &'a dyn KvStore, identity: &'a StoreIdentity) -> Self {
        MigrationRunner {
            store,
            versions,
            identity,
        }
    }

    /// Bring the store to `declared`, returning what was done
    pub fn run(&self, declared: Option<i32>, handler: Option<&dyn VersionHandler>) -> PrefResult<Migration> {
        if declared.is_none() {
            return Ok(Migration::NoDeclaredVersion);
        }
        let persisted = persisted_version(self.versions, self.identity)?;
        let migration = Migration::plan(declared, persisted);

        let (old, new, upgrade) = match migration {
            Migration::NoDeclaredVersion | Migration::Stable(_) => return Ok(migration),
            Migration::Upgrade { old, new } => (old, new, true),
            Migration::Downgrade { old, new } => (old, new, false),
        };

        let mut txn = self.store.open_transaction();
        match (handler, upgrade) {
            (Some(h), true) => h.on_upgrade(self.store, txn.as_mut(), old, new)?,
            (Some(h), false) => h.on_downgrade(self.store, txn.as_mut(), old, new)?,
            (None, true) => {}
            (None, false) => return Err(PrefError::DowngradeNotSupported { old, new }),
        }

        if !txn.commit_sync() {
            return Err(PrefError::Storage(format!(
                "could not commit migration of '{}' from version {} to {}",
                self.identity, old, new
            )));
        }
        self.record(new)?;

        info!(
            target: "prefbox::migrate",
            identity = %self.identity,
            old,
            new,
            direction = if upgrade { "upgrade" } else { "downgrade" },
            "Migrated store"
        );
        Ok(migration)
    }

    fn record(&self, version: i32) -> PrefResult<()> {
        let mut txn = self.versions.open_transaction();
        txn.put(self.identity.as_str(), StoredValue::Int(version));
        if txn.commit_sync() {
            Ok(())
        } else {
            Err(PrefError::Storage(format!(
                "could not record version {} of '{}'",
                version, self.identity
            )))
        }
    }
}
