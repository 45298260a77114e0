//! Schema versions and migration handlers

use crate::common::*;
use parking_lot::Mutex;
use prefbox::{persisted_version, PrefResult};
use std::sync::Arc;

fn contract() -> ContractSpec {
    contract_of(
        "Versioned",
        key_ops("count", "count", ValueType::int())
            .into_iter()
            .chain(key_ops("total", "total", ValueType::int())),
    )
}

/// Moves `count` to `total` on upgrade, back on downgrade
#[derive(Default)]
struct RenameCount {
    calls: Mutex<Vec<(&'static str, i32, i32)>>,
}

impl VersionHandler for RenameCount {
    fn on_upgrade(&self, store: &dyn KvStore, txn: &mut dyn Transaction, old: i32, new: i32) -> PrefResult<()> {
        self.calls.lock().push(("up", old, new));
        if let Some(value) = store.get("count", StorageKind::Int, None)? {
            txn.put("total", value);
            txn.remove("count");
        }
        Ok(())
    }

    fn on_downgrade(&self, store: &dyn KvStore, txn: &mut dyn Transaction, old: i32, new: i32) -> PrefResult<()> {
        self.calls.lock().push(("down", old, new));
        if let Some(value) = store.get("total", StorageKind::Int, None)? {
            txn.put("count", value);
            txn.remove("total");
        }
        Ok(())
    }
}

/// Upgrades only, with the default downgrade refusal
struct UpgradeOnly;

impl VersionHandler for UpgradeOnly {
    fn on_upgrade(&self, _: &dyn KvStore, txn: &mut dyn Transaction, _: i32, _: i32) -> PrefResult<()> {
        txn.clear();
        Ok(())
    }
}

struct Broken;

impl VersionHandler for Broken {
    fn on_upgrade(&self, _: &dyn KvStore, txn: &mut dyn Transaction, _: i32, _: i32) -> PrefResult<()> {
        txn.clear();
        Err(PrefError::invalid_argument("cannot read old layout"))
    }
}

fn build(
    provider: &Arc<MemoryProvider>,
    version: i32,
    handler: Arc<dyn VersionHandler>,
) -> PrefResult<PrefBox> {
    PrefBoxBuilder::new(provider.clone(), contract())
        .version(version)
        .handler(handler)
        .build()
}

fn version_of(provider: &MemoryProvider, prefs: &PrefBox) -> Option<i32> {
    persisted_version(&provider.versions(), prefs.identity()).unwrap()
}

#[test]
fn upgrade_then_stable() {
    let t = TestPrefs::new(contract());
    t.prefs.set("set_count", 5i32).unwrap();

    let handler = Arc::new(RenameCount::default());
    let prefs = build(&t.provider, 2, handler.clone()).unwrap();
    assert_eq!(prefs.get::<i32>("get_total").unwrap(), Some(5));
    assert!(t.store().raw("count").is_none());
    assert_eq!(version_of(&t.provider, &prefs), Some(2));

    build(&t.provider, 2, handler.clone()).unwrap();
    assert_eq!(*handler.calls.lock(), vec![("up", 0, 2)]);
}

#[test]
fn downgrade_with_handler() {
    let t = TestPrefs::new(contract());
    let handler = Arc::new(RenameCount::default());
    let v3 = build(&t.provider, 3, handler.clone()).unwrap();
    v3.set("set_total", 9i32).unwrap();

    let v1 = build(&t.provider, 1, handler.clone()).unwrap();
    assert_eq!(v1.get::<i32>("get_count").unwrap(), Some(9));
    assert_eq!(version_of(&t.provider, &v1), Some(1));
    assert_eq!(*handler.calls.lock(), vec![("up", 0, 3), ("down", 3, 1)]);
}

#[test]
fn downgrade_without_support_fails_and_keeps_data() {
    let t = TestPrefs::new(contract());
    let v2 = build(&t.provider, 2, Arc::new(UpgradeOnly)).unwrap();
    v2.set("set_count", 4i32).unwrap();

    let err = build(&t.provider, 1, Arc::new(UpgradeOnly)).unwrap_err();
    assert!(matches!(err, PrefError::DowngradeNotSupported { old: 2, new: 1 }));
    assert_eq!(t.store().raw("count"), Some(StoredValue::Int(4)));
    assert_eq!(version_of(&t.provider, &v2), Some(2));

    let err = PrefBoxBuilder::new(t.provider.clone(), contract())
        .version(1)
        .build()
        .unwrap_err();
    assert!(matches!(err, PrefError::DowngradeNotSupported { .. }));
}

#[test]
fn failing_handler_leaves_store_untouched() {
    let t = TestPrefs::new(contract());
    t.prefs.set("set_count", 6i32).unwrap();

    let err = build(&t.provider, 1, Arc::new(Broken)).unwrap_err();
    assert!(matches!(err, PrefError::InvalidArgument(_)));
    assert_eq!(t.store().raw("count"), Some(StoredValue::Int(6)));
    assert_eq!(version_of(&t.provider, &t.prefs), None);
}

#[test]
fn versions_are_tracked_per_store() {
    let t = TestPrefs::new(contract());
    let named = PrefBoxBuilder::new(t.provider.clone(), contract())
        .binding(Binding::Named("extra".into()))
        .version(7)
        .build()
        .unwrap();
    assert_eq!(version_of(&t.provider, &named), Some(7));
    assert_eq!(version_of(&t.provider, &t.prefs), None);

    // the version record does not leak into the data store
    assert!(t.provider.store(named.identity()).unwrap().is_empty());
}
