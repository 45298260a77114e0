//! Contracts over JSON file stores

use crate::common::*;
use prefbox::{persisted_version, PrefBoxConfig, PrefResult, CONFIG_FILE_NAME, VERSION_STORE_NAME};
use std::sync::Arc;
use tempfile::TempDir;

fn contract() -> ContractSpec {
    contract_of(
        "OnDisk",
        key_ops("count", "count", ValueType::int())
            .into_iter()
            .chain(key_ops("name", "user.name", ValueType::of::<String>()))
            .chain([OperationSpec::setter("save_count", "count", ValueType::int())
                .save_policy(SavePolicy::Commit)
                .returns(Returns::Transaction)]),
    )
}

fn open(dir: &TempDir) -> (Arc<DirectoryProvider>, PrefBox) {
    init_tracing();
    let provider = Arc::new(DirectoryProvider::with_resources("app", dir.path(), resources()).unwrap());
    let prefs = PrefBoxBuilder::new(provider.clone(), contract()).build().unwrap();
    (provider, prefs)
}

#[test]
fn committed_values_survive_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let (_provider, prefs) = open(&dir);
        let returned = prefs.set("save_count", 12i32).unwrap();
        assert_eq!(returned.committed(), Some(true));
    }
    assert!(dir.path().join("app_preferences.json").exists());

    let (_provider, prefs) = open(&dir);
    assert_eq!(prefs.get::<i32>("get_count").unwrap(), Some(12));
}

#[test]
fn applied_values_survive_after_sync() {
    let dir = TempDir::new().unwrap();
    {
        let (provider, prefs) = open(&dir);
        prefs.set("set_name", "ada".to_string()).unwrap();
        // visible immediately, before the background write
        assert_eq!(prefs.get::<String>("get_name").unwrap().as_deref(), Some("ada"));
        provider.sync();
    }
    let (_provider, prefs) = open(&dir);
    assert_eq!(prefs.get::<String>("get_name").unwrap().as_deref(), Some("ada"));
}

#[test]
fn removals_are_persisted() {
    let dir = TempDir::new().unwrap();
    {
        let (provider, prefs) = open(&dir);
        prefs.set("save_count", 1i32).unwrap();
        prefs.remove("remove_count").unwrap();
        provider.sync();
    }
    let (_provider, prefs) = open(&dir);
    assert_eq!(prefs.get::<i32>("get_count").unwrap(), Some(0));
    assert!(!prefs.store().contains("count"));
}

struct Seed;

impl VersionHandler for Seed {
    fn on_upgrade(&self, _: &dyn KvStore, txn: &mut dyn Transaction, _: i32, new: i32) -> PrefResult<()> {
        txn.put("count", StoredValue::Int(new * 10));
        Ok(())
    }
}

#[test]
fn versions_survive_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let provider = Arc::new(DirectoryProvider::new("app", dir.path()).unwrap());
        let prefs = PrefBoxBuilder::new(provider.clone(), contract())
            .version(2)
            .handler(Arc::new(Seed))
            .build()
            .unwrap();
        assert_eq!(prefs.get::<i32>("get_count").unwrap(), Some(20));
    }
    assert!(dir.path().join("prefbox.versions.json").exists());

    let provider = Arc::new(DirectoryProvider::new("app", dir.path()).unwrap());
    let versions = prefbox::StoreProvider::version_store(provider.as_ref()).unwrap();
    let prefs = PrefBoxBuilder::new(provider.clone(), contract())
        .version(2)
        .handler(Arc::new(Seed))
        .build()
        .unwrap();
    assert_eq!(persisted_version(versions.as_ref(), prefs.identity()).unwrap(), Some(2));

    let err = PrefBoxBuilder::new(provider, contract()).version(1).build().unwrap_err();
    assert!(matches!(err, PrefError::DowngradeNotSupported { old: 2, new: 1 }));
}

#[test]
fn config_file_selects_the_store() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join(CONFIG_FILE_NAME);
    std::fs::write(
        &config_path,
        "binding = \"named\"\nname = \"audio\"\nsave_policy = \"commit\"\n",
    )
    .unwrap();
    let config = PrefBoxConfig::from_file(&config_path).unwrap();

    let provider = Arc::new(DirectoryProvider::new("app", dir.path()).unwrap());
    let prefs = PrefBoxBuilder::new(provider, contract())
        .with_config(&config)
        .unwrap()
        .build()
        .unwrap();
    prefs.set("set_count", 3i32).unwrap();

    // commit policy wrote the file synchronously
    let written = std::fs::read_to_string(dir.path().join("audio.json")).unwrap();
    assert!(written.contains("count"));
}

#[test]
fn store_names_must_be_file_names() {
    let dir = TempDir::new().unwrap();
    let provider = Arc::new(DirectoryProvider::new("app", dir.path()).unwrap());
    let err = PrefBoxBuilder::new(provider, contract())
        .binding(Binding::Named("../escape".into()))
        .build()
        .unwrap_err();
    assert!(matches!(err, PrefError::InvalidArgument(_)));
}

#[test]
fn version_store_name_is_reserved() {
    let dir = TempDir::new().unwrap();
    let provider = Arc::new(DirectoryProvider::new("app", dir.path()).unwrap());
    for binding in [
        Binding::Named(VERSION_STORE_NAME.into()),
        Binding::Scoped(VERSION_STORE_NAME.into()),
    ] {
        let err = PrefBoxBuilder::new(provider.clone(), contract())
            .binding(binding)
            .version(1)
            .build()
            .unwrap_err();
        assert!(matches!(err, PrefError::InvalidArgument(_)));
    }
    assert!(provider.versions().all().is_empty());
}

#[test]
fn version_records_stay_out_of_domain_data() {
    let dir = TempDir::new().unwrap();
    let provider = Arc::new(DirectoryProvider::new("app", dir.path()).unwrap());
    let prefs = PrefBoxBuilder::new(provider.clone(), contract())
        .binding(Binding::Named("audio".into()))
        .version(1)
        .build()
        .unwrap();
    prefs.set("set_count", 7i32).unwrap();
    provider.sync();

    let data = prefs.store().all();
    assert_eq!(data.len(), 1);
    assert_eq!(data.get("count"), Some(&StoredValue::Int(7)));

    let versions = provider.versions();
    assert_eq!(versions.get_raw("audio"), Some(StoredValue::Int(1)));
    assert!(!versions.contains("count"));
}

#[test]
fn raw_reads_go_through_the_file_store() {
    let dir = TempDir::new().unwrap();
    let provider = Arc::new(DirectoryProvider::new("app", dir.path()).unwrap());
    let spec = contract_of(
        "OnDiskRaw",
        [
            OperationSpec::getter("count", "count", ValueType::int()),
            OperationSpec::new("get_raw").param(ValueType::of::<String>()),
        ],
    );
    let prefs = PrefBoxBuilder::new(provider, spec).build().unwrap();

    let mut txn = prefs.store().open_transaction();
    txn.put("count", StoredValue::Int(5));
    assert!(txn.commit_sync());

    assert_eq!(
        prefs.forward("get_raw", &[StoredValue::from("count")]).unwrap(),
        Forwarded::Value(Some(StoredValue::Int(5)))
    );
    assert_eq!(
        prefs.forward("get_raw", &[StoredValue::from("missing")]).unwrap(),
        Forwarded::Value(None)
    );
}
