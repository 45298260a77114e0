//! Operations forwarded to the store or its pending transaction

use crate::common::*;

fn contract() -> ContractSpec {
    contract_of(
        "Raw",
        [
            OperationSpec::getter("count", "count", ValueType::int()),
            OperationSpec::new("contains").param(ValueType::of::<String>()),
            OperationSpec::new("get_all"),
            OperationSpec::new("get_raw").param(ValueType::of::<String>()),
            OperationSpec::new("put")
                .param(ValueType::of::<String>())
                .param(ValueType::of::<StoredValue>()),
            OperationSpec::new("remove").param(ValueType::of::<String>()),
            OperationSpec::new("clear"),
            OperationSpec::new("apply"),
            OperationSpec::new("commit"),
        ],
    )
}

fn key(k: &str) -> StoredValue {
    StoredValue::from(k)
}

#[test]
fn staged_edits_flush_on_commit() {
    let t = TestPrefs::new(contract());
    let prefs = &t.prefs;

    prefs.forward("put", &[key("count"), StoredValue::Int(4)]).unwrap();
    prefs.forward("put", &[key("other"), key("x")]).unwrap();
    assert_eq!(prefs.forward("contains", &[key("count")]).unwrap(), Forwarded::Bool(false));

    assert_eq!(prefs.forward("commit", &[]).unwrap(), Forwarded::Bool(true));
    assert_eq!(prefs.forward("contains", &[key("count")]).unwrap(), Forwarded::Bool(true));
    assert_eq!(prefs.get::<i32>("count").unwrap(), Some(4));
    assert_eq!(
        prefs.forward("get_raw", &[key("other")]).unwrap(),
        Forwarded::Value(Some(key("x")))
    );

    let Forwarded::Entries(all) = prefs.forward("get_all", &[]).unwrap() else {
        panic!("get_all returns entries");
    };
    assert_eq!(all.len(), 2);
}

#[test]
fn clear_and_remove_through_apply() {
    let t = TestPrefs::new(contract());
    let prefs = &t.prefs;
    prefs.forward("put", &[key("a"), StoredValue::Int(1)]).unwrap();
    prefs.forward("put", &[key("b"), StoredValue::Int(2)]).unwrap();
    prefs.forward("apply", &[]).unwrap();

    prefs.forward("remove", &[key("a")]).unwrap();
    prefs.forward("apply", &[]).unwrap();
    assert_eq!(t.store().len(), 1);

    prefs.forward("clear", &[]).unwrap();
    prefs.forward("apply", &[]).unwrap();
    assert!(t.store().is_empty());
    assert_eq!(prefs.forward("get_raw", &[key("b")]).unwrap(), Forwarded::Value(None));
}

#[test]
fn wrong_arguments_are_rejected() {
    let t = TestPrefs::new(contract());
    let err = t.prefs.forward("contains", &[]).unwrap_err();
    assert!(matches!(err, PrefError::UnsupportedOperation { .. }));
    let err = t.prefs.forward("put", &[StoredValue::Int(1), StoredValue::Int(2)]).unwrap_err();
    assert!(matches!(err, PrefError::UnsupportedOperation { .. }));
    assert!(t.prefs.forward("count", &[]).is_err());
}

#[test]
fn unknown_or_misdeclared_methods_fail_the_build() {
    let provider = std::sync::Arc::new(MemoryProvider::new("test"));
    let unknown = OperationSpec::new("frobnicate");
    let wrong_params = OperationSpec::new("contains");
    for op in [unknown, wrong_params] {
        let err = PrefBoxBuilder::new(provider.clone(), contract_of("Bad", [op]))
            .build()
            .unwrap_err();
        assert!(matches!(err, PrefError::UnsupportedOperation { .. }));
    }
}
