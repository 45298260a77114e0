//! Weak change listeners

use crate::common::*;
use parking_lot::Mutex;
use std::sync::Arc;

fn contract() -> ContractSpec {
    contract_of(
        "Watched",
        key_ops("count", "count", ValueType::int())
            .into_iter()
            .chain(key_ops("name", "name", ValueType::of::<String>()))
            .chain(key_ops("double", "double", ValueType::int())),
    )
}

#[test]
fn delivers_to_every_listener_of_the_key() {
    let t = TestPrefs::new(contract());
    let first = Recorder::<i32>::new();
    let second = Recorder::<i32>::new();
    let names = Recorder::<String>::new();
    t.prefs.register_all::<i32, _>("on_count", &[first.clone(), second.clone()]).unwrap();
    t.prefs.register::<String, _>("on_name", &names).unwrap();

    t.prefs.set("set_count", 7i32).unwrap();
    assert_eq!(first.values(), vec![Some(7)]);
    assert_eq!(second.values(), vec![Some(7)]);
    assert_eq!(names.count(), 0);
}

#[test]
fn unchanged_values_do_not_notify() {
    let t = TestPrefs::new(contract());
    let listener = Recorder::<i32>::new();
    t.prefs.register::<i32, _>("on_count", &listener).unwrap();
    t.prefs.set("set_count", 1i32).unwrap();
    t.prefs.set("set_count", 1i32).unwrap();
    assert_eq!(listener.count(), 1);
}

#[test]
fn removal_delivers_the_absent_value() {
    let t = TestPrefs::new(contract());
    let count = Recorder::<i32>::new();
    let name = Recorder::<String>::new();
    t.prefs.register::<i32, _>("on_count", &count).unwrap();
    t.prefs.register::<String, _>("on_name", &name).unwrap();

    t.prefs.set("set_count", 3i32).unwrap();
    t.prefs.set("set_name", "ada".to_string()).unwrap();
    t.prefs.remove("remove_count").unwrap();
    t.prefs.remove("remove_name").unwrap();

    assert_eq!(count.values(), vec![Some(3), Some(0)]);
    assert_eq!(name.values(), vec![Some("ada".to_string()), None]);
}

#[test]
fn double_registration_delivers_once() {
    let t = TestPrefs::new(contract());
    let listener = Recorder::<i32>::new();
    t.prefs.register::<i32, _>("on_count", &listener).unwrap();
    t.prefs.register::<i32, _>("on_count", &listener).unwrap();
    t.prefs.set("set_count", 2i32).unwrap();
    assert_eq!(listener.count(), 1);

    // unregistering twice, or something never registered, is harmless
    let stranger = Recorder::<i32>::new();
    t.prefs.unregister::<i32, _>("off_count", &stranger).unwrap();
    t.prefs.unregister::<i32, _>("off_count", &listener).unwrap();
    t.prefs.unregister::<i32, _>("off_count", &listener).unwrap();
    t.prefs.set("set_count", 3i32).unwrap();
    assert_eq!(listener.count(), 1);
}

#[test]
fn dropped_listeners_are_not_kept_alive() {
    let t = TestPrefs::new(contract());
    let hits = Arc::new(Mutex::new(0));
    let sink = Arc::clone(&hits);
    let listener = Arc::new(move |_: Option<i32>| *sink.lock() += 1);
    let weak = Arc::downgrade(&listener);
    t.prefs.register::<i32, _>("on_count", &listener).unwrap();

    t.prefs.set("set_count", 1i32).unwrap();
    assert_eq!(*hits.lock(), 1);

    drop(listener);
    assert!(weak.upgrade().is_none());
    t.prefs.set("set_count", 2i32).unwrap();
    t.prefs.set("set_count", 3i32).unwrap();
    assert_eq!(*hits.lock(), 1);
}

#[test]
fn listeners_may_write_back() {
    let t = TestPrefs::new(contract());
    let writer = t.prefs.clone();
    let doubler = Arc::new(move |value: Option<i32>| {
        if let Some(v) = value {
            writer.set("set_double", v * 2).unwrap();
        }
    });
    let doubled = Recorder::<i32>::new();
    t.prefs.register::<i32, _>("on_count", &doubler).unwrap();
    t.prefs.register::<i32, _>("on_double", &doubled).unwrap();

    t.prefs.set("set_count", 21i32).unwrap();
    assert_eq!(t.prefs.get::<i32>("get_double").unwrap(), Some(42));
    assert_eq!(doubled.values(), vec![Some(42)]);
}

#[test]
fn listeners_see_writes_from_other_instances() {
    let t = TestPrefs::new(contract());
    let other = t.rebuild(contract());
    let listener = Recorder::<i32>::new();
    t.prefs.register::<i32, _>("on_count", &listener).unwrap();

    other.set("set_count", 8i32).unwrap();
    assert_eq!(listener.values(), vec![Some(8)]);

    // a dropped instance stops delivering
    drop(t);
    other.set("set_count", 9i32).unwrap();
    assert_eq!(listener.values(), vec![Some(8)]);
}

#[test]
fn listener_type_must_match() {
    let t = TestPrefs::new(contract());
    let wrong = Recorder::<String>::new();
    let err = t.prefs.register::<String, _>("on_count", &wrong).unwrap_err();
    assert!(matches!(err, PrefError::UnsupportedOperation { .. }));
    let err = t.prefs.register::<String, _>("get_name", &wrong).unwrap_err();
    assert!(matches!(err, PrefError::UnsupportedOperation { .. }));
}

#[test]
fn listener_operations_need_a_key_and_return_nothing() {
    let provider = Arc::new(MemoryProvider::new("test"));
    let keyless = OperationSpec::new("on_x").marker(Marker::RegisterListener).param(ValueType::int());
    let returning = OperationSpec::new("on_x")
        .key("x")
        .marker(Marker::RegisterListener)
        .param(ValueType::int())
        .returns(Returns::Contract);
    for op in [keyless, returning] {
        let err = PrefBoxBuilder::new(provider.clone(), contract_of("Bad", [op]))
            .build()
            .unwrap_err();
        assert!(matches!(err, PrefError::UnsupportedOperation { .. }));
    }
}
