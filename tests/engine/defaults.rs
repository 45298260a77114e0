//! Fallback resolution of gets: call-time, static, then default mode

use crate::common::*;

fn string_ops() -> Vec<OperationSpec> {
    vec![
        OperationSpec::getter("name", "name", ValueType::of::<String>()),
        OperationSpec::getter("name_null", "name", ValueType::of::<String>()).default_mode(DefaultMode::Null),
        OperationSpec::getter("name_or", "name", ValueType::of::<String>()).param(ValueType::of::<String>()),
        OperationSpec::getter("name_guest", "name", ValueType::of::<String>()).default_value("anonymous"),
        OperationSpec::getter("name_resource", "name", ValueType::of::<String>()).default_resource("default_name"),
        OperationSpec::setter("set_name", "name", ValueType::of::<String>()),
    ]
}

#[test]
fn empty_mode_falls_back_to_zero() {
    let t = TestPrefs::new(contract_of(
        "Zeroes",
        [
            OperationSpec::getter("count", "count", ValueType::int()),
            OperationSpec::getter("flag", "flag", ValueType::bool()),
            OperationSpec::getter("big", "big", ValueType::long()),
            OperationSpec::getter("tags", "tags", ValueType::of::<std::collections::BTreeSet<String>>()),
        ],
    ));
    assert_eq!(t.prefs.get::<i32>("count").unwrap(), Some(0));
    assert_eq!(t.prefs.get::<bool>("flag").unwrap(), Some(false));
    assert_eq!(t.prefs.get::<i64>("big").unwrap(), Some(0));
    assert_eq!(
        t.prefs.get::<std::collections::BTreeSet<String>>("tags").unwrap(),
        Some(Default::default())
    );
}

#[test]
fn null_mode_yields_nothing_for_nullable_types() {
    let t = TestPrefs::new(contract_of("Names", string_ops()));
    assert_eq!(t.prefs.get::<String>("name").unwrap(), Some(String::new()));
    assert_eq!(t.prefs.get::<String>("name_null").unwrap(), None);
}

#[test]
fn null_mode_is_ignored_for_primitives() {
    let contract = contract_of(
        "Primitive",
        [
            OperationSpec::getter("count", "count", ValueType::int()),
            OperationSpec::getter("boxed", "count", ValueType::int().boxed()),
        ],
    )
    .default_mode(DefaultMode::Null);
    let t = TestPrefs::new(contract);
    assert_eq!(t.prefs.get::<i32>("count").unwrap(), Some(0));
    assert_eq!(t.prefs.get::<i32>("boxed").unwrap(), None);
}

#[test]
fn builder_default_mode_overrides_contract() {
    let t = TestPrefs::with(contract_of("Names", string_ops()), |b| b.default_mode(DefaultMode::Null));
    assert_eq!(t.prefs.get::<String>("name").unwrap(), None);
}

#[test]
fn static_defaults_apply_only_when_absent() {
    let t = TestPrefs::new(contract_of("Names", string_ops()));
    assert_eq!(t.prefs.get::<String>("name_guest").unwrap().as_deref(), Some("anonymous"));
    assert_eq!(t.prefs.get::<String>("name_resource").unwrap().as_deref(), Some("guest"));

    t.prefs.set("set_name", "ada".to_string()).unwrap();
    assert_eq!(t.prefs.get::<String>("name_guest").unwrap().as_deref(), Some("ada"));
    assert_eq!(t.prefs.get::<String>("name_resource").unwrap().as_deref(), Some("ada"));
}

#[test]
fn call_time_default_wins_over_static() {
    let t = TestPrefs::new(contract_of(
        "Names",
        [OperationSpec::getter("name", "name", ValueType::of::<String>())
            .param(ValueType::of::<String>())
            .default_value("static")],
    ));
    assert_eq!(
        t.prefs.get_or("name", "call".to_string()).unwrap().as_deref(),
        Some("call")
    );
    // without an argument the static default still applies
    assert_eq!(t.prefs.get::<String>("name").unwrap().as_deref(), Some("static"));
}

#[test]
fn call_time_default_is_checked_even_when_stored() {
    let t = TestPrefs::new(contract_of("Names", string_ops()));
    t.prefs.set("set_name", "ada".to_string()).unwrap();
    assert_eq!(
        t.prefs.get_or("name_or", "bob".to_string()).unwrap().as_deref(),
        Some("ada")
    );
    let err = t.prefs.get_or("name_or", 7i32).unwrap_err();
    assert!(matches!(err, PrefError::DefaultTypeMismatch { .. }));
}

#[test]
fn get_or_requires_a_declared_parameter() {
    let t = TestPrefs::new(contract_of("Names", string_ops()));
    let err = t.prefs.get_or("name", "x".to_string()).unwrap_err();
    assert!(matches!(err, PrefError::UnsupportedOperation { .. }));
}

#[test]
fn resource_defaults_parse_by_storage_kind() {
    let t = TestPrefs::new(contract_of(
        "Resources",
        [
            OperationSpec::getter("ratio", "ratio", ValueType::float()).default_resource("default_ratio"),
            OperationSpec::getter("flag", "flag", ValueType::bool()).default_resource("default_flag"),
            OperationSpec::getter("count", "count", ValueType::int()).default_resource("default_int"),
        ],
    ));
    assert_eq!(t.prefs.get::<f32>("ratio").unwrap(), Some(0.5));
    assert_eq!(t.prefs.get::<bool>("flag").unwrap(), Some(true));
    assert_eq!(t.prefs.get::<i32>("count").unwrap(), Some(1));
}

fn build_error(op: OperationSpec) -> PrefError {
    let provider = std::sync::Arc::new(MemoryProvider::with_resources("test", resources()));
    PrefBoxBuilder::new(provider, contract_of("Broken", [op]))
        .build()
        .unwrap_err()
}

#[test]
fn mismatched_static_defaults_fail_the_build() {
    let err = build_error(OperationSpec::getter("count", "count", ValueType::int()).default_value("one"));
    assert!(matches!(err, PrefError::DefaultTypeMismatch { .. }));

    let err = build_error(OperationSpec::getter("count", "count", ValueType::int()).default_resource("key_name"));
    assert!(matches!(err, PrefError::DefaultTypeMismatch { .. }));

    let err = build_error(
        OperationSpec::getter("count", "count", ValueType::int()).param(ValueType::of::<String>()),
    );
    assert!(matches!(err, PrefError::DefaultTypeMismatch { .. }));
}

#[test]
fn missing_resources_fail_the_build() {
    let err = build_error(OperationSpec::getter("count", "count", ValueType::int()).default_resource("nope"));
    assert!(matches!(err, PrefError::ResourceNotFound(ref id) if id == "nope"));

    let err = build_error(OperationSpec::new("count").key_resource("nope").returns(Returns::Value(ValueType::int())));
    assert!(matches!(err, PrefError::ResourceNotFound(_)));
}
