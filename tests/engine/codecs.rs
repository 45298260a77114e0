//! Codec resolution and the non-primitive codecs

use crate::common::*;
use chrono::{DateTime, TimeZone, Utc};
use prefbox::{shared, CodecRegistry, JsonCodec, StringCodec, Uri};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
enum Theme {
    Light,
    Dark,
    #[serde(rename = "system")]
    FollowSystem,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Window {
    width: u32,
    height: u32,
}

#[test]
fn dates_are_epoch_millis_and_empty_means_none() {
    let t = TestPrefs::new(contract_of("Dates", key_ops("seen", "last_seen", ValueType::of::<DateTime<Utc>>())));
    assert_eq!(t.prefs.get::<DateTime<Utc>>("get_seen").unwrap(), None);

    let when = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
    t.prefs.set("set_seen", when).unwrap();
    assert_eq!(t.store().raw("last_seen"), Some(StoredValue::Long(when.timestamp_millis())));
    assert_eq!(t.prefs.get::<DateTime<Utc>>("get_seen").unwrap(), Some(when));
}

#[test]
fn enums_are_stored_by_name() {
    let t = TestPrefs::new(contract_of("Themes", key_ops("theme", "theme", ValueType::enumeration::<Theme>())));
    assert_eq!(t.prefs.get::<Theme>("get_theme").unwrap(), None);

    t.prefs.set("set_theme", Theme::Dark).unwrap();
    assert_eq!(t.store().raw("theme"), Some(StoredValue::from("Dark")));
    t.prefs.set("set_theme", Theme::FollowSystem).unwrap();
    assert_eq!(t.store().raw("theme"), Some(StoredValue::from("system")));
    assert_eq!(t.prefs.get::<Theme>("get_theme").unwrap(), Some(Theme::FollowSystem));
}

#[test]
fn unknown_enum_names_fail_to_decode() {
    let t = TestPrefs::new(contract_of("Themes", key_ops("theme", "theme", ValueType::enumeration::<Theme>())));
    let mut txn = t.store().open_transaction();
    txn.put("theme", StoredValue::from("Sepia"));
    assert!(txn.commit_sync());
    let err = t.prefs.get::<Theme>("get_theme").unwrap_err();
    assert!(matches!(err, PrefError::UnknownVariant { ref name, .. } if name == "Sepia"));
}

#[test]
fn doubles_keep_full_precision() {
    let t = TestPrefs::new(contract_of("Doubles", key_ops("pi", "pi", ValueType::double())));
    assert_eq!(t.prefs.get::<f64>("get_pi").unwrap(), Some(0.0));
    t.prefs.set("set_pi", std::f64::consts::PI).unwrap();
    assert_eq!(t.prefs.get::<f64>("get_pi").unwrap(), Some(std::f64::consts::PI));
    assert_eq!(t.store().raw("pi").unwrap().kind(), StorageKind::Long);
}

#[test]
fn uris_are_strings() {
    let t = TestPrefs::new(contract_of("Links", key_ops("home", "home", ValueType::of::<Uri>())));
    t.prefs.set("set_home", Uri::parse("https://example.org/start")).unwrap();
    let home = t.prefs.get::<Uri>("get_home").unwrap().unwrap();
    assert_eq!(home.scheme(), Some("https"));
}

#[test]
fn types_without_codec_fail_the_build() {
    let provider = Arc::new(MemoryProvider::new("test"));
    let err = PrefBoxBuilder::new(
        provider,
        contract_of("Windows", key_ops("window", "window", ValueType::of::<Window>())),
    )
    .build()
    .unwrap_err();
    assert!(matches!(err, PrefError::NoCodecFound { .. }));
}

#[test]
fn json_codec_for_a_type() {
    let t = TestPrefs::with(
        contract_of("Windows", key_ops("window", "window", ValueType::of::<Window>())),
        |b| b.codec_for_type(JsonCodec::<Window>::new()),
    );
    let window = Window { width: 800, height: 600 };
    t.prefs.set("set_window", window.clone()).unwrap();
    assert_eq!(t.prefs.get::<Window>("get_window").unwrap(), Some(window));
    let raw = t.store().raw("window").unwrap();
    assert!(raw.as_str().unwrap().contains("\"width\":800"));
}

/// Upper-cases on the way in
struct Shouting;

impl prefbox::Codec for Shouting {
    type Value = String;

    fn storage_kind(&self) -> StorageKind {
        StorageKind::String
    }

    fn zero_value(&self) -> Option<StoredValue> {
        Some(StoredValue::from(""))
    }

    fn encode(&self, value: &String) -> prefbox::PrefResult<StoredValue> {
        Ok(StoredValue::String(value.to_uppercase()))
    }

    fn decode(&self, stored: StoredValue) -> prefbox::PrefResult<Option<String>> {
        Ok(stored.as_str().map(str::to_string))
    }
}

/// Prefixes on the way in
struct Tagged;

impl prefbox::Codec for Tagged {
    type Value = String;

    fn storage_kind(&self) -> StorageKind {
        StorageKind::String
    }

    fn zero_value(&self) -> Option<StoredValue> {
        Some(StoredValue::from(""))
    }

    fn encode(&self, value: &String) -> prefbox::PrefResult<StoredValue> {
        Ok(StoredValue::String(format!("tag:{value}")))
    }

    fn decode(&self, stored: StoredValue) -> prefbox::PrefResult<Option<String>> {
        Ok(stored.as_str().map(str::to_string))
    }
}

#[test]
fn codec_precedence_is_operation_key_type_registry() {
    let contract = contract_of(
        "Layers",
        [
            OperationSpec::setter("plain", "plain", ValueType::of::<String>()),
            OperationSpec::setter("by_type", "typed", ValueType::of::<String>()),
            OperationSpec::setter("by_key", "keyed", ValueType::of::<String>()),
            OperationSpec::setter("by_op", "keyed", ValueType::of::<String>()).codec(StringCodec),
            OperationSpec::setter("by_symbol", "user.name", ValueType::of::<String>()),
        ],
    );
    let t = TestPrefs::with(contract, |b| {
        b.codec_for_key("keyed", Tagged)
            .codec_for_key_resource("key_name", Tagged)
            .codec_for_type(Shouting)
    });
    let value = || "hi".to_string();
    t.prefs.set("by_type", value()).unwrap();
    t.prefs.set("by_key", value()).unwrap();
    t.prefs.set("by_symbol", value()).unwrap();
    assert_eq!(t.store().raw("typed"), Some(StoredValue::from("HI")));
    assert_eq!(t.store().raw("keyed"), Some(StoredValue::from("tag:hi")));
    assert_eq!(t.store().raw("user.name"), Some(StoredValue::from("tag:hi")));

    t.prefs.set("by_op", value()).unwrap();
    assert_eq!(t.store().raw("keyed"), Some(StoredValue::from("hi")));

    // the operation override applied after the fact wins as well
    let t = TestPrefs::with(
        contract_of("One", [OperationSpec::setter("plain", "plain", ValueType::of::<String>())]),
        |b| b.codec_for_type(Shouting).codec_for_operation("plain", shared(Tagged)),
    );
    t.prefs.set("plain", value()).unwrap();
    assert_eq!(t.store().raw("plain"), Some(StoredValue::from("tag:hi")));
}

#[test]
fn codec_override_must_match_the_value_type() {
    let provider = Arc::new(MemoryProvider::new("test"));
    let err = PrefBoxBuilder::new(
        provider,
        contract_of(
            "Mismatch",
            [OperationSpec::setter("set", "k", ValueType::int()).codec(StringCodec)],
        ),
    )
    .build()
    .unwrap_err();
    assert!(matches!(err, PrefError::UnsupportedOperation { .. }));
}

#[test]
fn private_registries_are_isolated() {
    let registry = Arc::new(CodecRegistry::with_builtins());
    registry.register(JsonCodec::<Window>::new());
    let t = TestPrefs::with(
        contract_of("Windows", key_ops("window", "window", ValueType::of::<Window>())),
        |b| b.registry(registry.clone()),
    );
    t.prefs.set("set_window", Window { width: 1, height: 2 }).unwrap();
    assert!(!CodecRegistry::global().contains(&ValueType::of::<Window>()));
}

#[test]
fn stored_kind_mismatch_is_reported() {
    let t = TestPrefs::new(contract_of(
        "Kinds",
        [
            OperationSpec::getter("as_int", "k", ValueType::int()),
            OperationSpec::setter("set_text", "k", ValueType::of::<String>()),
        ],
    ));
    t.prefs.set("set_text", "seven".to_string()).unwrap();
    let err = t.prefs.get::<i32>("as_int").unwrap_err();
    assert!(matches!(err, PrefError::KindMismatch { .. }));
}
