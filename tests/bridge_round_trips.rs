use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use assoc_bridge::{
    coerce, from_json, impl_coerce_record, to_json, AssocList, Bridgeable, CollectingSink,
    DescriptorBuilder, ErrorKind, ListOptions, Value,
};
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq)]
struct Sample {
    x: i32,
    y: String,
}

impl Bridgeable for Sample {
    fn describe(members: &mut DescriptorBuilder<Self>) {
        members
            .property("x", |s: &Sample| s.x, |s: &mut Sample, x: i32| s.x = x)
            .property("y", |s: &Sample| s.y.clone(), |s: &mut Sample, y: String| s.y = y);
    }
}

impl_coerce_record!(Sample);

static LIMIT: AtomicI64 = AtomicI64::new(10);
static LABEL: Mutex<String> = Mutex::new(String::new());
static TOKEN: Mutex<String> = Mutex::new(String::new());

struct Limits;

impl Bridgeable for Limits {
    fn describe(members: &mut DescriptorBuilder<Self>) {
        members
            .static_field(
                "limit",
                || LIMIT.load(Ordering::SeqCst),
                |v: i64| LIMIT.store(v, Ordering::SeqCst),
            )
            .static_field(
                "label",
                || LABEL.lock().map(|l| l.clone()).unwrap_or_default(),
                |v: String| {
                    if let Ok(mut l) = LABEL.lock() {
                        *l = v;
                    }
                },
            )
            .static_readonly("version", || 2u8)
            .static_field(
                "token",
                || TOKEN.lock().map(|t| t.clone()).unwrap_or_default(),
                |v: String| {
                    if let Ok(mut t) = TOKEN.lock() {
                        *t = v;
                    }
                },
            )
            .ignore();
    }
}

#[test]
fn test_json_round_trip_deep_nesting() {
    let doc = json!({
        "level1": {
            "level2": {
                "level3": { "level4": [1, 2.5, "x", null, true, { "leaf": "y" }] }
            },
            "sibling": false
        },
        "after": "tail",
        "numbers": [-1, 18446744073709551615u64]
    });
    let text = doc.to_string();

    let mut list = AssocList::new();
    from_json(&text, &mut list).unwrap();
    let emitted = to_json(&list).unwrap();
    assert_eq!(emitted, text);

    let mut again = AssocList::new();
    from_json(&emitted, &mut again).unwrap();
    assert_eq!(again, list);
    assert_eq!(again.keys().collect::<Vec<_>>(), ["level1", "after", "numbers"]);

    let level3 = list["level1"].as_list().unwrap()["level2"].as_list().unwrap()["level3"]
        .as_list()
        .unwrap();
    let leaf = &level3["level4"].as_array().unwrap()[5];
    assert_eq!(leaf.as_list().unwrap()["leaf"], Value::from("y"));
}

#[test]
fn test_reflection_round_trip() {
    let existing = Sample { x: 7, y: "seven".into() };
    let list = AssocList::from_object(&existing).unwrap();
    let mut fresh = Sample::default();
    list.to_object(&mut fresh, false).unwrap();
    assert_eq!(fresh, existing);
}

#[test]
fn test_reflection_through_json() {
    let existing = Sample { x: -3, y: "neg".into() };
    let text = AssocList::from_object(&existing).unwrap().to_json().unwrap();
    assert_eq!(text, r#"{"x":-3,"y":"neg"}"#);
    let list = AssocList::from_json_str(&text, ListOptions::default()).unwrap();
    let back: Sample = assoc_bridge::to_new_object(&list, false).unwrap();
    assert_eq!(back, existing);
}

#[test]
fn test_coercion_properties() {
    assert_eq!(coerce::<Option<i32>>(&Value::Null, false).unwrap(), None);

    let text = "3fa85f64-5717-4562-b3fc-2c963f66afa6";
    assert_eq!(
        coerce::<Uuid>(&Value::from(text), false).unwrap(),
        Uuid::parse_str(text).unwrap()
    );

    assert_eq!(coerce::<i32>(&Value::from(42), false).unwrap(), 42);

    let err = coerce::<i32>(&Value::from("x"), false).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::TypeConversion { .. }));
}

#[test]
fn test_nested_lists_coerce_into_records() {
    let nested = AssocList::from_json_str(r#"{"x":"5","y":"five"}"#, ListOptions::default()).unwrap();
    let sample = coerce::<Sample>(&Value::from(nested), false).unwrap();
    assert_eq!(sample, Sample { x: 5, y: "five".into() });

    let raw = Value::Json(json!({"x": 1}));
    assert!(coerce::<Sample>(&raw, false).is_err());
    assert_eq!(coerce::<Sample>(&raw, true).unwrap(), Sample { x: 1, y: String::new() });
}

#[test]
fn test_missing_member_policy() {
    let partial = AssocList::from_pairs(ListOptions::default(), [("y", "only y")]).unwrap();
    let mut target = Sample { x: 99, y: String::new() };

    let err = partial.to_object(&mut target, false).unwrap_err();
    assert!(matches!(
        err.kind(),
        ErrorKind::MissingProperty { property, .. } if property == "x"
    ));

    partial.to_object(&mut target, true).unwrap();
    assert_eq!(target, Sample { x: 99, y: "only y".into() });
}

#[test]
fn test_static_fields_round_trip() {
    let saved = AssocList::from_static_fields::<Limits>().unwrap();
    assert_eq!(saved.keys().collect::<Vec<_>>(), ["limit", "label", "version"]);

    let update = AssocList::from_json_str(
        r#"{"limit":"25","label":"beta","version":9}"#,
        ListOptions::default(),
    )
    .unwrap();
    update.to_static_fields::<Limits>(false).unwrap();
    assert_eq!(LIMIT.load(Ordering::SeqCst), 25);
    assert_eq!(LABEL.lock().unwrap().as_str(), "beta");

    *TOKEN.lock().unwrap() = "kept".into();
    let with_token = AssocList::from_json_str(
        r#"{"limit":5,"label":"gamma","token":"leaked"}"#,
        ListOptions::default(),
    )
    .unwrap();
    with_token.to_static_fields::<Limits>(false).unwrap();
    assert_eq!(TOKEN.lock().unwrap().as_str(), "kept");
    assert!(!AssocList::from_static_fields::<Limits>().unwrap().contains_key("token"));

    let current = AssocList::from_static_fields::<Limits>().unwrap();
    assert_eq!(current["version"], Value::from(2u8));

    let missing = AssocList::from_pairs(ListOptions::default(), [("limit", 1)]).unwrap();
    let err = missing.to_static_fields::<Limits>(false).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::MissingProperty { property, .. } if property == "label"));
}

#[test]
fn test_null_into_records() {
    let err = coerce::<Sample>(&Value::Null, false).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::TypeConversion { .. }));
    assert_eq!(coerce::<Option<Sample>>(&Value::Null, false).unwrap(), None);
    assert_eq!(coerce::<Option<Sample>>(&Value::Json(json!(null)), false).unwrap(), None);
}

#[test]
fn test_bridge_failures_reach_the_sink() {
    let sink = Arc::new(CollectingSink::new());
    let list = AssocList::from_pairs(ListOptions::default(), [("x", "nope"), ("y", "y")])
        .unwrap()
        .with_diagnostics(sink.clone());

    let mut target = Sample::default();
    assert!(list.to_object(&mut target, false).is_err());

    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].error_class_name, "TypeConversionError");
    assert_eq!(records[0].tag, "coerce");
}
