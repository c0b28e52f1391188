//! Exercises the bridges end to end on realistic payloads and reports each
//! scenario as passed or failed.
use std::sync::RwLock;

use anyhow::{ensure, Result};
use assoc_bridge::{
    impl_coerce_record, AssocList, Bridgeable, DescriptorBuilder, ListOptions, Value,
};
use once_cell::sync::Lazy;
use uuid::Uuid;

// ————————————————————————————————————————————————————————————————————————————
// FIXTURES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone)]
struct Settings {
    endpoint: String,
    retries: u32,
    client_id: Option<Uuid>,
    secret: String,
}

static SETTINGS: Lazy<RwLock<Settings>> = Lazy::new(|| {
    RwLock::new(Settings {
        endpoint: "https://example.com/api".into(),
        retries: 3,
        client_id: None,
        secret: "do-not-persist".into(),
    })
});

/// Process-wide configuration exposed as static fields.
struct AppConfig;

fn read<T>(f: impl Fn(&Settings) -> T) -> T {
    f(&SETTINGS.read().unwrap_or_else(|p| p.into_inner()))
}

fn write(f: impl Fn(&mut Settings)) {
    f(&mut SETTINGS.write().unwrap_or_else(|p| p.into_inner()))
}

impl Bridgeable for AppConfig {
    fn describe(members: &mut DescriptorBuilder<Self>) {
        members
            .static_field(
                "endpoint",
                || read(|s| s.endpoint.clone()),
                |v: String| write(|s| s.endpoint = v.clone()),
            )
            .static_field(
                "retries",
                || read(|s| s.retries),
                |v: u32| write(|s| s.retries = v),
            )
            .static_field(
                "client_id",
                || read(|s| s.client_id),
                |v: Option<Uuid>| write(|s| s.client_id = v),
            )
            .static_field(
                "secret",
                || read(|s| s.secret.clone()),
                |v: String| write(|s| s.secret = v.clone()),
            )
            .ignore();
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Place {
    id: String,
    name: Option<String>,
    rating: Option<f64>,
    tags: Vec<String>,
    location: Option<Coordinates>,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Coordinates {
    lat: f64,
    lng: f64,
}

impl Bridgeable for Coordinates {
    fn describe(members: &mut DescriptorBuilder<Self>) {
        members
            .property("lat", |c: &Coordinates| c.lat, |c: &mut Coordinates, v: f64| c.lat = v)
            .property("lng", |c: &Coordinates| c.lng, |c: &mut Coordinates, v: f64| c.lng = v);
    }
}

impl Bridgeable for Place {
    fn describe(members: &mut DescriptorBuilder<Self>) {
        members
            .property("id", |p: &Place| p.id.clone(), |p: &mut Place, v: String| p.id = v)
            .property("name", |p: &Place| p.name.clone(), |p: &mut Place, v: Option<String>| p.name = v)
            .property("rating", |p: &Place| p.rating, |p: &mut Place, v: Option<f64>| p.rating = v)
            .property("tags", |p: &Place| p.tags.clone(), |p: &mut Place, v: Vec<String>| p.tags = v)
            .property(
                "location",
                |p: &Place| {
                    p.location
                        .as_ref()
                        .and_then(|c| AssocList::from_object(c).ok())
                },
                |p: &mut Place, v: Option<Coordinates>| p.location = v,
            );
    }
}

impl_coerce_record!(Coordinates, Place);

fn realistic_samples() -> Vec<&'static str> {
    vec![
        r#"{"id":"0ahUKEa1ZQ","name":"Acme Widgets","rating":4.3,"tags":["hardware","store"],"location":{"lat":37.4219,"lng":-122.084}}"#,
        r#"{"id":"0ahUKEa2ZQ","name":null,"rating":4,"tags":[],"location":null}"#,
        r#"{"id":"0ahUKEa3ZQ","name":"Acme West","rating":null,"tags":["outlet"],"location":{"lat":37,"lng":-122}}"#,
    ]
}

// ————————————————————————————————————————————————————————————————————————————
// SCENARIOS
// ————————————————————————————————————————————————————————————————————————————

fn config_persists_through_json() -> Result<()> {
    let id = Uuid::parse_str("3fa85f64-5717-4562-b3fc-2c963f66afa6")?;
    write(|s| s.client_id = Some(id));
    let saved = AssocList::from_static_fields::<AppConfig>()?.to_json()?;
    ensure!(!saved.contains("secret"), "ignored field leaked: {saved}");

    write(|s| {
        s.retries = 0;
        s.client_id = None;
    });
    let restored = AssocList::from_json_str(&saved, ListOptions::default())?;
    restored.to_static_fields::<AppConfig>(false)?;
    ensure!(read(|s| s.retries) == 3, "retries not restored");
    ensure!(read(|s| s.client_id) == Some(id), "client id not restored");
    Ok(())
}

fn payloads_become_records_and_back() -> Result<()> {
    for sample in realistic_samples() {
        let list = AssocList::from_json_str(sample, ListOptions::default())?;
        let place: Place = assoc_bridge::to_new_object(&list, false)?;
        let back = AssocList::from_object(&place)?;
        let again: Place = assoc_bridge::to_new_object(&back, false)?;
        ensure!(again == place, "record changed on round trip: {sample}");
    }
    Ok(())
}

fn documents_round_trip() -> Result<()> {
    for sample in realistic_samples() {
        let list = AssocList::from_json_str(sample, ListOptions::default())?;
        let emitted = list.to_json()?;
        let parsed: serde_json::Value = serde_json::from_str(&emitted)?;
        let expected: serde_json::Value = serde_json::from_str(sample)?;
        ensure!(parsed == expected, "document changed: {emitted}");
        let again = AssocList::from_json_str(&emitted, ListOptions::default())?;
        ensure!(again == list, "list changed on round trip");
        ensure!(matches!(again.get("id"), Some(Value::Text(_))), "id is not text");
    }
    Ok(())
}

fn main() {
    let scenarios: [(&str, fn() -> Result<()>); 3] = [
        ("config persists through json", config_persists_through_json),
        ("payloads become records and back", payloads_become_records_and_back),
        ("documents round trip", documents_round_trip),
    ];
    let mut failed = 0;
    for (name, run) in scenarios {
        match run() {
            Ok(()) => eprintln!("✅ {name}"),
            Err(error) => {
                failed += 1;
                eprintln!("❌ {name}: {error:#}");
            }
        }
    }
    if failed > 0 {
        std::process::exit(1);
    }
}
