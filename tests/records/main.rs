//! Typed record tests: the derive macro, `Records` CRUD and watching,
//! singleton content documents and seeding.


use std::sync::{Arc, Mutex};

use fireshim::{Client, Direction, Error, Filterable, InMemoryStore, Record};
use serde_json::json;

use models::{Tour, VehicleType, WhaleWatchingPage};

fn client() -> Client<InMemoryStore> {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    Client::in_memory()
}

#[test]
fn derive_names_collections() {
    assert_eq!(Tour::COLLECTION, "tours");
    assert_eq!(VehicleType::COLLECTION, "vehicle_types");
    assert_eq!(WhaleWatchingPage::COLLECTION, "content");
}

#[test]
fn insert_and_get() {
    let client = client();
    let tours = client.records::<Tour>();

    let created = tours.insert(&Tour::new("Ella Rock", 80)).unwrap();
    assert_eq!(created.data, Tour::new("Ella Rock", 80));
    assert_eq!(created.revision, 1);
    assert_eq!(created.created_at, created.updated_at);

    let fetched = tours.get(&created.id).unwrap().unwrap();
    assert_eq!(fetched, created);
    assert!(tours.get("missing").unwrap().is_none());
}

#[test]
fn list_and_fetch() {
    let client = client();
    let tours = client.records::<Tour>();
    tours.save("a", &Tour::new("Galle Fort", 45)).unwrap();
    tours.save("b", &Tour::new("Sigiriya", 95)).unwrap();
    tours.save("c", &Tour::new("Mirissa", 120)).unwrap();

    assert_eq!(tours.list().unwrap().len(), 3);

    let affordable = tours
        .fetch(tours.query().lt("price", 100).order("price", Direction::Descending))
        .unwrap();
    let titles: Vec<_> = affordable.iter().map(|t| t.data.title.as_str()).collect();
    assert_eq!(titles, ["Sigiriya", "Galle Fort"]);
}

#[test]
fn save_creates_then_merges() {
    let client = client();
    let tours = client.records::<Tour>();

    let first = tours.save("ella", &Tour::new("Ella Rock", 80)).unwrap();
    let second = tours.save("ella", &Tour::new("Ella Rock Hike", 85)).unwrap();

    assert_eq!(second.id, "ella");
    assert_eq!(second.data.price, 85);
    assert_eq!(second.created_at, first.created_at);
    assert!(second.updated_at > first.updated_at);
    assert_eq!(tours.list().unwrap().len(), 1);
}

#[test]
fn patch_and_remove() {
    let client = client();
    let tours = client.records::<Tour>();
    tours.save("ella", &Tour::new("Ella Rock", 80)).unwrap();

    let patch = fireshim::document::into_fields(json!({ "tags": ["hike"] })).unwrap();
    let patched = tours.patch("ella", patch.clone()).unwrap().unwrap();
    assert_eq!(patched.data.tags, ["hike"]);
    assert_eq!(patched.data.title, "Ella Rock");

    assert!(tours.patch("missing", patch).unwrap().is_none());

    assert!(tours.remove("ella").unwrap());
    assert!(!tours.remove("ella").unwrap());
    assert!(tours.get("ella").unwrap().is_none());
}

#[test]
fn undecodable_documents_surface_as_serde_errors() {
    let client = client();
    client
        .from("tours")
        .insert(&json!({ "id": "bad", "title": "Broken", "price": "free" }))
        .execute();

    let result = client.records::<Tour>().get("bad");
    assert!(matches!(result, Err(Error::Serde(_))));
}

#[test]
fn watch_decodes_and_skips_bad_records() {
    let client = client();
    let tours = client.records::<Tour>();
    tours.save("ok", &Tour::new("Ella Rock", 80)).unwrap();
    client
        .from("tours")
        .insert(&json!({ "id": "bad", "title": "Broken", "price": "free" }))
        .execute();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let _subscription = tours
        .watch(Vec::new(), move |records| {
            let titles: Vec<String> = records.iter().map(|r| r.data.title.clone()).collect();
            sink.lock().unwrap().push(titles);
        })
        .unwrap();

    tours.save("new", &Tour::new("Yala", 150)).unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            vec!["Ella Rock".to_string()],
            vec!["Yala".to_string(), "Ella Rock".to_string()],
        ]
    );
}

#[test]
fn seed_then_read_typed() {
    let client = client();
    let report = client
        .seed(&json!({
            "tours": [
                { "title": "Galle Fort", "price": 45 },
                { "title": "Sigiriya", "price": 95, "tags": ["history"] }
            ],
            "vehicle_types": { "van": { "name": "Van" }, "car": { "name": "Car" } }
        }))
        .unwrap();

    assert_eq!(report.total(), 4);
    assert_eq!(client.records::<Tour>().list().unwrap().len(), 2);

    let van = client.records::<VehicleType>().get("van").unwrap().unwrap();
    assert_eq!(van.data.name, "Van");
    assert!(van.created_at.is_some());
}
