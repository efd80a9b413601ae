//! Realtime subscription tests: initial snapshot, change delivery and
//! detaching.

use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use std::time::Duration;

use fireshim::{Client, CompareOp, DocumentStore, Document, Error, Filter, Filterable, InMemoryStore};
use serde_json::json;

type Snapshots = Arc<Mutex<Vec<Vec<String>>>>;

fn recorder() -> (Snapshots, impl Fn(&[Document]) + Send + Sync + 'static) {
    let snapshots: Snapshots = Arc::default();
    let sink = snapshots.clone();
    let callback = move |docs: &[Document]| {
        let ids = docs.iter().map(|doc| doc.id.clone()).collect();
        sink.lock().unwrap().push(ids);
    };
    (snapshots, callback)
}

fn client() -> Client<InMemoryStore> {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let client = Client::in_memory();
    client
        .seed(&json!({
            "drivers": {
                "d-1": { "name": "Ravi", "available": true },
                "d-2": { "name": "Sunil", "available": false }
            }
        }))
        .unwrap();
    client
}

fn available() -> Vec<Filter> {
    vec![Filter::compare("available", CompareOp::Eq, true)]
}

#[test]
fn delivers_the_current_set_on_subscribe() {
    let client = client();
    let (snapshots, callback) = recorder();

    let _subscription = client.subscribe("drivers", available(), callback).unwrap();

    assert_eq!(*snapshots.lock().unwrap(), vec![vec!["d-1".to_string()]]);
}

#[test]
fn delivers_the_full_set_after_every_write() {
    let client = client();
    let (snapshots, callback) = recorder();
    let _subscription = client.subscribe("drivers", available(), callback).unwrap();

    client
        .from("drivers")
        .eq("id", "d-2")
        .update(&json!({ "available": true }))
        .execute();
    client
        .from("drivers")
        .insert(&json!({ "id": "d-3", "name": "Tharu", "available": false }))
        .execute();
    client.from("drivers").eq("id", "d-1").delete().execute();

    let snapshots = snapshots.lock().unwrap();
    assert_eq!(
        *snapshots,
        vec![
            vec!["d-1".to_string()],
            vec!["d-1".to_string(), "d-2".to_string()],
            vec!["d-1".to_string(), "d-2".to_string()],
            vec!["d-2".to_string()],
        ]
    );
}

#[test]
fn writes_to_other_collections_are_not_delivered() {
    let client = client();
    let (snapshots, callback) = recorder();
    let _subscription = client.subscribe("drivers", Vec::new(), callback).unwrap();

    client.from("tours").insert(&json!({ "title": "x" })).execute();

    assert_eq!(snapshots.lock().unwrap().len(), 1);
}

#[test]
fn one_batch_is_one_delivery() {
    let client = client();
    let (snapshots, callback) = recorder();
    let _subscription = client.subscribe("drivers", Vec::new(), callback).unwrap();

    client
        .from("drivers")
        .insert(&json!([{ "name": "a" }, { "name": "b" }, { "name": "c" }]))
        .execute();

    let snapshots = snapshots.lock().unwrap();
    assert_eq!(snapshots.len(), 2);
    assert_eq!(snapshots[1].len(), 5);
}

#[test]
fn dropping_the_subscription_stops_delivery() {
    let client = client();
    let (snapshots, callback) = recorder();
    let subscription = client.subscribe("drivers", Vec::new(), callback).unwrap();
    assert_eq!(client.store().listener_count(), 1);

    drop(subscription);
    assert_eq!(client.store().listener_count(), 0);

    client.from("drivers").insert(&json!({ "name": "late" })).execute();
    assert_eq!(snapshots.lock().unwrap().len(), 1);
}

#[test]
fn unsubscribe_detaches() {
    let client = client();
    let (snapshots, callback) = recorder();
    let subscription = client.subscribe("drivers", Vec::new(), callback).unwrap();

    subscription.unsubscribe();
    client.from("drivers").insert(&json!({ "name": "late" })).execute();

    assert_eq!(snapshots.lock().unwrap().len(), 1);
    assert_eq!(client.store().listener_count(), 0);
}

#[test]
fn listeners_may_read_the_store() {
    let client = client();
    let store = client.store().clone();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();

    let _subscription = client
        .subscribe("drivers", Vec::new(), move |docs| {
            let count = store.run_query("drivers", &Default::default()).unwrap().len();
            sink.lock().unwrap().push((docs.len(), count));
        })
        .unwrap();

    client.from("drivers").insert(&json!({ "name": "new" })).execute();

    assert_eq!(*seen.lock().unwrap(), vec![(2, 2), (3, 3)]);
}

#[test]
fn invalid_predicates_are_rejected_up_front() {
    let client = client();
    let (snapshots, callback) = recorder();
    let result = client.subscribe(
        "drivers",
        vec![Filter::In {
            field: "name".into(),
            values: Vec::new(),
        }],
        callback,
    );

    assert!(matches!(result, Err(Error::Predicate { .. })));
    assert!(snapshots.lock().unwrap().is_empty());
    assert_eq!(client.store().listener_count(), 0);
}

#[test]
fn slow_listeners_still_end_on_the_latest_set() {
    let client = client();
    let seen: Arc<Mutex<Vec<usize>>> = Arc::default();
    let sink = seen.clone();
    let gate = Arc::new(Barrier::new(2));
    let listener_gate = gate.clone();

    let _subscription = client
        .subscribe("bookings", Vec::new(), move |docs| {
            if docs.len() == 1 {
                // Let the second writer commit while this delivery is in flight.
                listener_gate.wait();
                thread::sleep(Duration::from_millis(200));
            }
            sink.lock().unwrap().push(docs.len());
        })
        .unwrap();

    thread::scope(|scope| {
        scope.spawn(|| {
            client.from("bookings").insert(&json!({ "guest": "first" })).execute();
        });
        gate.wait();
        client.from("bookings").insert(&json!({ "guest": "second" })).execute();
    });

    assert_eq!(client.store().count("bookings").unwrap(), 2);
    assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
}

#[test]
fn concurrent_writers_never_deliver_a_stale_set_last() {
    let client = client();
    let seen: Arc<Mutex<Vec<usize>>> = Arc::default();
    let sink = seen.clone();
    let _subscription = client
        .subscribe("bookings", Vec::new(), move |docs| {
            sink.lock().unwrap().push(docs.len());
        })
        .unwrap();

    thread::scope(|scope| {
        for writer in 0..4 {
            let client = &client;
            scope.spawn(move || {
                for n in 0..10 {
                    client
                        .from("bookings")
                        .insert(&json!({ "writer": writer, "n": n }))
                        .execute();
                }
            });
        }
    });

    let seen = seen.lock().unwrap();
    assert!(seen.windows(2).all(|pair| pair[0] <= pair[1]), "{:?}", *seen);
    assert_eq!(seen.last(), Some(&40));
}

#[test]
fn listeners_may_write_to_the_store() {
    let client = client();
    let (audit, record_audit) = recorder();
    let _audit = client.subscribe("audit", Vec::new(), record_audit).unwrap();

    let store = client.store().clone();
    let _bookings = client
        .subscribe("bookings", Vec::new(), move |docs| {
            if !docs.is_empty() {
                let entry = fireshim::document::into_fields(json!({ "bookings": docs.len() })).unwrap();
                store.add_doc("audit", entry).unwrap();
            }
        })
        .unwrap();

    client.from("bookings").insert(&json!({ "guest": "Asha" })).execute();

    let audit = audit.lock().unwrap();
    assert_eq!(audit.len(), 2);
    assert!(audit[0].is_empty());
    assert_eq!(audit[1].len(), 1);
}

#[tokio::test]
async fn forwards_into_an_async_channel() {
    let client = client();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let _subscription = client
        .subscribe("drivers", available(), move |docs| {
            let _ = tx.send(docs.len());
        })
        .unwrap();

    client
        .from("drivers")
        .insert(&json!({ "name": "Tharu", "available": true }))
        .await;

    assert_eq!(rx.recv().await, Some(1));
    assert_eq!(rx.recv().await, Some(2));
}
