use fireshim::{Client, Data, Error, Filterable, InMemoryStore, ShimConfig, StoreError};
use serde_json::json;

use crate::support::{client, client_with};

#[test]
fn insert_returns_the_created_record() {
    let client = client();
    let response = client
        .from("items")
        .insert(&json!({ "name": "a" }))
        .execute();

    let rows = response.rows();
    assert_eq!(rows.len(), 1);
    let created = &rows[0];
    assert_eq!(created.id.len(), 20);
    assert_eq!(created.fields["name"], "a");
    assert!(created.created_at().is_some());
    assert_eq!(created.created_at(), created.updated_at());
}

#[test]
fn inserted_record_reads_back() {
    let client = client();
    let created = client
        .from("items")
        .insert(&json!({ "name": "a" }))
        .single()
        .execute();
    let Some(Data::Row(created)) = created.data else {
        panic!("insert should return a row");
    };

    let fetched = client.from("items").eq("name", "a").single().execute();
    assert_eq!(fetched.data, Some(Data::Row(created)));
}

#[test]
fn insert_many_shares_one_stamp() {
    let client = client();
    let response = client
        .from("items")
        .insert(&json!([{ "name": "a" }, { "name": "b" }, { "name": "c" }]))
        .execute();

    let rows = response.into_rows();
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|doc| doc.created_at() == rows[0].created_at()));
    assert_eq!(client.store().count("items").unwrap(), 3);
}

#[test]
fn caller_supplied_ids_are_kept() {
    let client = client();
    let response = client
        .from("items")
        .insert(&json!({ "id": "fixed", "name": "a" }))
        .execute();

    assert_eq!(response.rows()[0].id, "fixed");
    assert!(!response.rows()[0].fields.contains_key("id"));
}

#[test]
fn duplicate_id_fails_the_whole_batch() {
    let client = client();
    client.from("items").insert(&json!({ "id": "x", "name": "a" })).execute();

    let response = client
        .from("items")
        .insert(&json!([{ "name": "fresh" }, { "id": "x", "name": "dupe" }]))
        .execute();

    assert!(matches!(
        response.error,
        Some(Error::Store(StoreError::AlreadyExists { .. }))
    ));
    assert_eq!(client.store().count("items").unwrap(), 1);
}

#[test]
fn oversized_insert_is_rejected_before_writing() {
    let client = client_with(ShimConfig {
        max_batch_writes: 2,
        ..ShimConfig::default()
    });
    let response = client
        .from("items")
        .insert(&json!([{ "n": 1 }, { "n": 2 }, { "n": 3 }]))
        .execute();

    assert_eq!(
        response.error,
        Some(Error::BatchTooLarge { count: 3, max: 2 })
    );
    assert_eq!(client.store().count("items").unwrap(), 0);
}

#[test]
fn malformed_payloads_are_reported() {
    let client = client();
    let response = client.from("items").insert(&json!([1, 2])).execute();
    assert!(matches!(response.error, Some(Error::Payload(_))));

    let response = client.from("items").insert(&json!({ "id": 9 })).execute();
    assert!(matches!(response.error, Some(Error::Payload(_))));
}

#[test]
fn typed_payloads_serialize() {
    #[derive(serde::Serialize)]
    struct Driver<'a> {
        name: &'a str,
        seats: u8,
    }

    let client = client();
    let response = client
        .from("drivers")
        .insert(&Driver { name: "Ravi", seats: 6 })
        .execute();
    assert_eq!(response.rows()[0].fields["seats"], 6);
}

#[test]
fn client_config_sets_generated_id_length() {
    let config = ShimConfig {
        auto_id_length: 8,
        ..ShimConfig::default()
    };
    let client = Client::with_config(InMemoryStore::new(), config).unwrap();

    let response = client.from("items").insert(&json!({ "name": "a" })).execute();
    assert_eq!(response.rows()[0].id.len(), 8);

    let upserted = client.from("items").upsert(&json!({ "name": "b" })).execute();
    assert_eq!(upserted.rows()[0].id.len(), 8);

    client.seed(&json!({ "drivers": [{ "name": "Ravi" }] })).unwrap();
    let drivers = client.from("drivers").execute();
    assert_eq!(drivers.rows()[0].id.len(), 8);
}

#[test]
fn stamps_strictly_increase_within_one_client() {
    let client = client();
    let stamps: Vec<_> = (0..50)
        .map(|n| {
            let response = client.from("items").insert(&json!({ "n": n })).execute();
            response.rows()[0].created_at().unwrap()
        })
        .collect();

    assert!(stamps.windows(2).all(|pair| pair[0] < pair[1]));
}
