//! Failures travel in the `error` half of the response.

use fireshim::{Direction, Error, Filterable, StoreError};

use crate::support::tours_client;

#[test]
fn empty_membership_list_is_a_predicate_error() {
    let client = tours_client();
    let response = client.from("tours").in_::<&str>("region", []).execute();

    assert!(response.data.is_none());
    assert!(matches!(response.error, Some(Error::Predicate { ref field, .. }) if field == "region"));
}

#[test]
fn oversized_membership_list_is_rejected() {
    let client = tours_client();
    let response = client.from("tours").in_("price", 0..31).execute();
    assert!(matches!(response.error, Some(Error::Predicate { .. })));

    let response = client.from("tours").in_("price", 0..30).execute();
    assert!(response.is_ok());
}

#[test]
fn empty_field_names_are_rejected() {
    let client = tours_client();
    let response = client.from("tours").eq("", 1).execute();
    assert!(matches!(response.error, Some(Error::Predicate { .. })));

    let response = client.from("tours").order("", Direction::Ascending).execute();
    assert!(matches!(response.error, Some(Error::Predicate { .. })));
}

#[test]
fn invalid_collection_is_a_store_error() {
    let client = tours_client();
    let response = client.from("tours/ella-rock").execute();
    assert!(matches!(
        response.error,
        Some(Error::Store(StoreError::InvalidArgument(_)))
    ));
}

#[test]
fn into_result_splits_the_envelope() {
    let client = tours_client();
    assert!(client.from("tours").execute().into_result().is_ok());
    assert!(client.from("").execute().into_result().is_err());
}

#[test]
fn unknown_collections_read_as_empty() {
    let client = tours_client();
    let response = client.from("drivers").execute();
    assert!(response.is_ok());
    assert!(response.rows().is_empty());
}
