//! fireshim - a chainable query-builder over a document store.
//!
//! Application code writes `client.from("tours").eq("active", true).order(..)`
//! and gets back a `{ data, error }` [`Response`]. The builder compiles to a
//! [`StructuredQuery`] and a [`WriteBatch`] against any [`DocumentStore`];
//! [`InMemoryStore`] is bundled.

extern crate self as fireshim;

mod builder;
mod client;
mod config;
pub mod document;
mod error;
pub mod query;
mod record;
pub mod store;

pub use builder::{Data, Filterable, Mutation, QueryBuilder, Response};
pub use client::{Client, SeedReport};
pub use config::{ShimConfig, MAX_AUTO_ID_LENGTH};
pub use document::{Document, Fields};
pub use error::Error;
pub use query::{CompareOp, Direction, Filter, OrderBy, StructuredQuery};
pub use record::{Record, Records, Singleton, Stored};
pub use store::{
    DocumentStore, InMemoryStore, Listener, Precondition, SetOptions, StoreError, Subscription,
    Write, WriteBatch, WriteResult,
};

// Derive macro for `Record`.
pub use fireshim_macros::Record;
