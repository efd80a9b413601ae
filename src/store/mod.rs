//! DocumentStore - the upstream document-store seam the shim runs against.
//!
//! The trait mirrors the native client surface: point reads, structured
//! queries, single writes, atomic write batches and realtime listeners.
//! [`InMemoryStore`] is the bundled implementation.

mod batch;
mod ids;
mod in_memory;
#[cfg(feature = "snapshot")]
mod snapshot;
mod watch;

use std::sync::Arc;

use thiserror::Error;

use crate::document::{Document, Fields};
use crate::query::StructuredQuery;

pub use batch::{Precondition, SetOptions, Write, WriteBatch, WriteResult};
pub use ids::auto_id;
pub use in_memory::InMemoryStore;
pub use watch::Subscription;

/// Callback receiving the full matching set on every change.
pub type Listener = Arc<dyn Fn(&[Document]) + Send + Sync>;

/// Errors raised by a document store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    #[error("document already exists: {collection}/{id}")]
    AlreadyExists { collection: String, id: String },

    #[error("write conflict on {collection}/{id} (expected revision {expected}, actual {actual})")]
    Conflict {
        collection: String,
        id: String,
        expected: u64,
        actual: u64,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("document store lock poisoned during {0}")]
    LockPoisoned(&'static str),

    #[error("snapshot error: {0}")]
    Snapshot(String),
}

/// Abstract document storage.
///
/// Single-document writes are shorthands for one-write batches, so every
/// write path goes through [`commit`](DocumentStore::commit) semantics.
pub trait DocumentStore: Send + Sync {
    /// Fetch a document by id. Returns None if it does not exist.
    fn get_doc(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Run a structured query against one collection.
    fn run_query(
        &self,
        collection: &str,
        query: &StructuredQuery,
    ) -> Result<Vec<Document>, StoreError>;

    /// Create a document under a store-generated id.
    fn add_doc(&self, collection: &str, fields: Fields) -> Result<Document, StoreError>;

    /// Write a document at a known id, replacing it or merging into it.
    fn set_doc(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
        options: SetOptions,
    ) -> Result<Document, StoreError>;

    /// Patch an existing document. Keys may be dotted paths.
    fn update_doc(&self, collection: &str, id: &str, patch: Fields)
        -> Result<Document, StoreError>;

    /// Delete a document by id. Returns true if it existed.
    fn delete_doc(&self, collection: &str, id: &str) -> Result<bool, StoreError>;

    /// Apply every write in the batch, or none of them.
    fn commit(&self, batch: WriteBatch) -> Result<Vec<WriteResult>, StoreError>;

    /// Attach a realtime listener. It receives the current matching set and
    /// again the full set after every committed write to `collection`.
    /// Deliveries to one listener arrive in commit order.
    fn listen(
        &self,
        collection: &str,
        query: StructuredQuery,
        listener: Listener,
    ) -> Result<Subscription, StoreError>;

    /// Names of collections holding at least one document.
    fn list_collections(&self) -> Result<Vec<String>, StoreError>;
}
