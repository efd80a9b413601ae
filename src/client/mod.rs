//! Client - the entry point: one builder per collection, realtime
//! subscriptions, point reads, seeding and typed record access.

mod clock;
mod seed;

use std::sync::Arc;

use crate::builder::QueryBuilder;
use crate::config::ShimConfig;
use crate::document::{format_timestamp, Document};
use crate::error::Error;
use crate::query::{Filter, StructuredQuery};
use crate::record::{Record, Records};
use crate::store::{DocumentStore, InMemoryStore, Subscription, WriteBatch};

use clock::Clock;

pub use seed::SeedReport;

/// Query-builder front end over a [`DocumentStore`].
pub struct Client<S> {
    store: S,
    config: ShimConfig,
    clock: Clock,
}

impl Client<InMemoryStore> {
    /// Client over a fresh in-memory store with default config.
    pub fn in_memory() -> Self {
        Self::new(InMemoryStore::new())
    }
}

impl<S: DocumentStore> Client<S> {
    /// Client with the default config.
    ///
    /// Timestamps come from a clock owned by this client: they strictly
    /// increase across the writes of one client, but two clients sharing a
    /// store may stamp the same instant. Share one client where ordering
    /// by `updated_at` matters.
    pub fn new(store: S) -> Self {
        Self {
            store,
            config: ShimConfig::default(),
            clock: Clock::default(),
        }
    }

    /// Client with a validated config. `auto_id_length` applies to every
    /// batch this client commits, whatever the store's own default.
    pub fn with_config(store: S, config: ShimConfig) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self {
            store,
            config,
            clock: Clock::default(),
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &ShimConfig {
        &self.config
    }

    /// Start a builder over `collection`.
    pub fn from(&self, collection: impl Into<String>) -> QueryBuilder<'_, S> {
        QueryBuilder::new(self, collection)
    }

    /// Typed accessor for records of type `M`.
    pub fn records<M: Record>(&self) -> Records<'_, S, M> {
        Records::new(self)
    }

    /// Fetch one document by id.
    pub fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, Error> {
        Ok(self.store.get_doc(collection, id)?)
    }

    /// Call `callback` with every document matching `filters`, now and after
    /// every change to `collection`. Drop the returned handle to stop.
    pub fn subscribe<F>(
        &self,
        collection: &str,
        filters: Vec<Filter>,
        callback: F,
    ) -> Result<Subscription, Error>
    where
        F: Fn(&[Document]) + Send + Sync + 'static,
    {
        for filter in &filters {
            filter.check(self.config.max_in_values)?;
        }
        tracing::debug!(collection, predicates = filters.len(), "subscribing");
        let query = StructuredQuery::with_filters(filters);
        Ok(self.store.listen(collection, query, Arc::new(callback))?)
    }

    /// Next timestamp, formatted for storage.
    pub(crate) fn stamp(&self) -> String {
        format_timestamp(self.clock.now())
    }

    /// Commit a batch within the configured size limit. Returns the written
    /// (or, for deletes, removed) documents in batch order.
    pub(crate) fn commit(&self, batch: WriteBatch) -> Result<Vec<Document>, Error> {
        if batch.len() > self.config.max_batch_writes {
            return Err(Error::BatchTooLarge {
                count: batch.len(),
                max: self.config.max_batch_writes,
            });
        }
        let batch = batch.with_auto_id_length(self.config.auto_id_length);
        let results = self.store.commit(batch)?;
        Ok(results.into_iter().filter_map(|r| r.document).collect())
    }
}
