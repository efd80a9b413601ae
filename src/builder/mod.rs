//! QueryBuilder - chainable, deferred queries and mutations over one collection.
//!
//! ## Example
//!
//! ```ignore
//! use fireshim::{Client, Direction, Filterable};
//!
//! let client = Client::in_memory();
//! let created = client.from("tours").insert(&json!({ "title": "Ella Rock", "price": 80 })).execute();
//!
//! let cheap = client
//!     .from("tours")
//!     .lte("price", 100)
//!     .order("price", Direction::Ascending)
//!     .limit(10)
//!     .await;
//! ```
//!
//! Nothing touches the store until `execute()` (or `.await`). Every chain
//! method consumes the builder and returns a new value, so a clone of a
//! partial chain can be extended independently.

mod filterable;
mod mutation;
mod response;

use std::fmt;
use std::future::{ready, IntoFuture, Ready};

use serde::Serialize;
use serde_json::Value;

use crate::client::Client;
use crate::document::{Document, Fields};
use crate::error::Error;
use crate::query::{Direction, Filter, OrderBy, StructuredQuery};
use crate::store::DocumentStore;

pub use filterable::Filterable;
pub use mutation::Mutation;
pub use response::{Data, Response};

/// Read builder for one collection. Mutation verbs turn it into a [`Mutation`].
pub struct QueryBuilder<'a, S> {
    client: &'a Client<S>,
    collection: String,
    filters: Vec<Filter>,
    order_by: Vec<OrderBy>,
    limit: Option<usize>,
    single: bool,
    match_all: bool,
}

impl<'a, S> Clone for QueryBuilder<'a, S> {
    fn clone(&self) -> Self {
        Self {
            client: self.client,
            collection: self.collection.clone(),
            filters: self.filters.clone(),
            order_by: self.order_by.clone(),
            limit: self.limit,
            single: self.single,
            match_all: self.match_all,
        }
    }
}

impl<'a, S> fmt::Debug for QueryBuilder<'a, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("collection", &self.collection)
            .field("filters", &self.filters)
            .field("order_by", &self.order_by)
            .field("limit", &self.limit)
            .field("single", &self.single)
            .field("match_all", &self.match_all)
            .finish()
    }
}

impl<'a, S> Filterable for QueryBuilder<'a, S> {
    fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }
}

impl<'a, S: DocumentStore> QueryBuilder<'a, S> {
    pub(crate) fn new(client: &'a Client<S>, collection: impl Into<String>) -> Self {
        Self {
            client,
            collection: collection.into(),
            filters: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            single: false,
            match_all: false,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// Accepted for compatibility; projection is not applied.
    pub fn select(self, columns: &str) -> Self {
        tracing::trace!(collection = %self.collection, columns, "select() projection ignored");
        self
    }

    pub fn order(mut self, field: &str, direction: Direction) -> Self {
        self.order_by.push(OrderBy {
            field: field.to_string(),
            direction,
        });
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// Collapse the result to the first document, or no data when nothing
    /// matches. Zero matches is not an error.
    pub fn single(mut self) -> Self {
        self.single = true;
        self
    }

    pub fn maybe_single(self) -> Self {
        self.single()
    }

    /// Explicitly target every record, allowing `update`/`delete` without
    /// predicates.
    pub fn all(mut self) -> Self {
        self.match_all = true;
        self
    }

    /// Create one record (JSON object) or many (array of objects).
    pub fn insert<T: Serialize + ?Sized>(self, data: &T) -> Mutation<'a, S> {
        Mutation::insert(self, to_records(data))
    }

    /// Patch every matching record.
    pub fn update<T: Serialize + ?Sized>(self, patch: &T) -> Mutation<'a, S> {
        Mutation::update(self, to_patch(patch))
    }

    /// Merge records carrying an `id` into that document; create the rest.
    pub fn upsert<T: Serialize + ?Sized>(self, data: &T) -> Mutation<'a, S> {
        Mutation::upsert(self, to_records(data))
    }

    /// Remove every matching record.
    pub fn delete(self) -> Mutation<'a, S> {
        Mutation::delete(self)
    }

    /// Run the read. Failures land in `error`; this never panics.
    pub fn execute(self) -> Response {
        tracing::debug!(
            collection = %self.collection,
            operation = "select",
            predicates = self.filters.len(),
            "executing query"
        );
        let collection = self.collection.clone();
        match self.run() {
            Ok(data) => Response::ok(data),
            Err(error) => {
                tracing::warn!(collection = %collection, error = %error, "query failed");
                Response::err(error)
            }
        }
    }

    fn run(self) -> Result<Option<Data>, Error> {
        let query = self.structured(self.single)?;
        let docs = self.client.store().run_query(&self.collection, &query)?;
        Ok(self.shape(docs))
    }

    /// Compile to a store query. `collapse` caps the result at one document.
    fn structured(&self, collapse: bool) -> Result<StructuredQuery, Error> {
        let max_in_values = self.client.config().max_in_values;
        for filter in &self.filters {
            filter.check(max_in_values)?;
        }
        if let Some(order) = self.order_by.iter().find(|o| o.field.is_empty()) {
            return Err(Error::predicate(&order.field, "order field must not be empty"));
        }

        let limit = if collapse {
            Some(self.limit.map_or(1, |n| n.min(1)))
        } else {
            self.limit
        };

        Ok(StructuredQuery {
            filters: self.filters.clone(),
            order_by: self.order_by.clone(),
            limit,
        })
    }

    fn shape(&self, docs: Vec<Document>) -> Option<Data> {
        if self.single {
            docs.into_iter().next().map(Data::Row)
        } else {
            Some(Data::Rows(docs))
        }
    }

    fn ensure_scoped(&self, operation: &'static str) -> Result<(), Error> {
        if self.filters.is_empty()
            && !self.match_all
            && !self.client.config().allow_unscoped_mutations
        {
            return Err(Error::UnscopedMutation {
                collection: self.collection.clone(),
                operation,
            });
        }
        Ok(())
    }
}

impl<'a, S: DocumentStore> IntoFuture for QueryBuilder<'a, S> {
    type Output = Response;
    type IntoFuture = Ready<Response>;

    fn into_future(self) -> Self::IntoFuture {
        ready(self.execute())
    }
}

fn to_records<T: Serialize + ?Sized>(data: &T) -> Result<Vec<Fields>, Error> {
    match serde_json::to_value(data)? {
        Value::Object(fields) => Ok(vec![fields]),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(fields) => Ok(fields),
                other => Err(Error::Payload(format!(
                    "expected an object per record, got {}",
                    other
                ))),
            })
            .collect(),
        other => Err(Error::Payload(format!(
            "expected an object or an array of objects, got {}",
            other
        ))),
    }
}

fn to_patch<T: Serialize + ?Sized>(patch: &T) -> Result<Fields, Error> {
    match serde_json::to_value(patch)? {
        Value::Object(fields) => Ok(fields),
        other => Err(Error::Payload(format!("expected an object patch, got {}", other))),
    }
}
