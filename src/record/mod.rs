//! Records - typed access to a collection through a declared record type.
//!
//! ```ignore
//! #[derive(Serialize, Deserialize, Record)]
//! #[record(collection = "tours")]
//! struct Tour { title: String, price: u32 }
//!
//! let tours = client.records::<Tour>();
//! let created = tours.insert(&Tour { title: "Ella Rock".into(), price: 80 })?;
//! let cheap = tours.fetch(tours.query().lte("price", 100))?;
//! ```

mod singleton;

use std::marker::PhantomData;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::builder::{Filterable, QueryBuilder, Response};
use crate::client::Client;
use crate::document::{Document, Fields, CREATED_AT, ID_FIELD, UPDATED_AT};
use crate::error::Error;
use crate::query::Filter;
use crate::store::{DocumentStore, Subscription};

pub use singleton::Singleton;

/// A record type stored in one collection.
///
/// Usually derived: `#[derive(Record)]` with an optional
/// `#[record(collection = "...")]`.
pub trait Record: Serialize + DeserializeOwned + Send + Sync {
    const COLLECTION: &'static str;
}

/// A decoded record with its document metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Stored<M> {
    pub id: String,
    pub revision: u64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub data: M,
}

impl<M: DeserializeOwned> Stored<M> {
    /// Decode a document. The id and timestamps are lifted out of the
    /// fields before `M` sees them.
    pub fn from_document(doc: Document) -> Result<Self, Error> {
        let created_at = doc.created_at();
        let updated_at = doc.updated_at();
        let Document {
            id,
            mut fields,
            revision,
        } = doc;
        fields.remove(ID_FIELD);
        fields.remove(CREATED_AT);
        fields.remove(UPDATED_AT);
        Ok(Self {
            id,
            revision,
            created_at,
            updated_at,
            data: serde_json::from_value(Value::Object(fields))?,
        })
    }
}

/// Typed accessor for records of type `M`.
pub struct Records<'a, S, M> {
    client: &'a Client<S>,
    _marker: PhantomData<fn() -> M>,
}

impl<'a, S, M> Clone for Records<'a, S, M> {
    fn clone(&self) -> Self {
        Self {
            client: self.client,
            _marker: PhantomData,
        }
    }
}

impl<'a, S: DocumentStore, M: Record> Records<'a, S, M> {
    pub(crate) fn new(client: &'a Client<S>) -> Self {
        Self {
            client,
            _marker: PhantomData,
        }
    }

    /// A builder over `M`'s collection.
    pub fn query(&self) -> QueryBuilder<'a, S> {
        self.client.from(M::COLLECTION)
    }

    pub fn get(&self, id: &str) -> Result<Option<Stored<M>>, Error> {
        self.client
            .get(M::COLLECTION, id)?
            .map(Stored::from_document)
            .transpose()
    }

    /// Every record, in id order.
    pub fn list(&self) -> Result<Vec<Stored<M>>, Error> {
        self.fetch(self.query())
    }

    /// Run a read built from [`query`](Self::query) and decode the rows.
    pub fn fetch(&self, query: QueryBuilder<'a, S>) -> Result<Vec<Stored<M>>, Error> {
        decode_rows(query.execute())
    }

    /// Create a record under a generated id.
    pub fn insert(&self, record: &M) -> Result<Stored<M>, Error> {
        let response = self.query().insert(record).single().execute();
        decode_one(response)?.ok_or_else(|| Error::Payload("insert returned no document".into()))
    }

    /// Write `record` at `id`, merging into an existing document or
    /// creating it.
    pub fn save(&self, id: &str, record: &M) -> Result<Stored<M>, Error> {
        let mut fields = to_fields(record)?;
        fields.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
        let response = self.query().upsert(&fields).single().execute();
        decode_one(response)?.ok_or_else(|| Error::Payload("upsert returned no document".into()))
    }

    /// Patch the record at `id`. Returns None if it does not exist.
    pub fn patch(&self, id: &str, patch: Fields) -> Result<Option<Stored<M>>, Error> {
        decode_one(self.query().eq(ID_FIELD, id).update(&patch).single().execute())
    }

    /// Delete the record at `id`. Returns true if it existed.
    pub fn remove(&self, id: &str) -> Result<bool, Error> {
        let response = self.query().eq(ID_FIELD, id).delete().execute();
        Ok(!response.into_result()?.map_or(true, |data| data.is_empty()))
    }

    /// Subscribe to matching records. Documents that fail to decode as `M`
    /// are skipped.
    pub fn watch<F>(&self, filters: Vec<Filter>, callback: F) -> Result<Subscription, Error>
    where
        M: 'static,
        F: Fn(&[Stored<M>]) + Send + Sync + 'static,
    {
        self.client.subscribe(M::COLLECTION, filters, move |docs| {
            let records: Vec<Stored<M>> = docs
                .iter()
                .cloned()
                .filter_map(|doc| {
                    let id = doc.id.clone();
                    Stored::from_document(doc)
                        .map_err(|error| {
                            tracing::warn!(collection = M::COLLECTION, id = %id, error = %error, "skipping undecodable record");
                        })
                        .ok()
                })
                .collect();
            callback(&records);
        })
    }

    /// Content document at a fixed id with a fallback value.
    pub fn singleton(&self, id: impl Into<String>, default: M) -> Singleton<'a, S, M>
    where
        M: Clone,
    {
        Singleton::new(self.clone(), id.into(), default)
    }

    pub(crate) fn client(&self) -> &'a Client<S> {
        self.client
    }
}

pub(crate) fn to_fields<M: Serialize>(record: &M) -> Result<Fields, Error> {
    match serde_json::to_value(record)? {
        Value::Object(fields) => Ok(fields),
        other => Err(Error::Payload(format!(
            "record must serialize to an object, got {}",
            other
        ))),
    }
}

fn decode_rows<M: DeserializeOwned>(response: Response) -> Result<Vec<Stored<M>>, Error> {
    let rows = response.into_result()?.map(|data| data.into_vec()).unwrap_or_default();
    rows.into_iter().map(Stored::from_document).collect()
}

fn decode_one<M: DeserializeOwned>(response: Response) -> Result<Option<Stored<M>>, Error> {
    Ok(decode_rows(response)?.into_iter().next())
}
