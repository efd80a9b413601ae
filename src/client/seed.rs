use std::collections::BTreeMap;

use serde_json::Value;

use super::Client;
use crate::document::{Fields, CREATED_AT, ID_FIELD, UPDATED_AT};
use crate::error::Error;
use crate::store::{DocumentStore, SetOptions, WriteBatch};

/// Documents written per collection by [`Client::seed`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub collections: BTreeMap<String, usize>,
}

impl SeedReport {
    pub fn total(&self) -> usize {
        self.collections.values().sum()
    }
}

impl<S: DocumentStore> Client<S> {
    /// Load fixture data keyed by collection name.
    ///
    /// A collection given as an object maps document ids to records and
    /// overwrites those documents. One given as an array appends its records
    /// under generated ids. Each collection is written in one batch.
    pub fn seed(&self, fixtures: &Value) -> Result<SeedReport, Error> {
        let Value::Object(collections) = fixtures else {
            return Err(Error::Payload("seed data must be an object of collections".into()));
        };

        let mut report = SeedReport::default();
        for (collection, records) in collections {
            let stamp = self.stamp();
            let batch = match records {
                Value::Object(by_id) => by_id.iter().try_fold(WriteBatch::new(), |batch, (id, record)| {
                    let fields = seed_fields(collection, record, &stamp)?;
                    Ok::<_, Error>(batch.set(collection.as_str(), id.as_str(), fields, SetOptions::default()))
                })?,
                Value::Array(items) => items.iter().try_fold(WriteBatch::new(), |batch, record| {
                    let fields = seed_fields(collection, record, &stamp)?;
                    Ok::<_, Error>(batch.create(collection.as_str(), None, fields))
                })?,
                other => {
                    return Err(Error::Payload(format!(
                        "seed collection {collection} must be an object or array, got {other}"
                    )))
                }
            };

            let written = self.commit(batch)?.len();
            tracing::info!(collection = %collection, written, "seeded collection");
            report.collections.insert(collection.clone(), written);
        }
        Ok(report)
    }
}

fn seed_fields(collection: &str, record: &Value, stamp: &str) -> Result<Fields, Error> {
    let Value::Object(fields) = record else {
        return Err(Error::Payload(format!(
            "seed record in {collection} must be an object, got {record}"
        )));
    };
    let mut fields = fields.clone();
    fields.remove(ID_FIELD);
    fields
        .entry(CREATED_AT)
        .or_insert_with(|| Value::String(stamp.to_string()));
    fields.insert(UPDATED_AT.to_string(), Value::String(stamp.to_string()));
    Ok(fields)
}
