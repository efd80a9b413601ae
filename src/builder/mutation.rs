use std::collections::BTreeSet;
use std::fmt;
use std::future::{ready, IntoFuture, Ready};

use serde_json::Value;

use super::{Data, Filterable, QueryBuilder, Response};
use crate::document::{Document, Fields, CREATED_AT, ID_FIELD, UPDATED_AT};
use crate::error::Error;
use crate::query::Filter;
use crate::store::{DocumentStore, Precondition, WriteBatch};

enum Operation {
    Insert(Result<Vec<Fields>, Error>),
    Update(Result<Fields, Error>),
    Upsert(Result<Vec<Fields>, Error>),
    Delete,
}

impl Operation {
    fn name(&self) -> &'static str {
        match self {
            Operation::Insert(_) => "insert",
            Operation::Update(_) => "update",
            Operation::Upsert(_) => "upsert",
            Operation::Delete => "delete",
        }
    }
}

/// A pending write. It accepts further predicates, `all()` and `single()`,
/// but no second mutation verb.
///
/// `update` and `delete` resolve the matching set, then commit one atomic
/// batch guarded by each document's revision: if any match changed in
/// between, nothing is written and the conflict is reported.
pub struct Mutation<'a, S> {
    query: QueryBuilder<'a, S>,
    operation: Operation,
}

impl<'a, S> fmt::Debug for Mutation<'a, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mutation")
            .field("operation", &self.operation.name())
            .field("query", &self.query)
            .finish()
    }
}

impl<'a, S> Filterable for Mutation<'a, S> {
    fn filter(mut self, filter: Filter) -> Self {
        self.query = self.query.filter(filter);
        self
    }
}

impl<'a, S: DocumentStore> Mutation<'a, S> {
    pub(super) fn insert(query: QueryBuilder<'a, S>, records: Result<Vec<Fields>, Error>) -> Self {
        Self {
            query,
            operation: Operation::Insert(records),
        }
    }

    pub(super) fn update(query: QueryBuilder<'a, S>, patch: Result<Fields, Error>) -> Self {
        Self {
            query,
            operation: Operation::Update(patch),
        }
    }

    pub(super) fn upsert(query: QueryBuilder<'a, S>, records: Result<Vec<Fields>, Error>) -> Self {
        Self {
            query,
            operation: Operation::Upsert(records),
        }
    }

    pub(super) fn delete(query: QueryBuilder<'a, S>) -> Self {
        Self {
            query,
            operation: Operation::Delete,
        }
    }

    /// Explicitly target every record.
    pub fn all(mut self) -> Self {
        self.query = self.query.all();
        self
    }

    /// Collapse the returned documents to the first one.
    pub fn single(mut self) -> Self {
        self.query = self.query.single();
        self
    }

    pub fn maybe_single(self) -> Self {
        self.single()
    }

    /// Run the write. Failures land in `error`; this never panics.
    pub fn execute(self) -> Response {
        let operation = self.operation.name();
        let collection = self.query.collection.clone();
        tracing::debug!(
            collection = %collection,
            operation,
            predicates = self.query.filters.len(),
            "executing mutation"
        );
        match self.run() {
            Ok(data) => Response::ok(data),
            Err(error) => {
                tracing::warn!(collection = %collection, operation, error = %error, "mutation failed");
                Response::err(error)
            }
        }
    }

    fn run(self) -> Result<Option<Data>, Error> {
        let Mutation { query, operation } = self;
        let docs = match operation {
            Operation::Insert(records) => insert_records(&query, records?)?,
            Operation::Update(patch) => update_matches(&query, patch?)?,
            Operation::Upsert(records) => upsert_records(&query, records?)?,
            Operation::Delete => delete_matches(&query)?,
        };
        Ok(query.shape(docs))
    }
}

impl<'a, S: DocumentStore> IntoFuture for Mutation<'a, S> {
    type Output = Response;
    type IntoFuture = Ready<Response>;

    fn into_future(self) -> Self::IntoFuture {
        ready(self.execute())
    }
}

/// Pull a caller-supplied id out of the record. Ids must be strings.
fn take_id(fields: &mut Fields) -> Result<Option<String>, Error> {
    match fields.remove(ID_FIELD) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(id)) => Ok(Some(id)),
        Some(other) => Err(Error::Payload(format!("record id must be a string, got {}", other))),
    }
}

fn insert_records<S: DocumentStore>(
    query: &QueryBuilder<'_, S>,
    records: Vec<Fields>,
) -> Result<Vec<Document>, Error> {
    let stamp = query.client.stamp();
    let mut batch = WriteBatch::new();
    for mut fields in records {
        let id = take_id(&mut fields)?;
        fields.insert(CREATED_AT.to_string(), Value::String(stamp.clone()));
        fields.insert(UPDATED_AT.to_string(), Value::String(stamp.clone()));
        batch = batch.create(query.collection.as_str(), id, fields);
    }
    query.client.commit(batch)
}

fn update_matches<S: DocumentStore>(
    query: &QueryBuilder<'_, S>,
    mut patch: Fields,
) -> Result<Vec<Document>, Error> {
    query.ensure_scoped("update")?;
    patch.remove(ID_FIELD);
    patch.remove(CREATED_AT);

    let targets = query
        .client
        .store()
        .run_query(&query.collection, &query.structured(false)?)?;

    patch.insert(UPDATED_AT.to_string(), Value::String(query.client.stamp()));
    let batch = targets.iter().fold(WriteBatch::new(), |batch, doc| {
        batch.update(
            query.collection.as_str(),
            doc.id.as_str(),
            patch.clone(),
            Some(Precondition::Revision(doc.revision)),
        )
    });
    query.client.commit(batch)
}

fn upsert_records<S: DocumentStore>(
    query: &QueryBuilder<'_, S>,
    records: Vec<Fields>,
) -> Result<Vec<Document>, Error> {
    let stamp = query.client.stamp();
    let store = query.client.store();
    let mut queued: BTreeSet<String> = BTreeSet::new();
    let mut batch = WriteBatch::new();
    for mut fields in records {
        let id = take_id(&mut fields)?;
        fields.remove(CREATED_AT);
        fields.insert(UPDATED_AT.to_string(), Value::String(stamp.clone()));

        // A repeated id merges into the write already queued for it.
        if let Some(id) = id.as_ref().filter(|id| queued.contains(*id)) {
            batch = batch.update(query.collection.as_str(), id.as_str(), fields, None);
            continue;
        }
        if let Some(id) = &id {
            queued.insert(id.clone());
        }

        let existing = match &id {
            Some(id) => store.get_doc(&query.collection, id)?,
            None => None,
        };
        batch = match (id, existing) {
            (Some(id), Some(existing)) => batch.update(
                query.collection.as_str(),
                id,
                fields,
                Some(Precondition::Revision(existing.revision)),
            ),
            (id, _) => {
                fields.insert(CREATED_AT.to_string(), Value::String(stamp.clone()));
                batch.create(query.collection.as_str(), id, fields)
            }
        };
    }
    query.client.commit(batch)
}

fn delete_matches<S: DocumentStore>(query: &QueryBuilder<'_, S>) -> Result<Vec<Document>, Error> {
    query.ensure_scoped("delete")?;
    let targets = query
        .client
        .store()
        .run_query(&query.collection, &query.structured(false)?)?;

    let batch = targets.iter().fold(WriteBatch::new(), |batch, doc| {
        batch.delete(
            query.collection.as_str(),
            doc.id.as_str(),
            Some(Precondition::Revision(doc.revision)),
        )
    });
    query.client.commit(batch)
}
