//! InMemoryStore - ordered-map document store for tests, demos and seeding.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock};

use serde_json::Value;

use super::watch::{ListenerRegistry, Target};
use super::{
    auto_id, DocumentStore, Listener, Precondition, SetOptions, StoreError, Subscription, Write,
    WriteBatch, WriteResult,
};
use crate::config::ShimConfig;
use crate::document::{set_path, Document, Fields};
use crate::query::StructuredQuery;

pub(super) type Collections = BTreeMap<String, BTreeMap<String, Document>>;

/// In-memory document store.
///
/// Collections and documents live in ordered maps, so iteration order is
/// ascending document id. Clone-friendly via Arc: clones share storage and
/// listeners.
#[derive(Clone)]
pub struct InMemoryStore {
    pub(super) state: Arc<RwLock<Collections>>,
    pub(super) listeners: Arc<ListenerRegistry>,
    auto_id_length: usize,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Create a new empty store generating 20-character ids. Batches that
    /// carry their own id length override it.
    pub fn new() -> Self {
        Self::with_id_length(ShimConfig::default().auto_id_length)
    }

    pub fn with_id_length(auto_id_length: usize) -> Self {
        Self {
            state: Arc::new(RwLock::new(BTreeMap::new())),
            listeners: Arc::new(ListenerRegistry::default()),
            auto_id_length: auto_id_length.max(1),
        }
    }

    pub fn from_config(config: &ShimConfig) -> Self {
        Self::with_id_length(config.auto_id_length)
    }

    /// Number of documents in a collection.
    pub fn count(&self, collection: &str) -> Result<usize, StoreError> {
        let state = self
            .state
            .read()
            .map_err(|_| StoreError::LockPoisoned("count"))?;
        Ok(state.get(collection).map_or(0, BTreeMap::len))
    }

    /// Number of attached realtime listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Deliver the current matching set to every listener selected by
    /// `targets`. Runs outside the storage lock so listeners may read (or
    /// write) the store; writes made from a listener are delivered in a
    /// later round of the same drain.
    pub(super) fn notify<I>(&self, targets: I)
    where
        I: IntoIterator<Item = Target>,
    {
        let Some(mut drain) = self.listeners.enqueue(targets) else {
            return;
        };

        while let Some(round) = drain.next_round() {
            let watching = self.listeners.watching(&round);
            if watching.is_empty() {
                continue;
            }

            let deliveries: Vec<(Listener, Vec<Document>)> = {
                let Ok(state) = self.state.read() else {
                    tracing::warn!("skipping listener delivery: store lock poisoned");
                    continue;
                };
                watching
                    .into_iter()
                    .map(|(collection, query, listener)| {
                        let docs = query.evaluate(state.get(&collection).into_iter().flat_map(|m| m.values()));
                        (listener, docs)
                    })
                    .collect()
            };

            tracing::trace!(listeners = deliveries.len(), "delivering snapshots");
            for (listener, docs) in deliveries {
                listener(&docs);
            }
        }
    }

    fn single_document(
        mut results: Vec<WriteResult>,
        operation: &'static str,
    ) -> Result<Document, StoreError> {
        results
            .pop()
            .and_then(|r| r.document)
            .ok_or_else(|| StoreError::InvalidArgument(format!("{} produced no document", operation)))
    }
}

fn validate_path(collection: &str, id: Option<&str>) -> Result<(), StoreError> {
    if collection.is_empty() || collection.contains('/') {
        return Err(StoreError::InvalidArgument(format!(
            "invalid collection name `{}`",
            collection
        )));
    }
    if let Some(id) = id {
        if id.is_empty() || id.contains('/') || id == "." || id == ".." {
            return Err(StoreError::InvalidArgument(format!(
                "invalid document id `{}` in {}",
                id, collection
            )));
        }
    }
    Ok(())
}

fn check_precondition(
    precondition: Option<Precondition>,
    current: Option<&Document>,
    collection: &str,
    id: &str,
) -> Result<(), StoreError> {
    let not_found = || StoreError::NotFound {
        collection: collection.to_string(),
        id: id.to_string(),
    };
    match (precondition, current) {
        (None, _) => Ok(()),
        (Some(Precondition::Exists(true)), None) => Err(not_found()),
        (Some(Precondition::Exists(false)), Some(_)) => Err(StoreError::AlreadyExists {
            collection: collection.to_string(),
            id: id.to_string(),
        }),
        (Some(Precondition::Exists(_)), _) => Ok(()),
        (Some(Precondition::Revision(_)), None) => Err(not_found()),
        (Some(Precondition::Revision(expected)), Some(doc)) if doc.revision != expected => {
            Err(StoreError::Conflict {
                collection: collection.to_string(),
                id: id.to_string(),
                expected,
                actual: doc.revision,
            })
        }
        (Some(Precondition::Revision(_)), Some(_)) => Ok(()),
    }
}

/// Deep merge: nested objects merge, everything else overwrites.
fn merge_fields(target: &mut Fields, source: Fields) {
    for (key, value) in source {
        match value {
            Value::Object(incoming) => match target.get_mut(&key) {
                Some(Value::Object(existing)) => merge_fields(existing, incoming),
                _ => {
                    target.insert(key, Value::Object(incoming));
                }
            },
            other => {
                target.insert(key, other);
            }
        }
    }
}

/// Writes applied on top of the committed state, kept aside until the
/// whole batch has validated.
struct Staging<'a> {
    committed: &'a Collections,
    staged: BTreeMap<(String, String), Option<Document>>,
    auto_id_length: usize,
}

impl<'a> Staging<'a> {
    fn new(committed: &'a Collections, auto_id_length: usize) -> Self {
        Self {
            committed,
            staged: BTreeMap::new(),
            auto_id_length,
        }
    }

    fn current(&self, collection: &str, id: &str) -> Option<&Document> {
        match self.staged.get(&(collection.to_string(), id.to_string())) {
            Some(staged) => staged.as_ref(),
            None => self.committed.get(collection).and_then(|m| m.get(id)),
        }
    }

    fn stage(&mut self, collection: String, id: String, doc: Option<Document>) -> WriteResult {
        self.staged
            .insert((collection.clone(), id.clone()), doc.clone());
        WriteResult {
            collection,
            id,
            document: doc,
        }
    }

    fn apply(&mut self, write: Write) -> Result<WriteResult, StoreError> {
        match write {
            Write::Create {
                collection,
                id,
                fields,
            } => {
                validate_path(&collection, id.as_deref())?;
                let id = match id {
                    Some(id) => {
                        if self.current(&collection, &id).is_some() {
                            return Err(StoreError::AlreadyExists { collection, id });
                        }
                        id
                    }
                    None => loop {
                        let candidate = auto_id(self.auto_id_length);
                        if self.current(&collection, &candidate).is_none() {
                            break candidate;
                        }
                    },
                };
                let doc = Document::new(id.clone(), fields, 1);
                Ok(self.stage(collection, id, Some(doc)))
            }
            Write::Set {
                collection,
                id,
                fields,
                options,
            } => {
                validate_path(&collection, Some(&id))?;
                let doc = match self.current(&collection, &id).cloned() {
                    Some(existing) if options.merge => {
                        let mut merged = existing.fields;
                        merge_fields(&mut merged, fields);
                        Document::new(id.clone(), merged, existing.revision + 1)
                    }
                    Some(existing) => Document::new(id.clone(), fields, existing.revision + 1),
                    None => Document::new(id.clone(), fields, 1),
                };
                Ok(self.stage(collection, id, Some(doc)))
            }
            Write::Update {
                collection,
                id,
                patch,
                precondition,
            } => {
                validate_path(&collection, Some(&id))?;
                let current = self.current(&collection, &id).cloned();
                check_precondition(precondition, current.as_ref(), &collection, &id)?;
                let existing = current.ok_or_else(|| StoreError::NotFound {
                    collection: collection.clone(),
                    id: id.clone(),
                })?;
                let mut fields = existing.fields;
                for (path, value) in patch {
                    set_path(&mut fields, &path, value);
                }
                let doc = Document::new(id.clone(), fields, existing.revision + 1);
                Ok(self.stage(collection, id, Some(doc)))
            }
            Write::Delete {
                collection,
                id,
                precondition,
            } => {
                validate_path(&collection, Some(&id))?;
                let current = self.current(&collection, &id).cloned();
                check_precondition(precondition, current.as_ref(), &collection, &id)?;
                self.staged.insert((collection.clone(), id.clone()), None);
                Ok(WriteResult {
                    collection,
                    id,
                    document: current,
                })
            }
        }
    }

    fn into_staged(self) -> BTreeMap<(String, String), Option<Document>> {
        self.staged
    }
}

impl DocumentStore for InMemoryStore {
    fn get_doc(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        validate_path(collection, Some(id))?;
        let state = self
            .state
            .read()
            .map_err(|_| StoreError::LockPoisoned("get_doc"))?;
        Ok(state.get(collection).and_then(|m| m.get(id)).cloned())
    }

    fn run_query(
        &self,
        collection: &str,
        query: &StructuredQuery,
    ) -> Result<Vec<Document>, StoreError> {
        validate_path(collection, None)?;
        let state = self
            .state
            .read()
            .map_err(|_| StoreError::LockPoisoned("run_query"))?;
        let results = query.evaluate(state.get(collection).into_iter().flat_map(|m| m.values()));
        tracing::trace!(collection, matched = results.len(), "ran query");
        Ok(results)
    }

    fn add_doc(&self, collection: &str, fields: Fields) -> Result<Document, StoreError> {
        let results = self.commit(WriteBatch::new().create(collection, None, fields))?;
        Self::single_document(results, "add_doc")
    }

    fn set_doc(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
        options: SetOptions,
    ) -> Result<Document, StoreError> {
        let results = self.commit(WriteBatch::new().set(collection, id, fields, options))?;
        Self::single_document(results, "set_doc")
    }

    fn update_doc(
        &self,
        collection: &str,
        id: &str,
        patch: Fields,
    ) -> Result<Document, StoreError> {
        let results = self.commit(WriteBatch::new().update(collection, id, patch, None))?;
        Self::single_document(results, "update_doc")
    }

    fn delete_doc(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let results = self.commit(WriteBatch::new().delete(collection, id, None))?;
        Ok(results.into_iter().any(|r| r.document.is_some()))
    }

    fn commit(&self, batch: WriteBatch) -> Result<Vec<WriteResult>, StoreError> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }
        let write_count = batch.len();

        let (results, touched) = {
            let mut state = self
                .state
                .write()
                .map_err(|_| StoreError::LockPoisoned("commit"))?;

            let id_length = batch.auto_id_length().unwrap_or(self.auto_id_length).max(1);
            let mut staging = Staging::new(&state, id_length);
            let mut results = Vec::with_capacity(write_count);
            for write in batch.into_writes() {
                results.push(staging.apply(write)?);
            }
            let staged = staging.into_staged();

            let mut touched = BTreeSet::new();
            for ((collection, id), doc) in staged {
                match doc {
                    Some(doc) => {
                        state.entry(collection.clone()).or_default().insert(id, doc);
                    }
                    None => {
                        let now_empty = match state.get_mut(&collection) {
                            Some(docs) => {
                                docs.remove(&id);
                                docs.is_empty()
                            }
                            None => false,
                        };
                        if now_empty {
                            state.remove(&collection);
                        }
                    }
                }
                touched.insert(collection);
            }
            (results, touched)
        };

        tracing::debug!(writes = write_count, collections = ?touched, "committed batch");
        self.notify(touched.into_iter().map(Target::Collection));
        Ok(results)
    }

    fn listen(
        &self,
        collection: &str,
        query: StructuredQuery,
        listener: Listener,
    ) -> Result<Subscription, StoreError> {
        validate_path(collection, None)?;
        let id = self.listeners.register(collection, query, listener)?;
        self.notify([Target::Watch(id)]);

        let registry = Arc::downgrade(&self.listeners);
        Ok(Subscription::new(move || {
            if let Some(registry) = registry.upgrade() {
                registry.remove(id);
            }
        }))
    }

    fn list_collections(&self) -> Result<Vec<String>, StoreError> {
        let state = self
            .state
            .read()
            .map_err(|_| StoreError::LockPoisoned("list_collections"))?;
        Ok(state.keys().cloned().collect())
    }
}
