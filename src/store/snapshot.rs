//! Binary export/import of an [`InMemoryStore`].
//!
//! The snapshot is bitcode-encoded; document fields travel as JSON bytes
//! because bitcode cannot describe self-describing JSON values.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::watch::Target;
use super::{InMemoryStore, StoreError};
use crate::document::{Document, Fields};

const SNAPSHOT_FORMAT: u32 = 1;

#[derive(Serialize, Deserialize)]
struct SnapshotEntry {
    collection: String,
    id: String,
    revision: u64,
    fields: Vec<u8>,
}

#[derive(Serialize, Deserialize)]
struct Snapshot {
    format: u32,
    entries: Vec<SnapshotEntry>,
}

impl InMemoryStore {
    /// Encode every document (with its revision) into a byte snapshot.
    pub fn export_snapshot(&self) -> Result<Vec<u8>, StoreError> {
        let state = self
            .state
            .read()
            .map_err(|_| StoreError::LockPoisoned("export_snapshot"))?;

        let mut entries = Vec::new();
        for (collection, docs) in state.iter() {
            for doc in docs.values() {
                let fields = serde_json::to_vec(&doc.fields)
                    .map_err(|e| StoreError::Snapshot(format!("encode {}/{}: {e}", collection, doc.id)))?;
                entries.push(SnapshotEntry {
                    collection: collection.clone(),
                    id: doc.id.clone(),
                    revision: doc.revision,
                    fields,
                });
            }
        }

        let count = entries.len();
        let bytes = bitcode::serialize(&Snapshot {
            format: SNAPSHOT_FORMAT,
            entries,
        })
        .map_err(|e| StoreError::Snapshot(format!("serialize: {e}")))?;
        tracing::debug!(documents = count, bytes = bytes.len(), "exported snapshot");
        Ok(bytes)
    }

    /// Replace the whole store with a snapshot. Returns the document count.
    ///
    /// Listeners on every collection present before or after the import are
    /// notified.
    pub fn import_snapshot(&self, bytes: &[u8]) -> Result<usize, StoreError> {
        let snapshot: Snapshot = bitcode::deserialize(bytes)
            .map_err(|e| StoreError::Snapshot(format!("deserialize: {e}")))?;
        if snapshot.format != SNAPSHOT_FORMAT {
            return Err(StoreError::Snapshot(format!(
                "unsupported snapshot format {}",
                snapshot.format
            )));
        }

        let mut imported: BTreeMap<String, BTreeMap<String, Document>> = BTreeMap::new();
        for entry in snapshot.entries {
            let fields: Fields = serde_json::from_slice(&entry.fields).map_err(|e| {
                StoreError::Snapshot(format!("decode {}/{}: {e}", entry.collection, entry.id))
            })?;
            imported
                .entry(entry.collection)
                .or_default()
                .insert(entry.id.clone(), Document::new(entry.id, fields, entry.revision));
        }
        let count = imported.values().map(BTreeMap::len).sum();

        let touched: BTreeSet<String> = {
            let mut state = self
                .state
                .write()
                .map_err(|_| StoreError::LockPoisoned("import_snapshot"))?;
            let touched = state.keys().chain(imported.keys()).cloned().collect();
            *state = imported;
            touched
        };

        tracing::debug!(documents = count, "imported snapshot");
        self.notify(touched.into_iter().map(Target::Collection));
        Ok(count)
    }
}
