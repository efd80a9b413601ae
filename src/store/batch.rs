//! WriteBatch - chain writes for one atomic commit.
//!
//! ```ignore
//! let results = store.commit(
//!     WriteBatch::new()
//!         .create("bookings", None, fields)
//!         .update("tours", "t-1", patch, Some(Precondition::Revision(3)))
//!         .delete("drafts", "d-9", None),
//! )?;
//! ```

use crate::document::{Document, Fields};

/// Condition a target document must satisfy for the batch to commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    /// Document must (or must not) exist.
    Exists(bool),
    /// Document must exist at exactly this revision.
    Revision(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SetOptions {
    /// Merge into the existing document instead of replacing it.
    pub merge: bool,
}

impl SetOptions {
    pub fn merge() -> Self {
        Self { merge: true }
    }
}

/// One queued write.
#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    /// Create a document; `id: None` asks the store for an auto-id.
    /// Fails if the id is already taken.
    Create {
        collection: String,
        id: Option<String>,
        fields: Fields,
    },
    Set {
        collection: String,
        id: String,
        fields: Fields,
        options: SetOptions,
    },
    Update {
        collection: String,
        id: String,
        patch: Fields,
        precondition: Option<Precondition>,
    },
    Delete {
        collection: String,
        id: String,
        precondition: Option<Precondition>,
    },
}

impl Write {
    pub fn collection(&self) -> &str {
        match self {
            Write::Create { collection, .. }
            | Write::Set { collection, .. }
            | Write::Update { collection, .. }
            | Write::Delete { collection, .. } => collection,
        }
    }
}

/// Outcome of one write. For deletes, `document` is the removed document
/// (None when there was nothing to delete).
#[derive(Debug, Clone, PartialEq)]
pub struct WriteResult {
    pub collection: String,
    pub id: String,
    pub document: Option<Document>,
}

/// Builder for chaining writes into a single atomic commit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    writes: Vec<Write>,
    auto_id_length: Option<usize>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, write: Write) -> Self {
        self.writes.push(write);
        self
    }

    pub fn create(self, collection: impl Into<String>, id: Option<String>, fields: Fields) -> Self {
        self.push(Write::Create {
            collection: collection.into(),
            id,
            fields,
        })
    }

    pub fn set(
        self,
        collection: impl Into<String>,
        id: impl Into<String>,
        fields: Fields,
        options: SetOptions,
    ) -> Self {
        self.push(Write::Set {
            collection: collection.into(),
            id: id.into(),
            fields,
            options,
        })
    }

    pub fn update(
        self,
        collection: impl Into<String>,
        id: impl Into<String>,
        patch: Fields,
        precondition: Option<Precondition>,
    ) -> Self {
        self.push(Write::Update {
            collection: collection.into(),
            id: id.into(),
            patch,
            precondition,
        })
    }

    pub fn delete(
        self,
        collection: impl Into<String>,
        id: impl Into<String>,
        precondition: Option<Precondition>,
    ) -> Self {
        self.push(Write::Delete {
            collection: collection.into(),
            id: id.into(),
            precondition,
        })
    }

    /// Length of ids generated for `Create` writes without an id. Stores
    /// fall back to their own default when unset.
    pub fn with_auto_id_length(mut self, length: usize) -> Self {
        self.auto_id_length = Some(length);
        self
    }

    pub fn auto_id_length(&self) -> Option<usize> {
        self.auto_id_length
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn writes(&self) -> &[Write] {
        &self.writes
    }

    pub fn into_writes(self) -> Vec<Write> {
        self.writes
    }
}
