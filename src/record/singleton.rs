use serde_json::Value;

use super::{to_fields, Record, Records, Stored};
use crate::document::{Document, Fields, CREATED_AT, UPDATED_AT};
use crate::error::Error;
use crate::store::{DocumentStore, SetOptions, WriteBatch};

/// A content document at a fixed id, backed by a default value.
///
/// Stored fields win over the default's, so a default that grows a new
/// field still loads against an older document.
pub struct Singleton<'a, S, M> {
    records: Records<'a, S, M>,
    id: String,
    default: M,
}

impl<'a, S: DocumentStore, M: Record + Clone> Singleton<'a, S, M> {
    pub(super) fn new(records: Records<'a, S, M>, id: String, default: M) -> Self {
        Self {
            records,
            id,
            default,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current content. Writes the default first if the document is missing.
    pub fn load(&self) -> Result<M, Error> {
        let Some(doc) = self.records.client().get(M::COLLECTION, &self.id)? else {
            tracing::info!(collection = M::COLLECTION, id = %self.id, "initializing content with defaults");
            self.replace(&self.default)?;
            return Ok(self.default.clone());
        };

        let mut merged = to_fields(&self.default)?;
        merged.extend(doc.fields);
        let doc = Document::new(doc.id, merged, doc.revision);
        Ok(Stored::<M>::from_document(doc)?.data)
    }

    /// Shallow-merge `patch` over the current content and store the result.
    pub fn update(&self, patch: Fields) -> Result<M, Error> {
        let mut fields = to_fields(&self.load()?)?;
        fields.extend(patch);
        let next: M = serde_json::from_value(Value::Object(fields))?;
        self.replace(&next)?;
        Ok(next)
    }

    /// Overwrite the stored content with the default.
    pub fn reset(&self) -> Result<M, Error> {
        self.replace(&self.default)?;
        Ok(self.default.clone())
    }

    /// Replace the document with `content`, keeping its creation stamp.
    fn replace(&self, content: &M) -> Result<(), Error> {
        let client = self.records.client();
        let stamp = client.stamp();
        let created_at = client
            .get(M::COLLECTION, &self.id)?
            .and_then(|doc| doc.fields.get(CREATED_AT).cloned())
            .unwrap_or_else(|| Value::String(stamp.clone()));

        let mut fields = to_fields(content)?;
        fields.insert(CREATED_AT.to_string(), created_at);
        fields.insert(UPDATED_AT.to_string(), Value::String(stamp));
        client.commit(WriteBatch::new().set(M::COLLECTION, self.id.as_str(), fields, SetOptions::default()))?;
        Ok(())
    }
}
