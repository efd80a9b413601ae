//! Documents - the opaque key-value records held in a collection.
//!
//! A [`Document`] is an id plus a flat-or-nested JSON object. Field paths are
//! dotted (`"pricing.adult"`) and the path `"id"` always resolves to the
//! document id, so predicates and ordering can target it like any other field.

mod value;

use std::borrow::Cow;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

pub use value::{compare_values, same_type_class, values_equal};

/// Field map of a document.
pub type Fields = Map<String, Value>;

/// Reserved field that resolves to the document id.
pub const ID_FIELD: &str = "id";
/// Creation instant, stamped by the client.
pub const CREATED_AT: &str = "created_at";
/// Last-write instant, stamped by the client on every mutation.
pub const UPDATED_AT: &str = "updated_at";

/// One record inside a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
    /// Store metadata: 1 on creation, +1 on every write. Used for
    /// write preconditions, never serialized.
    pub revision: u64,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Fields, revision: u64) -> Self {
        Self {
            id: id.into(),
            fields,
            revision,
        }
    }

    /// Resolve a dotted field path. `"id"` yields the document id.
    pub fn field(&self, path: &str) -> Option<Cow<'_, Value>> {
        if path == ID_FIELD {
            return Some(Cow::Owned(Value::String(self.id.clone())));
        }
        get_path(&self.fields, path).map(Cow::Borrowed)
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp(CREATED_AT)
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp(UPDATED_AT)
    }

    fn timestamp(&self, field: &str) -> Option<DateTime<Utc>> {
        self.fields
            .get(field)
            .and_then(Value::as_str)
            .and_then(parse_timestamp)
    }

    /// The flat `{ "id": .., ...fields }` object.
    pub fn to_value(&self) -> Value {
        let mut object = Map::with_capacity(self.fields.len() + 1);
        object.insert(ID_FIELD.to_string(), Value::String(self.id.clone()));
        for (key, value) in &self.fields {
            if key != ID_FIELD {
                object.insert(key.clone(), value.clone());
            }
        }
        Value::Object(object)
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 1))?;
        map.serialize_entry(ID_FIELD, &self.id)?;
        for (key, value) in &self.fields {
            if key != ID_FIELD {
                map.serialize_entry(key, value)?;
            }
        }
        map.end()
    }
}

/// Walk a dotted path through nested objects.
pub fn get_path<'a>(fields: &'a Fields, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = fields.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Write `value` at a dotted path, creating (or replacing non-object)
/// intermediate levels as needed.
pub fn set_path(fields: &mut Fields, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            fields.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let entry = fields
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(inner) = entry {
                set_path(inner, rest, value);
            }
        }
    }
}

/// Fixed-width RFC 3339 (microseconds, `Z`), so lexical order is time order.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|at| at.with_timezone(&Utc))
}

/// Coerce a JSON value into a field map. Non-objects are rejected.
pub fn into_fields(value: Value) -> Option<Fields> {
    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}
