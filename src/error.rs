use thiserror::Error;

use crate::store::StoreError;

/// Everything a builder, client or typed accessor can report.
///
/// Builders never return this directly: it travels in the `error` half of a
/// [`Response`](crate::Response).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("invalid predicate on `{field}`: {reason}")]
    Predicate { field: String, reason: String },

    #[error("refusing to {operation} every record in `{collection}` without an explicit all() scope")]
    UnscopedMutation {
        collection: String,
        operation: &'static str,
    },

    #[error("batch of {count} writes exceeds the limit of {max}")]
    BatchTooLarge { count: usize, max: usize },

    #[error("invalid record payload: {0}")]
    Payload(String),

    #[error("record serialization error: {0}")]
    Serde(String),

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl Error {
    pub(crate) fn predicate(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Predicate {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serde(err.to_string())
    }
}
