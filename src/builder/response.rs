use std::slice;

use crate::document::Document;
use crate::error::Error;

/// Payload of a successful execution.
#[derive(Debug, Clone, PartialEq)]
pub enum Data {
    Rows(Vec<Document>),
    /// Produced by `single()` / `maybe_single()`.
    Row(Document),
}

impl Data {
    pub fn len(&self) -> usize {
        match self {
            Data::Rows(rows) => rows.len(),
            Data::Row(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_vec(self) -> Vec<Document> {
        match self {
            Data::Rows(rows) => rows,
            Data::Row(row) => vec![row],
        }
    }
}

/// The `{ data, error }` envelope. At most one half is set; both are None
/// when `single()` matched nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub data: Option<Data>,
    pub error: Option<Error>,
}

impl Response {
    pub(crate) fn ok(data: Option<Data>) -> Self {
        Self { data, error: None }
    }

    pub(crate) fn err(error: Error) -> Self {
        Self {
            data: None,
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Returned documents as a slice; empty on error or no match.
    pub fn rows(&self) -> &[Document] {
        match &self.data {
            Some(Data::Rows(rows)) => rows,
            Some(Data::Row(row)) => slice::from_ref(row),
            None => &[],
        }
    }

    /// The single returned document, or the first row.
    pub fn row(&self) -> Option<&Document> {
        self.rows().first()
    }

    pub fn into_rows(self) -> Vec<Document> {
        self.data.map(Data::into_vec).unwrap_or_default()
    }

    pub fn into_result(self) -> Result<Option<Data>, Error> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.data),
        }
    }
}
