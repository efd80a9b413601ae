//! Structured queries - the store-native form a builder chain compiles to.
//!
//! Predicates are a tagged union checked before execution; a query is a
//! conjunction of predicates plus optional ordering and a result cap.

mod filter;

use std::cmp::Ordering;

use crate::document::{compare_values, Document};

pub use filter::{CompareOp, Filter};

/// Sort direction for an order instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

impl Direction {
    pub fn from_ascending(ascending: bool) -> Self {
        if ascending {
            Direction::Ascending
        } else {
            Direction::Descending
        }
    }

    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Direction::Ascending => ordering,
            Direction::Descending => ordering.reverse(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// A conjunction of filters with optional ordering and limit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructuredQuery {
    pub filters: Vec<Filter>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<usize>,
}

impl StructuredQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filters(filters: Vec<Filter>) -> Self {
        Self {
            filters,
            ..Self::default()
        }
    }

    /// True when every filter holds and every ordered field is present.
    pub fn matches(&self, doc: &Document) -> bool {
        self.filters.iter().all(|f| f.matches(doc))
            && self.order_by.iter().all(|o| doc.field(&o.field).is_some())
    }

    /// Run the query over an id-ordered document iterator.
    ///
    /// Documents without an ordered field are left out. Ties fall back to the
    /// document id in the direction of the last order instruction.
    pub fn evaluate<'a, I>(&self, docs: I) -> Vec<Document>
    where
        I: IntoIterator<Item = &'a Document>,
    {
        let mut results: Vec<Document> = docs
            .into_iter()
            .filter(|doc| self.matches(doc))
            .cloned()
            .collect();

        if !self.order_by.is_empty() {
            let tie_break = self
                .order_by
                .last()
                .map(|o| o.direction)
                .unwrap_or_default();
            results.sort_by(|a, b| {
                for order in &self.order_by {
                    let ordering = match (a.field(&order.field), b.field(&order.field)) {
                        (Some(x), Some(y)) => compare_values(&x, &y),
                        _ => Ordering::Equal,
                    };
                    if ordering != Ordering::Equal {
                        return order.direction.apply(ordering);
                    }
                }
                tie_break.apply(a.id.cmp(&b.id))
            });
        }

        if let Some(limit) = self.limit {
            results.truncate(limit);
        }

        results
    }
}
