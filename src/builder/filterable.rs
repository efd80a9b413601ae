use serde_json::Value;

use crate::query::{CompareOp, Filter};

/// Predicate vocabulary shared by read and mutation builders.
///
/// Every method consumes the builder and returns it with one more predicate
/// appended. Predicates are ANDed and checked when the builder executes.
pub trait Filterable: Sized {
    /// Append a raw predicate.
    fn filter(self, filter: Filter) -> Self;

    fn eq(self, field: &str, value: impl Into<Value>) -> Self {
        self.filter(Filter::compare(field, CompareOp::Eq, value))
    }

    fn neq(self, field: &str, value: impl Into<Value>) -> Self {
        self.filter(Filter::compare(field, CompareOp::Neq, value))
    }

    fn gt(self, field: &str, value: impl Into<Value>) -> Self {
        self.filter(Filter::compare(field, CompareOp::Gt, value))
    }

    fn gte(self, field: &str, value: impl Into<Value>) -> Self {
        self.filter(Filter::compare(field, CompareOp::Gte, value))
    }

    fn lt(self, field: &str, value: impl Into<Value>) -> Self {
        self.filter(Filter::compare(field, CompareOp::Lt, value))
    }

    fn lte(self, field: &str, value: impl Into<Value>) -> Self {
        self.filter(Filter::compare(field, CompareOp::Lte, value))
    }

    /// Field equals one of `values`. The list must be non-empty.
    fn in_<V: Into<Value>>(self, field: &str, values: impl IntoIterator<Item = V>) -> Self {
        self.filter(Filter::In {
            field: field.to_string(),
            values: values.into_iter().map(Into::into).collect(),
        })
    }

    /// Array field holds `value`.
    fn contains(self, field: &str, value: impl Into<Value>) -> Self {
        self.filter(Filter::ArrayContains {
            field: field.to_string(),
            value: value.into(),
        })
    }

    /// Array field holds at least one of `values`.
    fn overlaps<V: Into<Value>>(self, field: &str, values: impl IntoIterator<Item = V>) -> Self {
        self.filter(Filter::ArrayContainsAny {
            field: field.to_string(),
            values: values.into_iter().map(Into::into).collect(),
        })
    }

    /// Prefix match emulated with two range predicates. Only trailing
    /// wildcards (`"abc%"`) behave as written; see [`Filter::prefix_range`].
    fn like(self, field: &str, pattern: &str) -> Self {
        let [low, high] = Filter::prefix_range(field, pattern);
        self.filter(low).filter(high)
    }

    /// Same as [`like`](Filterable::like): the store has no case folding.
    fn ilike(self, field: &str, pattern: &str) -> Self {
        self.like(field, pattern)
    }

    fn text_search(self, field: &str, query: &str) -> Self {
        self.like(field, query)
    }

    /// Not supported: logs a warning and leaves the builder unchanged.
    fn or(self, filters: &str) -> Self {
        tracing::warn!(filters, "or() is not supported, predicates stay ANDed");
        self
    }
}
