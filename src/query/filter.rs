use serde_json::Value;

use crate::document::{compare_values, same_type_class, values_equal, Document};
use crate::error::Error;

/// Upper sentinel for prefix ranges: sorts after every common code point.
const PREFIX_SENTINEL: char = '\u{f8ff}';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CompareOp {
    pub fn as_str(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Neq => "!=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
        }
    }

    fn is_range(self) -> bool {
        matches!(
            self,
            CompareOp::Gt | CompareOp::Gte | CompareOp::Lt | CompareOp::Lte
        )
    }
}

/// One predicate over a document field.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Equality, inequality or range comparison.
    Compare {
        field: String,
        op: CompareOp,
        value: Value,
    },
    /// Field equals one of `values`.
    In { field: String, values: Vec<Value> },
    /// Array field holds `value`.
    ArrayContains { field: String, value: Value },
    /// Array field holds at least one of `values`.
    ArrayContainsAny { field: String, values: Vec<Value> },
}

impl Filter {
    pub fn compare(field: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Self {
        Filter::Compare {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    /// Two range predicates approximating `field LIKE pattern`.
    ///
    /// Every `%` is stripped and the remainder is treated as a prefix, so
    /// only trailing-wildcard patterns behave as written. `_` is literal.
    ///
    /// The upper bound is the prefix followed by U+F8FF. A value whose next
    /// character after the prefix sorts above U+F8FF (fullwidth forms,
    /// emoji and other supplementary-plane characters) falls outside the
    /// range and is not matched.
    pub fn prefix_range(field: impl Into<String>, pattern: &str) -> [Filter; 2] {
        let field = field.into();
        let prefix: String = pattern.chars().filter(|c| *c != '%').collect();
        let mut upper = prefix.clone();
        upper.push(PREFIX_SENTINEL);
        [
            Filter::compare(field.clone(), CompareOp::Gte, prefix),
            Filter::compare(field, CompareOp::Lte, upper),
        ]
    }

    pub fn field(&self) -> &str {
        match self {
            Filter::Compare { field, .. }
            | Filter::In { field, .. }
            | Filter::ArrayContains { field, .. }
            | Filter::ArrayContainsAny { field, .. } => field,
        }
    }

    /// Reject predicates the store cannot run.
    pub fn check(&self, max_in_values: usize) -> Result<(), Error> {
        if self.field().is_empty() {
            return Err(Error::predicate(self.field(), "field name must not be empty"));
        }
        match self {
            Filter::In { values, .. } | Filter::ArrayContainsAny { values, .. } => {
                if values.is_empty() {
                    return Err(Error::predicate(
                        self.field(),
                        "membership list must not be empty",
                    ));
                }
                if values.len() > max_in_values {
                    return Err(Error::predicate(
                        self.field(),
                        format!(
                            "membership list has {} values, the limit is {}",
                            values.len(),
                            max_in_values
                        ),
                    ));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Evaluate against a document. A missing field never matches.
    pub fn matches(&self, doc: &Document) -> bool {
        let Some(stored) = doc.field(self.field()) else {
            return false;
        };
        let stored = stored.as_ref();

        match self {
            Filter::Compare { op, value, .. } => {
                if op.is_range() && !same_type_class(stored, value) {
                    return false;
                }
                let ordering = compare_values(stored, value);
                match op {
                    CompareOp::Eq => ordering.is_eq(),
                    CompareOp::Neq => ordering.is_ne(),
                    CompareOp::Gt => ordering.is_gt(),
                    CompareOp::Gte => ordering.is_ge(),
                    CompareOp::Lt => ordering.is_lt(),
                    CompareOp::Lte => ordering.is_le(),
                }
            }
            Filter::In { values, .. } => values.iter().any(|v| values_equal(stored, v)),
            Filter::ArrayContains { value, .. } => stored
                .as_array()
                .is_some_and(|items| items.iter().any(|item| values_equal(item, value))),
            Filter::ArrayContainsAny { values, .. } => stored.as_array().is_some_and(|items| {
                items
                    .iter()
                    .any(|item| values.iter().any(|v| values_equal(item, v)))
            }),
        }
    }
}
