//! Composable row predicates and orderings.
//!
//! ```ignore
//! let filter = Filter::eq("status", "active")
//!     .and(Filter::gt("age", 18).or(Filter::is_null("age")));
//! let order = Order::asc("name").then_desc("id");
//! ```

use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl CompareOp {
    pub(crate) fn sql(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::NotEq => "!=",
            CompareOp::Lt => "<",
            CompareOp::LtEq => "<=",
            CompareOp::Gt => ">",
            CompareOp::GtEq => ">=",
        }
    }
}

/// A boolean expression over the columns of one table.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Compare {
        column: String,
        op: CompareOp,
        value: Value,
    },
    Like(String, String),
    In(String, Vec<Value>),
    IsNull(String),
    IsNotNull(String),
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

impl Filter {
    /// Matches every row.
    pub fn all() -> Self {
        Filter::And(Vec::new())
    }

    pub fn compare(column: &str, op: CompareOp, value: impl Into<Value>) -> Self {
        Filter::Compare {
            column: column.to_string(),
            op,
            value: value.into(),
        }
    }

    /// Equality. Comparing against [`Value::Null`] renders `IS NULL`.
    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::Eq, value)
    }

    pub fn not_eq(column: &str, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::NotEq, value)
    }

    pub fn lt(column: &str, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::Lt, value)
    }

    pub fn lt_eq(column: &str, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::LtEq, value)
    }

    pub fn gt(column: &str, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::Gt, value)
    }

    pub fn gt_eq(column: &str, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::GtEq, value)
    }

    pub fn like(column: &str, pattern: &str) -> Self {
        Filter::Like(column.to_string(), pattern.to_string())
    }

    pub fn is_in<V: Into<Value>>(column: &str, values: impl IntoIterator<Item = V>) -> Self {
        Filter::In(column.to_string(), values.into_iter().map(Into::into).collect())
    }

    pub fn is_null(column: &str) -> Self {
        Filter::IsNull(column.to_string())
    }

    pub fn is_not_null(column: &str) -> Self {
        Filter::IsNotNull(column.to_string())
    }

    /// Conjunction. Nested `And`s are flattened.
    pub fn and(self, other: Filter) -> Self {
        match (self, other) {
            (Filter::And(mut left), Filter::And(right)) => {
                left.extend(right);
                Filter::And(left)
            }
            (Filter::And(mut left), other) => {
                left.push(other);
                Filter::And(left)
            }
            (this, Filter::And(mut right)) => {
                right.insert(0, this);
                Filter::And(right)
            }
            (this, other) => Filter::And(vec![this, other]),
        }
    }

    /// Disjunction. Nested `Or`s are flattened.
    pub fn or(self, other: Filter) -> Self {
        match (self, other) {
            (Filter::Or(mut left), Filter::Or(right)) => {
                left.extend(right);
                Filter::Or(left)
            }
            (Filter::Or(mut left), other) => {
                left.push(other);
                Filter::Or(left)
            }
            (this, other) => Filter::Or(vec![this, other]),
        }
    }

    /// True for filters that match every row and can be left out of a `WHERE`.
    pub fn is_trivial(&self) -> bool {
        match self {
            Filter::And(items) => items.iter().all(Filter::is_trivial),
            _ => false,
        }
    }
}

impl std::ops::Not for Filter {
    type Output = Filter;

    fn not(self) -> Filter {
        match self {
            Filter::Not(inner) => *inner,
            other => Filter::Not(Box::new(other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// An ordered list of sort keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Order {
    keys: Vec<(String, Direction)>,
}

impl Order {
    /// No ordering; rows come back in database order.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn asc(column: &str) -> Self {
        Self::none().then_asc(column)
    }

    pub fn desc(column: &str) -> Self {
        Self::none().then_desc(column)
    }

    pub fn then_asc(mut self, column: &str) -> Self {
        self.keys.push((column.to_string(), Direction::Asc));
        self
    }

    pub fn then_desc(mut self, column: &str) -> Self {
        self.keys.push((column.to_string(), Direction::Desc));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> &[(String, Direction)] {
        &self.keys
    }
}
