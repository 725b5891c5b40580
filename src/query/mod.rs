//! Query descriptors: the structured algebra the compiler consumes.
//!
//! Descriptors are explicit tagged variants constructed through builders with
//! compile-time-checked required fields, with no runtime shape-checking of
//! duck-typed objects. A descriptor carries entity *names*; resolution against
//! the model registry happens at compile time, where unknown names become
//! typed failures.

use crate::record::Record;
use sea_query::Value;

pub mod insert;
pub mod mutate;
pub mod select;

#[doc(inline)]
pub use insert::Insert;
#[doc(inline)]
pub use mutate::{Delete, Update};
#[doc(inline)]
pub use select::Select;

/// One data operation, ready for compilation
#[derive(Debug, Clone)]
pub enum QueryDescriptor {
    Select(Select),
    Insert(Insert),
    Update(Update),
    Delete(Delete),
}

impl From<Select> for QueryDescriptor {
    fn from(value: Select) -> Self {
        QueryDescriptor::Select(value)
    }
}

impl From<Insert> for QueryDescriptor {
    fn from(value: Insert) -> Self {
        QueryDescriptor::Insert(value)
    }
}

impl From<Update> for QueryDescriptor {
    fn from(value: Update) -> Self {
        QueryDescriptor::Update(value)
    }
}

impl From<Delete> for QueryDescriptor {
    fn from(value: Delete) -> Self {
        QueryDescriptor::Delete(value)
    }
}

impl QueryDescriptor {
    /// Entity name the descriptor targets
    pub fn entity(&self) -> &str {
        match self {
            QueryDescriptor::Select(q) => q.entity(),
            QueryDescriptor::Insert(q) => q.entity(),
            QueryDescriptor::Update(q) => q.entity(),
            QueryDescriptor::Delete(q) => q.entity(),
        }
    }
}

/// Comparison operators available on predicate leaves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Filter tree: comparison leaves conjoined by AND nodes.
///
/// Leaves bind a column to a literal; literals always become positional bind
/// parameters, never interpolated text.
///
/// # Examples
///
/// ```
/// use sluice::Predicate;
///
/// let filter = Predicate::eq("name", "Test2").and(Predicate::gt("abv", 4.0f64));
/// ```
#[derive(Debug, Clone)]
pub enum Predicate {
    /// `column <op> literal`
    Compare {
        column: String,
        op: CompareOp,
        value: Value,
    },
    /// Conjunction of child predicates, in order
    And(Vec<Predicate>),
}

impl Predicate {
    /// `column = value`
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::cmp(column, CompareOp::Eq, value)
    }

    /// `column <> value`
    pub fn ne(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::cmp(column, CompareOp::Ne, value)
    }

    /// `column < value`
    pub fn lt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::cmp(column, CompareOp::Lt, value)
    }

    /// `column <= value`
    pub fn le(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::cmp(column, CompareOp::Le, value)
    }

    /// `column > value`
    pub fn gt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::cmp(column, CompareOp::Gt, value)
    }

    /// `column >= value`
    pub fn ge(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::cmp(column, CompareOp::Ge, value)
    }

    /// Leaf with an explicit operator
    pub fn cmp(column: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Self {
        Predicate::Compare {
            column: column.into(),
            op,
            value: value.into(),
        }
    }

    /// Conjoin with another predicate, flattening AND chains
    pub fn and(self, other: Predicate) -> Self {
        match self {
            Predicate::And(mut children) => {
                children.push(other);
                Predicate::And(children)
            }
            leaf => Predicate::And(vec![leaf, other]),
        }
    }

    /// Conjoined equality predicates from (column, value) pairs, in the pairs'
    /// declaration order: the mapping-style `where {col: val, ...}` form.
    pub fn all_eq<C, V>(pairs: impl IntoIterator<Item = (C, V)>) -> Option<Self>
    where
        C: Into<String>,
        V: Into<Value>,
    {
        let mut leaves: Vec<Predicate> = pairs
            .into_iter()
            .map(|(column, value)| Predicate::eq(column, value))
            .collect();
        match leaves.len() {
            0 => None,
            1 => leaves.pop(),
            _ => Some(Predicate::And(leaves)),
        }
    }

    /// Equality pairs from a record, in record order
    pub fn from_record(record: &Record) -> Option<Self> {
        Predicate::all_eq(record.iter().map(|(c, v)| (c.to_string(), v.clone())))
    }
}

/// Sort direction for an ORDER BY term
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Row-count bound with optional offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit {
    pub rows: u64,
    pub offset: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_and_flattens() {
        let p = Predicate::eq("a", 1i32)
            .and(Predicate::eq("b", 2i32))
            .and(Predicate::eq("c", 3i32));
        match p {
            Predicate::And(children) => assert_eq!(children.len(), 3),
            other => panic!("expected And node, got {other:?}"),
        }
    }

    #[test]
    fn test_all_eq_single_pair_is_leaf() {
        let p = Predicate::all_eq([("name", "Test2")]).unwrap();
        assert!(matches!(p, Predicate::Compare { op: CompareOp::Eq, .. }));
    }

    #[test]
    fn test_all_eq_empty_is_none() {
        assert!(Predicate::all_eq(Vec::<(String, i32)>::new()).is_none());
    }

    #[test]
    fn test_descriptor_entity_name() {
        let descriptor: QueryDescriptor = Select::from("Beers").into();
        assert_eq!(descriptor.entity(), "Beers");
    }
}
