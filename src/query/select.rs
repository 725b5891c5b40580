//! SELECT descriptor builder.
//!
//! Mirrors the chainable query-building surface (`from`, `one`, `columns`,
//! `filter`, `matching`, `order_by`, `limit`) while producing an immutable
//! descriptor the compiler can validate against the model.

use super::{Limit, Predicate, SortOrder};
use sea_query::Value;

/// SELECT descriptor.
///
/// # Examples
///
/// ```
/// use sluice::Select;
///
/// // All beers, first page of 10
/// let q = Select::from("Beers").limit(10);
///
/// // A single beer by name, projecting two columns
/// let q = Select::one("Beers")
///     .columns(["ID", "name"])
///     .matching([("name", "Lagerbier Hell")]);
/// ```
#[derive(Debug, Clone)]
pub struct Select {
    entity: String,
    columns: Option<Vec<String>>,
    filter: Option<Predicate>,
    order: Vec<(String, SortOrder)>,
    limit: Option<Limit>,
    single_row: bool,
}

impl Select {
    /// Select rows from an entity
    pub fn from(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            columns: None,
            filter: None,
            order: Vec::new(),
            limit: None,
            single_row: false,
        }
    }

    /// Select a single row from an entity.
    ///
    /// Forces an implicit `LIMIT 1`; the execution result is a single record
    /// or an absent marker, never an error for zero matches.
    pub fn one(entity: impl Into<String>) -> Self {
        let mut select = Self::from(entity);
        select.single_row = true;
        select
    }

    /// Project exactly these columns (positive-only projection)
    pub fn columns<C: Into<String>>(mut self, columns: impl IntoIterator<Item = C>) -> Self {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Add a filter predicate; repeated calls conjoin
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(predicate),
            None => predicate,
        });
        self
    }

    /// Mapping-style filter: conjoined equality predicates in the pairs'
    /// declaration order
    pub fn matching<C, V>(self, pairs: impl IntoIterator<Item = (C, V)>) -> Self
    where
        C: Into<String>,
        V: Into<Value>,
    {
        match Predicate::all_eq(pairs) {
            Some(predicate) => self.filter(predicate),
            None => self,
        }
    }

    /// Append an ORDER BY term
    pub fn order_by(mut self, column: impl Into<String>, order: SortOrder) -> Self {
        self.order.push((column.into(), order));
        self
    }

    /// Bound the result to at most `rows` rows
    pub fn limit(mut self, rows: u64) -> Self {
        let offset = self.limit.and_then(|l| l.offset);
        self.limit = Some(Limit { rows, offset });
        self
    }

    /// Skip the first `offset` rows (meaningful with `limit`)
    pub fn offset(mut self, offset: u64) -> Self {
        self.limit = Some(Limit {
            rows: self.limit.map(|l| l.rows).unwrap_or(u64::MAX),
            offset: Some(offset),
        });
        self
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn projection(&self) -> Option<&[String]> {
        self.columns.as_deref()
    }

    pub fn predicate(&self) -> Option<&Predicate> {
        self.filter.as_ref()
    }

    pub fn order(&self) -> &[(String, SortOrder)] {
        &self.order
    }

    pub fn limit_clause(&self) -> Option<Limit> {
        self.limit
    }

    pub fn is_single_row(&self) -> bool {
        self.single_row
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_sets_single_row() {
        let q = Select::one("Beers");
        assert!(q.is_single_row());
        assert_eq!(q.entity(), "Beers");
    }

    #[test]
    fn test_repeated_filters_conjoin() {
        let q = Select::from("Beers")
            .filter(Predicate::eq("name", "Test"))
            .filter(Predicate::gt("abv", 4.0f64));
        assert!(matches!(q.predicate(), Some(Predicate::And(_))));
    }

    #[test]
    fn test_limit_then_offset_keeps_rows() {
        let q = Select::from("Beers").limit(10).offset(20);
        assert_eq!(q.limit_clause(), Some(Limit { rows: 10, offset: Some(20) }));
    }

    #[test]
    fn test_matching_empty_leaves_no_filter() {
        let q = Select::from("Beers").matching(Vec::<(String, i32)>::new());
        assert!(q.predicate().is_none());
    }
}
