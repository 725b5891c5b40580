//! UPDATE and DELETE descriptor builders.

use super::Predicate;
use crate::record::Record;
use sea_query::Value;

/// UPDATE descriptor.
///
/// # Examples
///
/// ```
/// use sluice::{Predicate, Update};
///
/// let q = Update::table("Beers")
///     .set("name", "Renamed")
///     .filter(Predicate::eq("name", "Test"));
/// ```
#[derive(Debug, Clone)]
pub struct Update {
    entity: String,
    values: Record,
    filter: Option<Predicate>,
}

impl Update {
    /// Update rows of an entity
    pub fn table(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            values: Record::new(),
            filter: None,
        }
    }

    /// Set one column to a new value
    pub fn set(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.set(column, value);
        self
    }

    /// Set all columns carried by a record
    pub fn data(mut self, record: Record) -> Self {
        for (column, value) in record.iter() {
            self.values.set(column, value.clone());
        }
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

    /// Mapping-style filter: conjoined equality predicates in pair order
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

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn values(&self) -> &Record {
        &self.values
    }

    pub fn predicate(&self) -> Option<&Predicate> {
        self.filter.as_ref()
    }
}

/// DELETE descriptor.
///
/// # Examples
///
/// ```
/// use sluice::{Delete, Predicate};
///
/// let q = Delete::from("Beers").filter(Predicate::eq("name", "Test"));
/// ```
#[derive(Debug, Clone)]
pub struct Delete {
    entity: String,
    filter: Option<Predicate>,
}

impl Delete {
    /// Delete rows from an entity
    pub fn from(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            filter: None,
        }
    }

    /// Add a filter predicate; repeated calls conjoin
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(predicate),
            None => predicate,
        });
        self
    }

    /// Mapping-style filter: conjoined equality predicates in pair order
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

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn predicate(&self) -> Option<&Predicate> {
        self.filter.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_collects_values_in_order() {
        let q = Update::table("Beers").set("name", "Renamed").set("abv", 5.0f64);
        let columns: Vec<_> = q.values().columns().collect();
        assert_eq!(columns, vec!["name", "abv"]);
    }

    #[test]
    fn test_delete_filters_conjoin() {
        let q = Delete::from("Beers")
            .filter(Predicate::eq("name", "Test"))
            .filter(Predicate::lt("abv", 3.0f64));
        assert!(matches!(q.predicate(), Some(Predicate::And(_))));
    }
}
