//! INSERT descriptor builder.
//!
//! The three input forms (`entries`, `columns` + `rows`, `columns` + `values`)
//! all normalize to a sequence of entry records before key/default resolution,
//! so generated keys behave identically regardless of the form used.

use crate::error::SluiceError;
use crate::record::Record;
use sea_query::Value;

/// INSERT descriptor.
///
/// # Examples
///
/// ```
/// use sluice::{Insert, Record};
/// use serde_json::json;
///
/// let entries = vec![
///     Record::from_json(json!({ "name": "Test" })).unwrap(),
///     Record::from_json(json!({ "name": "Test2" })).unwrap(),
/// ];
/// let q = Insert::into("Beers").entries(entries);
///
/// // Equivalent columns + rows form
/// let q = Insert::into("Beers").columns(["name"]).rows(vec![
///     vec!["Bear 1".into()],
///     vec!["Bear 2".into()],
/// ]);
/// ```
#[derive(Debug, Clone)]
pub struct Insert {
    entity: String,
    entries: Vec<Record>,
    columns: Option<Vec<String>>,
    rows: Vec<Vec<Value>>,
}

impl Insert {
    /// Insert into an entity
    pub fn into(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            entries: Vec::new(),
            columns: None,
            rows: Vec::new(),
        }
    }

    /// Provide entry records (column→value mappings), one per row
    pub fn entries(mut self, entries: impl IntoIterator<Item = Record>) -> Self {
        self.entries.extend(entries);
        self
    }

    /// Provide one entry record
    pub fn entry(mut self, entry: Record) -> Self {
        self.entries.push(entry);
        self
    }

    /// Name the columns for the `rows`/`values` forms
    pub fn columns<C: Into<String>>(mut self, columns: impl IntoIterator<Item = C>) -> Self {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Provide positional rows matching the named columns
    pub fn rows(mut self, rows: impl IntoIterator<Item = Vec<Value>>) -> Self {
        self.rows.extend(rows);
        self
    }

    /// Provide a single positional row matching the named columns
    pub fn values<V: Into<Value>>(mut self, values: impl IntoIterator<Item = V>) -> Self {
        self.rows.push(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Normalize all input forms into entry records.
    ///
    /// Positional rows are zipped with the named columns; entry records pass
    /// through unchanged, after the explicit column list (when present) filters
    /// them.
    ///
    /// # Errors
    ///
    /// Returns [`SluiceError::InvalidDescriptor`] when positional rows are
    /// supplied without a column list, or a row's arity differs from it.
    pub fn normalized_entries(&self) -> Result<Vec<Record>, SluiceError> {
        let mut entries = Vec::with_capacity(self.entries.len() + self.rows.len());
        for entry in &self.entries {
            match &self.columns {
                // An explicit column list restricts entry columns to it.
                Some(columns) => {
                    let mut filtered = Record::new();
                    for (column, value) in entry.iter() {
                        if columns.iter().any(|c| c == column) {
                            filtered.set(column, value.clone());
                        }
                    }
                    entries.push(filtered);
                }
                None => entries.push(entry.clone()),
            }
        }
        if !self.rows.is_empty() {
            let Some(columns) = &self.columns else {
                return Err(SluiceError::InvalidDescriptor {
                    detail: format!(
                        "INSERT into {} supplies positional rows without a column list",
                        self.entity
                    ),
                });
            };
            for row in &self.rows {
                if row.len() != columns.len() {
                    return Err(SluiceError::InvalidDescriptor {
                        detail: format!(
                            "INSERT into {} row arity {} does not match column list arity {}",
                            self.entity,
                            row.len(),
                            columns.len()
                        ),
                    });
                }
                let mut entry = Record::new();
                for (column, value) in columns.iter().zip(row.iter()) {
                    entry.set(column.clone(), value.clone());
                }
                entries.push(entry);
            }
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entries_pass_through() {
        let q = Insert::into("Beers").entries(vec![
            Record::from_json(json!({ "name": "Test" })).unwrap(),
            Record::from_json(json!({ "name": "Test2" })).unwrap(),
        ]);
        let entries = q.normalized_entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].get("name"), Some(&Value::String(Some("Test2".to_string()))));
    }

    #[test]
    fn test_rows_zip_with_columns() {
        let q = Insert::into("Beers").columns(["name"]).rows(vec![
            vec!["Bear 1".into()],
            vec!["Bear 2".into()],
            vec!["Bear 3".into()],
        ]);
        let entries = q.normalized_entries().unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[2].get("name"), Some(&Value::String(Some("Bear 3".to_string()))));
    }

    #[test]
    fn test_values_single_row() {
        let q = Insert::into("Beers").columns(["name"]).values(["Test"]);
        let entries = q.normalized_entries().unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_arity_mismatch_rejected() {
        let q = Insert::into("Beers")
            .columns(["name", "abv"])
            .rows(vec![vec!["Test".into()]]);
        assert!(matches!(
            q.normalized_entries(),
            Err(SluiceError::InvalidDescriptor { .. })
        ));
    }

    #[test]
    fn test_rows_without_columns_rejected() {
        let q = Insert::into("Beers").rows(vec![vec!["Test".into()]]);
        assert!(matches!(
            q.normalized_entries(),
            Err(SluiceError::InvalidDescriptor { .. })
        ));
    }

    #[test]
    fn test_column_list_filters_entries() {
        let mut entry = Record::new();
        entry.set("name", "Test").set("abv", 5.0f64);
        let q = Insert::into("Beers").columns(["name"]).entry(entry);
        let entries = q.normalized_entries().unwrap();
        assert!(entries[0].contains("name"));
        assert!(!entries[0].contains("abv"));
    }
}
