//! Entity-shaped records.
//!
//! A [`Record`] is an ordered mapping from column name to [`sea_query::Value`].
//! It is the shape of both read results (one record per returned row) and
//! insert entries (one record per row to write). Order is preserved because
//! the compiler derives statement column lists from it.

use crate::error::SluiceError;
use sea_query::Value;

/// Ordered column→value mapping.
///
/// Insertion order is preserved; setting an existing column replaces its value
/// in place. Values use `sea_query::Value`, so anything the dialect can bind
/// (strings, integers, UUIDs, timestamps, JSON, ...) fits.
///
/// # Examples
///
/// ```
/// use sluice::Record;
///
/// let mut entry = Record::new();
/// entry.set("name", "Lagerbier Hell");
/// entry.set("abv", 4.9f64);
/// assert_eq!(entry.columns().collect::<Vec<_>>(), vec!["name", "abv"]);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    /// Create an empty record
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Set a column value, preserving first-insertion order
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        let column = column.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(name, _)| *name == column) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((column, value)),
        }
        self
    }

    /// Get a column value, if present
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Whether the record carries a value for `column`
    pub fn contains(&self, column: &str) -> bool {
        self.fields.iter().any(|(name, _)| name == column)
    }

    /// Column names in insertion order
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// (column, value) pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Number of columns set
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether no columns are set
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Build a record from a JSON object.
    ///
    /// Strings, booleans, integers, floats, and nested objects/arrays map to
    /// their natural `Value` variants; `null` maps to an untyped null that the
    /// compiler retypes per the target column. Non-object input is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`SluiceError::InvalidDescriptor`] if `json` is not an object or
    /// an integer exceeds the `i64` range.
    pub fn from_json(json: serde_json::Value) -> Result<Self, SluiceError> {
        let serde_json::Value::Object(map) = json else {
            return Err(SluiceError::InvalidDescriptor {
                detail: format!("entry must be a JSON object, got: {json}"),
            });
        };
        let mut record = Record::new();
        for (column, value) in map {
            let value = match value {
                serde_json::Value::Null => Value::String(None),
                serde_json::Value::Bool(b) => Value::from(b),
                serde_json::Value::Number(n) => {
                    if let Some(i) = n.as_i64() {
                        Value::from(i)
                    } else if let Some(f) = n.as_f64() {
                        Value::from(f)
                    } else {
                        return Err(SluiceError::InvalidDescriptor {
                            detail: format!("number out of range for column {column}: {n}"),
                        });
                    }
                }
                serde_json::Value::String(s) => Value::from(s),
                other @ (serde_json::Value::Array(_) | serde_json::Value::Object(_)) => {
                    Value::Json(Some(Box::new(other)))
                }
            };
            record.set(column, value);
        }
        Ok(record)
    }

    /// Render the record as a JSON object.
    ///
    /// UUIDs render hyphenated, timestamps as ISO-8601, decimals and binary as
    /// strings; nulls of any type become JSON `null`.
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::with_capacity(self.fields.len());
        for (column, value) in &self.fields {
            map.insert(column.clone(), value_to_json(value));
        }
        serde_json::Value::Object(map)
    }
}

impl From<Vec<(String, Value)>> for Record {
    fn from(fields: Vec<(String, Value)>) -> Self {
        let mut record = Record::new();
        for (column, value) in fields {
            record.set(column, value);
        }
        record
    }
}

impl<'a> IntoIterator for &'a Record {
    type Item = (&'a str, &'a Value);
    type IntoIter = Box<dyn Iterator<Item = (&'a str, &'a Value)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

fn value_to_json(value: &Value) -> serde_json::Value {
    if value.is_null() {
        return serde_json::Value::Null;
    }
    match value {
        Value::Bool(Some(b)) => serde_json::Value::Bool(*b),
        Value::TinyInt(Some(i)) => serde_json::json!(*i),
        Value::SmallInt(Some(i)) => serde_json::json!(*i),
        Value::Int(Some(i)) => serde_json::json!(*i),
        Value::BigInt(Some(i)) => serde_json::json!(*i),
        Value::TinyUnsigned(Some(u)) => serde_json::json!(*u),
        Value::SmallUnsigned(Some(u)) => serde_json::json!(*u),
        Value::Unsigned(Some(u)) => serde_json::json!(*u),
        Value::BigUnsigned(Some(u)) => serde_json::json!(*u),
        Value::Float(Some(v)) => serde_json::json!(*v),
        Value::Double(Some(v)) => serde_json::json!(*v),
        Value::String(Some(s)) => serde_json::Value::String(s.clone()),
        Value::Bytes(Some(b)) => {
            // Hex rendering; binary payloads are opaque at the JSON boundary.
            serde_json::Value::String(b.iter().map(|byte| format!("{byte:02x}")).collect())
        }
        Value::Json(Some(j)) => (**j).clone(),
        Value::Uuid(_) => string_via::<uuid::Uuid>(value),
        Value::ChronoDateTime(_) => extract::<chrono::NaiveDateTime>(value)
            .map(|t| serde_json::Value::String(t.format("%Y-%m-%dT%H:%M:%S%.f").to_string()))
            .unwrap_or(serde_json::Value::Null),
        Value::ChronoDateTimeUtc(_) => string_via::<chrono::DateTime<chrono::Utc>>(value),
        Value::ChronoDate(_) => string_via::<chrono::NaiveDate>(value),
        Value::ChronoTime(_) => string_via::<chrono::NaiveTime>(value),
        Value::Decimal(_) => string_via::<rust_decimal::Decimal>(value),
        _ => serde_json::Value::Null,
    }
}

fn extract<T: sea_query::ValueType>(value: &Value) -> Option<T> {
    T::try_from(value.clone()).ok()
}

fn string_via<T: sea_query::ValueType + ToString>(value: &Value) -> serde_json::Value {
    extract::<T>(value)
        .map(|v| serde_json::Value::String(v.to_string()))
        .unwrap_or(serde_json::Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_preserves_order_and_replaces() {
        let mut record = Record::new();
        record.set("a", 1i32).set("b", 2i32).set("a", 3i32);
        assert_eq!(record.len(), 2);
        assert_eq!(record.columns().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(record.get("a"), Some(&Value::Int(Some(3))));
    }

    #[test]
    fn test_from_json_object() {
        let record = Record::from_json(json!({
            "name": "Test",
            "abv": 5.2,
            "brewed": true,
            "batch": 42,
        }))
        .unwrap();
        assert_eq!(record.get("name"), Some(&Value::String(Some("Test".to_string()))));
        assert_eq!(record.get("brewed"), Some(&Value::Bool(Some(true))));
        assert_eq!(record.get("batch"), Some(&Value::BigInt(Some(42))));
    }

    #[test]
    fn test_from_json_rejects_non_object() {
        let err = Record::from_json(json!(["not", "an", "object"])).unwrap_err();
        assert!(matches!(err, SluiceError::InvalidDescriptor { .. }));
    }

    #[test]
    fn test_from_json_null_is_null_value() {
        let record = Record::from_json(json!({ "abv": null })).unwrap();
        assert!(record.get("abv").unwrap().is_null());
    }

    #[test]
    fn test_to_json_round_trip_simple() {
        let source = json!({ "count": 2, "name": "Test" });
        let record = Record::from_json(source.clone()).unwrap();
        assert_eq!(record.to_json(), source);
    }

    #[test]
    fn test_to_json_renders_uuid_as_string() {
        let id = uuid::Uuid::new_v4();
        let mut record = Record::new();
        record.set("ID", id);
        assert_eq!(record.to_json()["ID"], json!(id.to_string()));
    }
}
