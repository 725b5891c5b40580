//! Key and default-value resolution for INSERT entries.
//!
//! Runs before compilation so generated identifiers are both bound into the
//! statement and handed back to the caller as part of the write result. Each
//! resolution produces fresh values; within one call all entries receive
//! pairwise-distinct keys.

use crate::dialect;
use crate::error::SluiceError;
use crate::model::{ColumnDef, ColumnType, DefaultRule, EntityDef};
use crate::record::Record;
use sea_query::Value;

/// Fill unsupplied key and defaulted columns on every entry.
///
/// A key column without a supplied value gets a fresh random 128-bit UUID
/// (collision probability negligible). A non-key column with a declared
/// default and no supplied value gets the default. Supplied values, including
/// explicitly supplied keys, pass through untouched after dialect
/// serialization to the declared column type.
///
/// # Errors
///
/// Returns [`SluiceError::MissingKeyValue`] when a key column has no supplied
/// value and its type is not UUID (nothing sensible to generate), or
/// [`SluiceError::ValueConversion`] when a supplied value does not fit the
/// declared column type.
pub(crate) fn resolve(entity: &EntityDef, entries: Vec<Record>) -> Result<Vec<Record>, SluiceError> {
    entries
        .into_iter()
        .map(|entry| resolve_entry(entity, entry))
        .collect()
}

fn resolve_entry(entity: &EntityDef, entry: Record) -> Result<Record, SluiceError> {
    // Rebuild in declaration order so every resolved entry carries its
    // columns the way the entity declares them.
    let mut resolved = Record::new();
    for column in entity.columns() {
        match entry.get(column.name()) {
            Some(value) if !value.is_null() => {
                resolved.set(column.name(), dialect::serialize_value(column, value)?);
            }
            supplied => {
                let explicit_null = supplied.is_some();
                if column.is_key() && !explicit_null {
                    resolved.set(column.name(), generate_key(entity, column)?);
                } else if let (Some(rule), false) = (column.default(), explicit_null) {
                    resolved.set(column.name(), apply_default(rule));
                } else if explicit_null {
                    resolved.set(column.name(), dialect::null_value(column.column_type()));
                }
                // Columns never mentioned and without defaults stay absent;
                // the compiler binds a typed NULL if another entry names them.
            }
        }
    }
    // Reject columns the entity does not declare.
    for (name, _) in entry.iter() {
        entity.require_column(name)?;
    }
    Ok(resolved)
}

fn generate_key(entity: &EntityDef, column: &ColumnDef) -> Result<Value, SluiceError> {
    if column.column_type() == ColumnType::Uuid {
        Ok(Value::from(uuid::Uuid::new_v4()))
    } else {
        Err(SluiceError::MissingKeyValue {
            entity: entity.name().to_string(),
            column: column.name().to_string(),
        })
    }
}

fn apply_default(rule: &DefaultRule) -> Value {
    match rule {
        DefaultRule::Literal(value) => value.clone(),
        DefaultRule::GeneratedUuid => Value::from(uuid::Uuid::new_v4()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn beers() -> EntityDef {
        EntityDef::new("Beers", "csw_beers")
            .column(ColumnDef::new("ID", ColumnType::Uuid).key())
            .column(ColumnDef::new("name", ColumnType::Text).nullable())
            .column(
                ColumnDef::new("rating", ColumnType::Integer)
                    .nullable()
                    .default_rule(DefaultRule::Literal(Value::Int(Some(3)))),
            )
    }

    fn entry(name: &str) -> Record {
        let mut record = Record::new();
        record.set("name", name);
        record
    }

    #[test]
    fn test_missing_keys_are_generated_and_distinct() {
        let resolved = resolve(&beers(), vec![entry("Test"), entry("Test2")]).unwrap();
        assert_eq!(resolved.len(), 2);
        let first = resolved[0].get("ID").unwrap();
        let second = resolved[1].get("ID").unwrap();
        assert!(!first.is_null());
        assert!(!second.is_null());
        assert_ne!(first, second);
    }

    #[test]
    fn test_supplied_key_is_kept() {
        let id = uuid::Uuid::new_v4();
        let mut record = entry("Test");
        record.set("ID", id);
        let resolved = resolve(&beers(), vec![record]).unwrap();
        assert_eq!(resolved[0].get("ID"), Some(&Value::from(id)));
    }

    #[test]
    fn test_supplied_key_as_string_is_serialized() {
        let id = uuid::Uuid::new_v4();
        let mut record = entry("Test");
        record.set("ID", id.to_string());
        let resolved = resolve(&beers(), vec![record]).unwrap();
        assert_eq!(resolved[0].get("ID"), Some(&Value::from(id)));
    }

    #[test]
    fn test_default_applied_when_absent() {
        let resolved = resolve(&beers(), vec![entry("Test")]).unwrap();
        assert_eq!(resolved[0].get("rating"), Some(&Value::Int(Some(3))));
    }

    #[test]
    fn test_explicit_null_beats_default() {
        let mut record = entry("Test");
        record.set("rating", Value::Int(None));
        let resolved = resolve(&beers(), vec![record]).unwrap();
        assert_eq!(resolved[0].get("rating"), Some(&Value::Int(None)));
    }

    #[test]
    fn test_non_uuid_key_without_value_rejected() {
        let entity = EntityDef::new("Counters", "counters")
            .column(ColumnDef::new("id", ColumnType::BigInt).key())
            .column(ColumnDef::new("value", ColumnType::Integer).nullable());
        let err = resolve(&entity, vec![entry("x")]).unwrap_err();
        // The unknown column fires first; with a valid column the key check fires.
        assert!(matches!(
            err,
            SluiceError::UnknownColumn { .. } | SluiceError::MissingKeyValue { .. }
        ));
        let mut record = Record::new();
        record.set("value", 1i32);
        let err = resolve(&entity, vec![record]).unwrap_err();
        assert!(matches!(err, SluiceError::MissingKeyValue { .. }));
    }

    #[test]
    fn test_undeclared_column_rejected() {
        let mut record = entry("Test");
        record.set("ibu", 60i32);
        let err = resolve(&beers(), vec![record]).unwrap_err();
        assert!(matches!(err, SluiceError::UnknownColumn { .. }));
    }
}
