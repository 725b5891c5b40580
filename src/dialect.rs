//! Dialect type mapping for PostgreSQL.
//!
//! Three duties live here: mapping abstract column types to native SQL types,
//! serializing caller-supplied literals into values the driver can bind for
//! the declared column type, and deserializing raw result rows back into
//! records. Identifier quoting and `$N` placeholder syntax are delegated to
//! sea-query's `PostgresQueryBuilder`, which every compiled statement is
//! rendered through.

use crate::error::SluiceError;
use crate::model::{ColumnDef, ColumnType};
use crate::record::Record;
use may_postgres::Row;
use sea_query::{Iden, Value};

/// Dynamic identifier for tables and columns, quoted by the query builder
pub(crate) struct SqlIdent(pub String);

impl Iden for SqlIdent {
    fn unquoted(&self) -> &str {
        &self.0
    }
}

/// Typed NULL for a column, so the driver binds the right parameter type
pub(crate) fn null_value(column_type: ColumnType) -> Value {
    match column_type {
        ColumnType::Uuid => Value::from(Option::<uuid::Uuid>::None),
        ColumnType::Text => Value::String(None),
        ColumnType::Integer => Value::Int(None),
        ColumnType::BigInt => Value::BigInt(None),
        ColumnType::Boolean => Value::Bool(None),
        ColumnType::Double => Value::Double(None),
        ColumnType::Decimal => Value::from(Option::<rust_decimal::Decimal>::None),
        ColumnType::Timestamp => Value::from(Option::<chrono::NaiveDateTime>::None),
        ColumnType::Date => Value::from(Option::<chrono::NaiveDate>::None),
        ColumnType::Binary => Value::Bytes(None),
        ColumnType::Json => Value::Json(None),
    }
}

/// Serialize a caller-supplied literal for a column.
///
/// Accepts the natural representations an entry or filter may carry (a UUID
/// as a string, a timestamp as an ISO-8601 string, an `i64` for an `integer`
/// column) and converts to the variant the declared type binds.
/// Nulls of any incoming variant are retyped to the column's typed NULL.
///
/// # Errors
///
/// Returns [`SluiceError::ValueConversion`] when the literal cannot represent
/// a value of the column's declared type.
pub(crate) fn serialize_value(column: &ColumnDef, value: &Value) -> Result<Value, SluiceError> {
    if value.is_null() {
        return Ok(null_value(column.column_type()));
    }
    let mismatch = |detail: String| SluiceError::ValueConversion {
        column: column.name().to_string(),
        detail,
    };
    match column.column_type() {
        ColumnType::Uuid => match value {
            Value::Uuid(_) => Ok(value.clone()),
            Value::String(Some(s)) => uuid::Uuid::parse_str(s)
                .map(Value::from)
                .map_err(|e| mismatch(format!("not a valid uuid ({e}): {s}"))),
            other => Err(mismatch(format!("expected uuid, got {other:?}"))),
        },
        ColumnType::Text => match value {
            Value::String(_) => Ok(value.clone()),
            other => Err(mismatch(format!("expected text, got {other:?}"))),
        },
        ColumnType::Integer => match value {
            Value::Int(_) => Ok(value.clone()),
            Value::TinyInt(Some(i)) => Ok(Value::from(i32::from(*i))),
            Value::SmallInt(Some(i)) => Ok(Value::from(i32::from(*i))),
            Value::BigInt(Some(i)) => i32::try_from(*i)
                .map(Value::from)
                .map_err(|_| mismatch(format!("integer out of range: {i}"))),
            other => Err(mismatch(format!("expected integer, got {other:?}"))),
        },
        ColumnType::BigInt => match value {
            Value::BigInt(_) => Ok(value.clone()),
            Value::TinyInt(Some(i)) => Ok(Value::from(i64::from(*i))),
            Value::SmallInt(Some(i)) => Ok(Value::from(i64::from(*i))),
            Value::Int(Some(i)) => Ok(Value::from(i64::from(*i))),
            other => Err(mismatch(format!("expected bigint, got {other:?}"))),
        },
        ColumnType::Boolean => match value {
            Value::Bool(_) => Ok(value.clone()),
            other => Err(mismatch(format!("expected boolean, got {other:?}"))),
        },
        ColumnType::Double => match value {
            Value::Double(_) => Ok(value.clone()),
            Value::Float(Some(v)) => Ok(Value::from(f64::from(*v))),
            Value::Int(Some(i)) => Ok(Value::from(f64::from(*i))),
            Value::BigInt(Some(i)) => Ok(Value::from(*i as f64)),
            other => Err(mismatch(format!("expected double, got {other:?}"))),
        },
        ColumnType::Decimal => match value {
            Value::Decimal(_) => Ok(value.clone()),
            Value::String(Some(s)) => s
                .parse::<rust_decimal::Decimal>()
                .map(Value::from)
                .map_err(|e| mismatch(format!("not a valid decimal ({e}): {s}"))),
            Value::Int(Some(i)) => Ok(Value::from(rust_decimal::Decimal::from(*i))),
            Value::BigInt(Some(i)) => Ok(Value::from(rust_decimal::Decimal::from(*i))),
            other => Err(mismatch(format!("expected decimal, got {other:?}"))),
        },
        ColumnType::Timestamp => match value {
            Value::ChronoDateTime(_) => Ok(value.clone()),
            Value::String(Some(s)) => parse_timestamp(s)
                .map(Value::from)
                .ok_or_else(|| mismatch(format!("not a valid timestamp: {s}"))),
            other => Err(mismatch(format!("expected timestamp, got {other:?}"))),
        },
        ColumnType::Date => match value {
            Value::ChronoDate(_) => Ok(value.clone()),
            Value::String(Some(s)) => s
                .parse::<chrono::NaiveDate>()
                .map(Value::from)
                .map_err(|e| mismatch(format!("not a valid date ({e}): {s}"))),
            other => Err(mismatch(format!("expected date, got {other:?}"))),
        },
        ColumnType::Binary => match value {
            Value::Bytes(_) => Ok(value.clone()),
            other => Err(mismatch(format!("expected binary, got {other:?}"))),
        },
        ColumnType::Json => match value {
            Value::Json(_) => Ok(value.clone()),
            // Any scalar is valid JSON; wrap it rather than reject it.
            Value::String(Some(s)) => Ok(Value::Json(Some(Box::new(serde_json::Value::String(
                s.clone(),
            ))))),
            Value::Bool(Some(b)) => Ok(Value::Json(Some(Box::new(serde_json::json!(*b))))),
            Value::Int(Some(i)) => Ok(Value::Json(Some(Box::new(serde_json::json!(*i))))),
            Value::BigInt(Some(i)) => Ok(Value::Json(Some(Box::new(serde_json::json!(*i))))),
            Value::Double(Some(v)) => Ok(Value::Json(Some(Box::new(serde_json::json!(*v))))),
            other => Err(mismatch(format!("expected json, got {other:?}"))),
        },
    }
}

/// ISO-8601 timestamps, `T` or space separated, with or without `Z`/offset
fn parse_timestamp(s: &str) -> Option<chrono::NaiveDateTime> {
    if let Ok(t) = s.parse::<chrono::NaiveDateTime>() {
        return Some(t);
    }
    if let Ok(t) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(t);
    }
    s.parse::<chrono::DateTime<chrono::FixedOffset>>()
        .map(|t| t.naive_utc())
        .ok()
}

/// Decode one result row into a record, column by column.
///
/// `columns` is the projection the statement selected, in statement order, so
/// decoding is positional.
///
/// # Errors
///
/// Returns [`SluiceError::ValueConversion`] when a column's wire value does
/// not convert to the declared abstract type.
pub(crate) fn decode_row(columns: &[&ColumnDef], row: &Row) -> Result<Record, SluiceError> {
    let mut record = Record::new();
    for (idx, column) in columns.iter().enumerate() {
        let value = decode_column(column, row, idx)?;
        record.set(column.name().to_string(), value);
    }
    Ok(record)
}

fn decode_column(column: &ColumnDef, row: &Row, idx: usize) -> Result<Value, SluiceError> {
    let conversion = |e: may_postgres::Error| SluiceError::ValueConversion {
        column: column.name().to_string(),
        detail: e.to_string(),
    };
    let value = match column.column_type() {
        ColumnType::Uuid => Value::from(row.try_get::<_, Option<uuid::Uuid>>(idx).map_err(conversion)?),
        ColumnType::Text => Value::from(row.try_get::<_, Option<String>>(idx).map_err(conversion)?),
        ColumnType::Integer => Value::from(row.try_get::<_, Option<i32>>(idx).map_err(conversion)?),
        ColumnType::BigInt => Value::from(row.try_get::<_, Option<i64>>(idx).map_err(conversion)?),
        ColumnType::Boolean => Value::from(row.try_get::<_, Option<bool>>(idx).map_err(conversion)?),
        ColumnType::Double => Value::from(row.try_get::<_, Option<f64>>(idx).map_err(conversion)?),
        ColumnType::Decimal => Value::from(
            row.try_get::<_, Option<rust_decimal::Decimal>>(idx)
                .map_err(conversion)?,
        ),
        ColumnType::Timestamp => Value::from(
            row.try_get::<_, Option<chrono::NaiveDateTime>>(idx)
                .map_err(conversion)?,
        ),
        ColumnType::Date => Value::from(
            row.try_get::<_, Option<chrono::NaiveDate>>(idx)
                .map_err(conversion)?,
        ),
        ColumnType::Binary => Value::from(row.try_get::<_, Option<Vec<u8>>>(idx).map_err(conversion)?),
        ColumnType::Json => Value::from(
            row.try_get::<_, Option<serde_json::Value>>(idx)
                .map_err(conversion)?,
        ),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(name: &str, ty: ColumnType) -> ColumnDef {
        ColumnDef::new(name, ty)
    }

    #[test]
    fn test_string_serializes_to_uuid() {
        let id = "9e1704e3-6fd0-4a5d-bfb1-13ac47f7976b";
        let out = serialize_value(&col("ID", ColumnType::Uuid), &Value::from(id)).unwrap();
        assert!(matches!(out, Value::Uuid(_)));
        assert!(!out.is_null());
    }

    #[test]
    fn test_bad_uuid_string_rejected() {
        let err = serialize_value(&col("ID", ColumnType::Uuid), &Value::from("not-a-uuid")).unwrap_err();
        assert!(matches!(err, SluiceError::ValueConversion { .. }));
    }

    #[test]
    fn test_null_is_retyped_per_column() {
        let out = serialize_value(&col("ID", ColumnType::Uuid), &Value::String(None)).unwrap();
        assert!(out.is_null());
        assert!(matches!(out, Value::Uuid(_)));
    }

    #[test]
    fn test_bigint_narrows_to_integer_in_range() {
        let out = serialize_value(&col("n", ColumnType::Integer), &Value::BigInt(Some(42))).unwrap();
        assert_eq!(out, Value::Int(Some(42)));
    }

    #[test]
    fn test_bigint_out_of_range_rejected() {
        let err =
            serialize_value(&col("n", ColumnType::Integer), &Value::BigInt(Some(i64::MAX))).unwrap_err();
        assert!(matches!(err, SluiceError::ValueConversion { .. }));
    }

    #[test]
    fn test_timestamp_parses_iso_strings() {
        for s in ["2024-05-01T10:30:00", "2024-05-01T10:30:00Z", "2024-05-01 10:30:00"] {
            let out = serialize_value(&col("at", ColumnType::Timestamp), &Value::from(s));
            assert!(out.is_ok(), "failed to parse {s}: {out:?}");
        }
    }

    #[test]
    fn test_type_mismatch_rejected() {
        let err = serialize_value(&col("name", ColumnType::Text), &Value::Bool(Some(true))).unwrap_err();
        assert!(matches!(err, SluiceError::ValueConversion { .. }));
    }

    #[test]
    fn test_typed_nulls_match_column_type() {
        assert!(matches!(null_value(ColumnType::Text), Value::String(None)));
        assert!(matches!(null_value(ColumnType::Integer), Value::Int(None)));
        assert!(null_value(ColumnType::Uuid).is_null());
        assert!(null_value(ColumnType::Timestamp).is_null());
    }
}
