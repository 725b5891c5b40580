//! Bind-value conversion from sea-query values to driver parameters.
//!
//! The conversion follows a two-pass pattern:
//! 1. First pass: collect every value into a typed vector (`Option<T>` so
//!    typed NULLs bind as the right parameter type)
//! 2. Second pass: push references to the stored values in statement order
//!
//! The references stay valid for the closure's scope, which is where the
//! statement executes.

use crate::error::SluiceError;
use may_postgres::types::ToSql;
use sea_query::{Value, Values};

fn extract<T: sea_query::ValueType>(value: &Value) -> Result<Option<T>, SluiceError> {
    if value.is_null() {
        return Ok(None);
    }
    T::try_from(value.clone()).map(Some).map_err(|_| SluiceError::ExecutionFailure {
        detail: format!("unsupported bind value: {value:?}"),
    })
}

/// Convert ordered bind values into `ToSql` parameters and hand them to `f`.
///
/// # Errors
///
/// Returns [`SluiceError::ExecutionFailure`] for value variants the dialect
/// cannot bind, or whatever error `f` itself produces.
pub(crate) fn with_converted_params<F, R>(values: &Values, f: F) -> Result<R, SluiceError>
where
    F: FnOnce(&[&dyn ToSql]) -> Result<R, SluiceError>,
{
    let mut bools: Vec<Option<bool>> = Vec::new();
    let mut ints: Vec<Option<i32>> = Vec::new();
    let mut big_ints: Vec<Option<i64>> = Vec::new();
    let mut floats: Vec<Option<f32>> = Vec::new();
    let mut doubles: Vec<Option<f64>> = Vec::new();
    let mut strings: Vec<Option<String>> = Vec::new();
    let mut bytes: Vec<Option<Vec<u8>>> = Vec::new();
    let mut uuids: Vec<Option<uuid::Uuid>> = Vec::new();
    let mut datetimes: Vec<Option<chrono::NaiveDateTime>> = Vec::new();
    let mut datetimes_utc: Vec<Option<chrono::DateTime<chrono::Utc>>> = Vec::new();
    let mut dates: Vec<Option<chrono::NaiveDate>> = Vec::new();
    let mut times: Vec<Option<chrono::NaiveTime>> = Vec::new();
    let mut decimals: Vec<Option<rust_decimal::Decimal>> = Vec::new();
    let mut jsons: Vec<Option<serde_json::Value>> = Vec::new();

    // First pass: collect values into typed vectors.
    for value in values.iter() {
        match value {
            Value::Bool(_) => bools.push(extract(value)?),
            Value::TinyInt(_) | Value::SmallInt(_) | Value::Int(_) => {
                ints.push(widen_int(value)?);
            }
            Value::TinyUnsigned(_) | Value::SmallUnsigned(_) => ints.push(widen_int(value)?),
            Value::BigInt(_) | Value::Unsigned(_) | Value::BigUnsigned(_) => {
                big_ints.push(widen_big_int(value)?);
            }
            Value::Float(_) => floats.push(extract(value)?),
            Value::Double(_) => doubles.push(extract(value)?),
            Value::String(_) => strings.push(extract(value)?),
            Value::Bytes(_) => bytes.push(extract(value)?),
            Value::Uuid(_) => uuids.push(extract(value)?),
            Value::ChronoDateTime(_) => datetimes.push(extract(value)?),
            Value::ChronoDateTimeUtc(_) => datetimes_utc.push(extract(value)?),
            Value::ChronoDate(_) => dates.push(extract(value)?),
            Value::ChronoTime(_) => times.push(extract(value)?),
            Value::Decimal(_) => decimals.push(extract(value)?),
            Value::Json(_) => jsons.push(extract(value)?),
            other => {
                return Err(SluiceError::ExecutionFailure {
                    detail: format!("unsupported bind value type: {other:?}"),
                });
            }
        }
    }

    // Second pass: reference the stored values in statement order.
    let mut bool_idx = 0;
    let mut int_idx = 0;
    let mut big_int_idx = 0;
    let mut float_idx = 0;
    let mut double_idx = 0;
    let mut string_idx = 0;
    let mut byte_idx = 0;
    let mut uuid_idx = 0;
    let mut datetime_idx = 0;
    let mut datetime_utc_idx = 0;
    let mut date_idx = 0;
    let mut time_idx = 0;
    let mut decimal_idx = 0;
    let mut json_idx = 0;

    let mut params: Vec<&dyn ToSql> = Vec::with_capacity(values.iter().count());
    for value in values.iter() {
        match value {
            Value::Bool(_) => {
                params.push(&bools[bool_idx] as &dyn ToSql);
                bool_idx += 1;
            }
            Value::TinyInt(_)
            | Value::SmallInt(_)
            | Value::Int(_)
            | Value::TinyUnsigned(_)
            | Value::SmallUnsigned(_) => {
                params.push(&ints[int_idx] as &dyn ToSql);
                int_idx += 1;
            }
            Value::BigInt(_) | Value::Unsigned(_) | Value::BigUnsigned(_) => {
                params.push(&big_ints[big_int_idx] as &dyn ToSql);
                big_int_idx += 1;
            }
            Value::Float(_) => {
                params.push(&floats[float_idx] as &dyn ToSql);
                float_idx += 1;
            }
            Value::Double(_) => {
                params.push(&doubles[double_idx] as &dyn ToSql);
                double_idx += 1;
            }
            Value::String(_) => {
                params.push(&strings[string_idx] as &dyn ToSql);
                string_idx += 1;
            }
            Value::Bytes(_) => {
                params.push(&bytes[byte_idx] as &dyn ToSql);
                byte_idx += 1;
            }
            Value::Uuid(_) => {
                params.push(&uuids[uuid_idx] as &dyn ToSql);
                uuid_idx += 1;
            }
            Value::ChronoDateTime(_) => {
                params.push(&datetimes[datetime_idx] as &dyn ToSql);
                datetime_idx += 1;
            }
            Value::ChronoDateTimeUtc(_) => {
                params.push(&datetimes_utc[datetime_utc_idx] as &dyn ToSql);
                datetime_utc_idx += 1;
            }
            Value::ChronoDate(_) => {
                params.push(&dates[date_idx] as &dyn ToSql);
                date_idx += 1;
            }
            Value::ChronoTime(_) => {
                params.push(&times[time_idx] as &dyn ToSql);
                time_idx += 1;
            }
            Value::Decimal(_) => {
                params.push(&decimals[decimal_idx] as &dyn ToSql);
                decimal_idx += 1;
            }
            Value::Json(_) => {
                params.push(&jsons[json_idx] as &dyn ToSql);
                json_idx += 1;
            }
            other => {
                return Err(SluiceError::ExecutionFailure {
                    detail: format!("unsupported bind value type: {other:?}"),
                });
            }
        }
    }

    f(&params)
}

fn widen_int(value: &Value) -> Result<Option<i32>, SluiceError> {
    if value.is_null() {
        return Ok(None);
    }
    let widened = match value {
        Value::TinyInt(Some(i)) => i32::from(*i),
        Value::SmallInt(Some(i)) => i32::from(*i),
        Value::Int(Some(i)) => *i,
        Value::TinyUnsigned(Some(u)) => i32::from(*u),
        Value::SmallUnsigned(Some(u)) => i32::from(*u),
        other => {
            return Err(SluiceError::ExecutionFailure {
                detail: format!("unsupported bind value: {other:?}"),
            });
        }
    };
    Ok(Some(widened))
}

fn widen_big_int(value: &Value) -> Result<Option<i64>, SluiceError> {
    if value.is_null() {
        return Ok(None);
    }
    let widened = match value {
        Value::BigInt(Some(i)) => *i,
        Value::Unsigned(Some(u)) => i64::from(*u),
        Value::BigUnsigned(Some(u)) => i64::try_from(*u).map_err(|_| {
            SluiceError::ExecutionFailure {
                detail: format!("bind value {u} exceeds i64::MAX and cannot be bound"),
            }
        })?,
        other => {
            return Err(SluiceError::ExecutionFailure {
                detail: format!("unsupported bind value: {other:?}"),
            });
        }
    };
    Ok(Some(widened))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_preserve_order_and_arity() {
        let values = Values(vec![
            Value::String(Some("Test".to_string())),
            Value::Int(None),
            Value::from(uuid::Uuid::new_v4()),
            Value::BigUnsigned(Some(1)),
            Value::Double(Some(4.9)),
        ]);
        let arity = with_converted_params(&values, |params| Ok(params.len())).unwrap();
        assert_eq!(arity, 5);
    }

    #[test]
    fn test_big_unsigned_overflow_rejected() {
        let values = Values(vec![Value::BigUnsigned(Some(u64::MAX))]);
        let err = with_converted_params(&values, |_| Ok(())).unwrap_err();
        assert!(matches!(err, SluiceError::ExecutionFailure { .. }));
    }

    #[test]
    fn test_typed_null_still_binds() {
        let values = Values(vec![Value::String(None), Value::Uuid(None)]);
        let arity = with_converted_params(&values, |params| Ok(params.len())).unwrap();
        assert_eq!(arity, 2);
    }
}
