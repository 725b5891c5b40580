//! Error types for query compilation and execution.
//!
//! A single taxonomy covers both halves of the adapter: descriptor/model errors
//! are raised at compile time and never reach the database; backend errors are
//! classified after execution, once the enclosing transaction has been rolled
//! back.

use std::fmt;

/// Adapter error type.
///
/// Compile-time variants (`UnknownEntity`, `UnknownColumn`, `InvalidModel`,
/// `InvalidDescriptor`, `MissingKeyValue`) are produced before any connection
/// is acquired. Execution-time variants carry the backend diagnostic so callers
/// can act on it without re-deriving the compiled SQL.
#[derive(Debug)]
pub enum SluiceError {
    /// Descriptor references an entity absent from the model registry
    UnknownEntity { entity: String },
    /// Descriptor references a column not declared on the entity
    UnknownColumn { entity: String, column: String },
    /// Model registry failed a structural invariant at build time
    InvalidModel { detail: String },
    /// Descriptor is structurally malformed (e.g. row arity mismatch)
    InvalidDescriptor { detail: String },
    /// A key column has no supplied value and no generatable type
    MissingKeyValue { entity: String, column: String },
    /// A value could not be converted to or from the declared column type
    ValueConversion { column: String, detail: String },
    /// Backend rejected a statement (uniqueness, not-null, foreign key, check)
    ConstraintViolation { entity: String, detail: String },
    /// Pool exhausted past the bounded wait, or backend unreachable
    ConnectionUnavailable { detail: String },
    /// Any other backend-reported failure
    ExecutionFailure { detail: String },
}

impl fmt::Display for SluiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SluiceError::UnknownEntity { entity } => {
                write!(f, "unknown entity: {entity}")
            }
            SluiceError::UnknownColumn { entity, column } => {
                write!(f, "unknown column {column} on entity {entity}")
            }
            SluiceError::InvalidModel { detail } => {
                write!(f, "invalid model: {detail}")
            }
            SluiceError::InvalidDescriptor { detail } => {
                write!(f, "invalid query descriptor: {detail}")
            }
            SluiceError::MissingKeyValue { entity, column } => {
                write!(
                    f,
                    "no value for key column {column} on entity {entity} and key type is not generatable"
                )
            }
            SluiceError::ValueConversion { column, detail } => {
                write!(f, "value conversion failed for column {column}: {detail}")
            }
            SluiceError::ConstraintViolation { entity, detail } => {
                write!(f, "constraint violation on entity {entity}: {detail}")
            }
            SluiceError::ConnectionUnavailable { detail } => {
                write!(f, "connection unavailable: {detail}")
            }
            SluiceError::ExecutionFailure { detail } => {
                write!(f, "execution failure: {detail}")
            }
        }
    }
}

impl std::error::Error for SluiceError {}

/// Classify a backend diagnostic reported during statement execution.
///
/// PostgreSQL constraint rejections are detected from the diagnostic text so
/// they surface as [`SluiceError::ConstraintViolation`] with the offending
/// entity attached; everything else stays an [`SluiceError::ExecutionFailure`]
/// with the original diagnostic preserved.
pub(crate) fn classify_backend_detail(entity: &str, detail: String) -> SluiceError {
    let lowered = detail.to_lowercase();
    // Match the wording of PostgreSQL's class-23 (integrity constraint) errors.
    let constraint = lowered.contains("duplicate key")
        || lowered.contains("violates unique constraint")
        || lowered.contains("violates not-null constraint")
        || lowered.contains("null value in column")
        || lowered.contains("violates foreign key constraint")
        || lowered.contains("violates check constraint");
    if constraint {
        SluiceError::ConstraintViolation {
            entity: entity.to_string(),
            detail,
        }
    } else {
        SluiceError::ExecutionFailure { detail }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_context() {
        let err = SluiceError::UnknownColumn {
            entity: "Beers".to_string(),
            column: "abv".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("Beers"));
        assert!(text.contains("abv"));
    }

    #[test]
    fn test_display_all_variants() {
        let cases = vec![
            SluiceError::UnknownEntity { entity: "X".to_string() },
            SluiceError::InvalidModel { detail: "dup".to_string() },
            SluiceError::InvalidDescriptor { detail: "arity".to_string() },
            SluiceError::MissingKeyValue { entity: "X".to_string(), column: "id".to_string() },
            SluiceError::ValueConversion { column: "id".to_string(), detail: "bad uuid".to_string() },
            SluiceError::ConstraintViolation { entity: "X".to_string(), detail: "dup key".to_string() },
            SluiceError::ConnectionUnavailable { detail: "timeout".to_string() },
            SluiceError::ExecutionFailure { detail: "boom".to_string() },
        ];
        for err in cases {
            assert!(!err.to_string().is_empty());
        }
    }
}
