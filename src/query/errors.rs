//! Query compilation error types
//!
//! Structural problems in a query specification are programmer errors
//! and fail fast. Data-shape irregularities (missing fields, wrong
//! runtime types in records) are never errors; they resolve to a
//! documented fallback so filtering cannot crash on heterogeneous
//! records.

use thiserror::Error;

use crate::path::PathError;

/// Result type for query compilation
pub type QueryResult<T> = Result<T, QueryError>;

/// Errors raised while compiling a query specification
#[derive(Debug, Clone, Error, PartialEq)]
pub enum QueryError {
    /// A query specification (or a `$not` argument) was not an object
    #[error("Query specification must be an object, got {0}")]
    SpecNotObject(String),

    /// An operator name resolved to no registered constructor
    #[error("Unknown operator: {0:?}")]
    UnknownOperator(String),

    /// A field path was structurally invalid
    #[error(transparent)]
    InvalidPath(#[from] PathError),

    /// A pattern literal or `$regex` argument had no expression
    #[error("Empty pattern in query for field {0:?}")]
    EmptyPattern(String),

    /// A pattern failed to parse as a regular expression
    #[error("Invalid pattern for field {field:?}: {reason}")]
    InvalidPattern { field: String, reason: String },

    /// An operator received an argument of the wrong shape
    #[error("Invalid argument for {op} on field {field:?}: {reason}")]
    InvalidArgument {
        op: String,
        field: String,
        reason: String,
    },
}

impl QueryError {
    /// Create an invalid-argument error
    pub fn invalid_argument(
        op: impl Into<String>,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidArgument {
            op: op.into(),
            field: field.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = QueryError::UnknownOperator("$frobnicate".to_string());
        assert!(format!("{}", err).contains("$frobnicate"));

        let err = QueryError::invalid_argument("$in", "tags", "expected an array");
        let display = format!("{}", err);
        assert!(display.contains("$in"));
        assert!(display.contains("tags"));
    }

    #[test]
    fn test_path_error_converts() {
        let err: QueryError = PathError::Empty.into();
        assert_eq!(err, QueryError::InvalidPath(PathError::Empty));
    }
}
