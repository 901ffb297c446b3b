//! Deferred query error types
//!
//! An executor failure propagates through settlement as a failed
//! result; the engine never retries and never masks it.

use thiserror::Error;

use crate::query::QueryError;

/// Errors raised inside an executor
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExecutorError {
    /// The executor does not interpret this operation name
    #[error("Unsupported operation: {0:?}")]
    UnsupportedOperation(String),

    /// A log entry carried arguments of the wrong shape
    #[error("Invalid arguments for {op:?}: {reason}")]
    InvalidArguments { op: String, reason: String },

    /// A specification in the log failed to compile
    #[error(transparent)]
    Query(#[from] QueryError),

    /// Backend-specific failure
    #[error("Executor failed: {0}")]
    Failed(String),
}

impl ExecutorError {
    /// Create an invalid-arguments error
    pub fn invalid_arguments(op: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArguments {
            op: op.into(),
            reason: reason.into(),
        }
    }
}

/// Errors delivered by deferred query settlement
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DeferredError {
    /// The executor failed; delivered unchanged to the continuation
    #[error(transparent)]
    Executor(#[from] ExecutorError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_executor_failure_propagates_unchanged() {
        let err: DeferredError = ExecutorError::Failed("backend down".to_string()).into();
        assert_eq!(format!("{}", err), "Executor failed: backend down");
    }
}
