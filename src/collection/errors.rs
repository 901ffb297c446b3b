//! Collection error types

use thiserror::Error;

use crate::path::PathError;
use crate::query::QueryError;

/// Result type for collection operations
pub type CollectionResult<T> = Result<T, CollectionError>;

/// Errors raised by the collection engine
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CollectionError {
    /// A query specification failed to compile
    #[error(transparent)]
    Query(#[from] QueryError),

    /// A shared extension name was registered twice
    #[error("Extension {0:?} is already registered")]
    ExtensionExists(String),

    /// An extension was invoked under an unknown name
    #[error("Unknown extension: {0:?}")]
    UnknownExtension(String),

    /// The shared extension table lock was poisoned by a panic
    #[error("Shared extension table is unavailable (lock poisoned)")]
    ExtensionTablePoisoned,

    /// An extension body reported a failure
    #[error("Extension {name:?} failed: {reason}")]
    ExtensionFailed { name: String, reason: String },

    /// A patch did not resolve to an object
    #[error("Patch must resolve to an object, got {0}")]
    PatchNotObject(String),
}

impl From<PathError> for CollectionError {
    fn from(err: PathError) -> Self {
        Self::Query(QueryError::InvalidPath(err))
    }
}

impl CollectionError {
    /// Create an extension failure error
    pub fn extension_failed(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ExtensionFailed {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
