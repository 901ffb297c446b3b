//! Execution context handed to executors
//!
//! The context is built fresh for every settlement: a defensive copy
//! of the operation log, the custom operator map (if any), and
//! metadata about the chain. Mutating a context never affects the
//! live log.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::query::OperatorFn;

/// One recorded chained call: `(operationName, ...args)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Operation name (e.g. "where", "sort", "first")
    pub op: String,
    /// Operation arguments, stored verbatim
    pub args: Vec<Value>,
}

impl LogEntry {
    /// Creates a log entry
    pub fn new(op: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            op: op.into(),
            args,
        }
    }
}

/// Metadata describing the chain at context-build time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextMetadata {
    /// When the deferred query was constructed
    pub created_at: DateTime<Utc>,
    /// Number of entries in the operation log
    pub operation_count: usize,
    /// Number of chained builder calls made since construction
    pub chain_depth: usize,
}

/// Everything an executor receives: log snapshot, optional custom
/// operators, and metadata
#[derive(Clone)]
pub struct ExecutionContext {
    /// Defensive copy of the operation log, in append order
    pub operations: Vec<LogEntry>,
    /// Custom operators bound at construction, if any
    pub validators: Option<HashMap<String, OperatorFn>>,
    /// Chain metadata
    pub metadata: ContextMetadata,
}

impl ExecutionContext {
    /// Name of the most recent log entry, if any.
    ///
    /// Executors use this to recognize terminal operations ("first",
    /// "last", "find") and decide between single-record and sequence
    /// output.
    pub fn last_operation(&self) -> Option<&str> {
        self.operations.last().map(|e| e.op.as_str())
    }
}
