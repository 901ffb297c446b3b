//! Deferred operation log and executor protocol
//!
//! A `DeferredQuery` records chained calls as an ordered log of
//! `(operationName, ...args)` tuples without executing anything. On
//! settlement it builds a fresh execution context (log snapshot,
//! optional custom operators, metadata) and hands it to the bound
//! executor.
//!
//! # Settlement semantics
//!
//! Every settlement call (`run`, `then`, `catch`, `finally`) rebuilds
//! the context from the same accumulated log and invokes the executor
//! exactly once for that call. Nothing is cached across settlements:
//! settling twice runs the executor twice, and the results may differ
//! if the backing data changed. Appending operations after a
//! settlement is legal and affects only later settlements.
//!
//! Terminal names ("first", "last", "find") are ordinary log entries;
//! the executor recognizes the most recent entry's name and decides
//! whether to produce a single record or a sequence. That delegation
//! lets one deferred query abstract over backends that natively
//! support limit-1 queries and backends that do not.

mod context;
mod errors;
mod memory;

pub use context::{ContextMetadata, ExecutionContext, LogEntry};
pub use errors::{DeferredError, ExecutorError};
pub use memory::MemoryExecutor;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;
use serde_json::Value;

use crate::obs::{Logger, Severity};
use crate::query::OperatorFn;

/// What an executor settles with: a single record or a sequence
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutorOutput {
    /// A single record (or none matched)
    One(Option<Value>),
    /// An ordered sequence of records
    Many(Vec<Value>),
}

impl ExecutorOutput {
    /// The records as a sequence, regardless of shape
    pub fn into_vec(self) -> Vec<Value> {
        match self {
            Self::One(Some(record)) => vec![record],
            Self::One(None) => Vec::new(),
            Self::Many(records) => records,
        }
    }
}

/// The future an executor returns
pub type ExecutorFuture = BoxFuture<'static, Result<ExecutorOutput, ExecutorError>>;

/// A caller-supplied interpreter of the operation log.
///
/// Receives a fresh context per settlement; the engine imposes no
/// contract on what it does with the operations.
pub type Executor = Arc<dyn Fn(ExecutionContext) -> ExecutorFuture + Send + Sync>;

/// Records chained operations and defers execution to a bound executor
pub struct DeferredQuery {
    log: Vec<LogEntry>,
    chain_calls: usize,
    executor: Executor,
    validators: Option<HashMap<String, OperatorFn>>,
    created_at: DateTime<Utc>,
}

impl DeferredQuery {
    /// Creates a deferred query bound to an executor
    pub fn new(executor: Executor) -> Self {
        Self {
            log: Vec::new(),
            chain_calls: 0,
            executor,
            validators: None,
            created_at: Utc::now(),
        }
    }

    /// Creates a deferred query with custom operators passed through
    /// to the executor in every context.
    pub fn with_validators(executor: Executor, validators: HashMap<String, OperatorFn>) -> Self {
        Self {
            validators: Some(validators),
            ..Self::new(executor)
        }
    }

    /// Number of recorded operations
    pub fn len(&self) -> usize {
        self.log.len()
    }

    /// Whether the log is empty
    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    /// The recorded log, in append order
    pub fn log(&self) -> &[LogEntry] {
        &self.log
    }

    /// Appends an arbitrary operation to the log.
    ///
    /// This is the primitive behind every chained call; no side
    /// effects occur until settlement.
    pub fn op(&mut self, name: impl Into<String>, args: Vec<Value>) -> &mut Self {
        self.log.push(LogEntry::new(name, args));
        self.chain_calls += 1;
        self
    }

    /// Appends prepared entries in bulk (one chained call)
    pub fn append_entries(&mut self, entries: Vec<LogEntry>) -> &mut Self {
        self.log.extend(entries);
        self.chain_calls += 1;
        self
    }

    /// Records a filter over a declarative specification
    pub fn where_(&mut self, spec: Value) -> &mut Self {
        self.op("where", vec![spec])
    }

    /// Records the complement of `where_`
    pub fn exclude(&mut self, spec: Value) -> &mut Self {
        self.op("exclude", vec![spec])
    }

    /// Records a sort by field path and direction ("asc"/"desc")
    pub fn sort(&mut self, field: impl Into<String>, direction: impl Into<String>) -> &mut Self {
        self.op(
            "sort",
            vec![Value::String(field.into()), Value::String(direction.into())],
        )
    }

    /// Records a result-count bound
    pub fn limit(&mut self, count: u64) -> &mut Self {
        self.op("limit", vec![Value::from(count)])
    }

    /// Records skipping a number of leading records
    pub fn skip(&mut self, count: u64) -> &mut Self {
        self.op("skip", vec![Value::from(count)])
    }

    /// Records a projection to the named field paths
    pub fn select(&mut self, fields: &[&str]) -> &mut Self {
        let args = fields.iter().map(|f| Value::String(f.to_string())).collect();
        self.op("select", vec![Value::Array(args)])
    }

    /// Records the terminal "first record" operation
    pub fn first(&mut self) -> &mut Self {
        self.op("first", vec![])
    }

    /// Records the terminal "last record" operation
    pub fn last(&mut self) -> &mut Self {
        self.op("last", vec![])
    }

    /// Records the terminal "find one matching" operation
    pub fn find(&mut self, spec: Value) -> &mut Self {
        self.op("find", vec![spec])
    }

    /// Builds a fresh execution context.
    ///
    /// The operations vector is a defensive copy; mutating the
    /// returned context never affects the live log.
    pub fn build_context(&self) -> ExecutionContext {
        ExecutionContext {
            operations: self.log.clone(),
            validators: self.validators.clone(),
            metadata: ContextMetadata {
                created_at: self.created_at,
                operation_count: self.log.len(),
                chain_depth: self.chain_calls,
            },
        }
    }

    /// Settles the query: builds a context and invokes the executor
    /// once.
    ///
    /// Each call is an independent settlement over the current log.
    pub async fn run(&self) -> Result<ExecutorOutput, DeferredError> {
        let context = self.build_context();
        let count = context.metadata.operation_count.to_string();
        Logger::log(
            Severity::Trace,
            "deferred_execute",
            &[("operations", count.as_str())],
        );

        match (self.executor)(context).await {
            Ok(output) => {
                Logger::log(Severity::Trace, "deferred_settled", &[("outcome", "ok")]);
                Ok(output)
            }
            Err(err) => {
                let reason = err.to_string();
                Logger::log_stderr(
                    Severity::Error,
                    "deferred_settled",
                    &[("outcome", "err"), ("reason", reason.as_str())],
                );
                Err(DeferredError::Executor(err))
            }
        }
    }

    /// Settles and maps a successful outcome; failures pass through.
    pub async fn then<T>(
        &self,
        on_ok: impl FnOnce(ExecutorOutput) -> T,
    ) -> Result<T, DeferredError> {
        self.run().await.map(on_ok)
    }

    /// Settles with a failure-only handler; success forwards
    /// transparently.
    pub async fn catch(
        &self,
        on_err: impl FnOnce(DeferredError) -> ExecutorOutput,
    ) -> ExecutorOutput {
        match self.run().await {
            Ok(output) => output,
            Err(err) => on_err(err),
        }
    }

    /// Settles and runs a finalizer regardless of outcome.
    ///
    /// The finalizer does not alter the settled value unless it itself
    /// fails, in which case its failure wins.
    pub async fn finally(
        &self,
        finalizer: impl FnOnce() -> Result<(), DeferredError>,
    ) -> Result<ExecutorOutput, DeferredError> {
        let settled = self.run().await;
        finalizer()?;
        settled
    }
}
