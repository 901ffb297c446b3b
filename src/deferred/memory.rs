//! Default in-memory interpretation strategy
//!
//! Interprets an operation log against a shared, mutable record store
//! by compiling each declarative specification with the predicate
//! compiler. This executor is optional; any function matching the
//! executor contract can replace it.

use std::sync::{Arc, RwLock};

use futures_util::FutureExt;
use serde_json::{Map, Value};

use crate::collection::{SortDirection, SortKey};
use crate::path;
use crate::query::{OperatorRegistry, PredicateCompiler};

use super::context::ExecutionContext;
use super::errors::ExecutorError;
use super::{Executor, ExecutorOutput};

/// Interprets operation logs against an in-memory record store.
///
/// The store is shared behind a lock so the backing data may change
/// between settlements; each settlement works on a snapshot taken at
/// invocation time.
pub struct MemoryExecutor {
    records: Arc<RwLock<Vec<Value>>>,
}

impl MemoryExecutor {
    /// Creates an executor over an initial record sequence
    pub fn new(records: Vec<Value>) -> Self {
        Self {
            records: Arc::new(RwLock::new(records)),
        }
    }

    /// A handle to the backing store, for mutating between settlements
    pub fn store(&self) -> Arc<RwLock<Vec<Value>>> {
        Arc::clone(&self.records)
    }

    /// Builds the executor function for `DeferredQuery`
    pub fn executor(&self) -> Executor {
        let records = Arc::clone(&self.records);
        Arc::new(move |context: ExecutionContext| {
            let records = Arc::clone(&records);
            async move { interpret(&records, context) }.boxed()
        })
    }
}

fn interpret(
    store: &RwLock<Vec<Value>>,
    context: ExecutionContext,
) -> Result<ExecutorOutput, ExecutorError> {
    let mut rows = store
        .read()
        .map_err(|_| ExecutorError::Failed("record store lock poisoned".to_string()))?
        .clone();

    let registry = match &context.validators {
        Some(validators) => OperatorRegistry::with_validators(validators),
        None => OperatorRegistry::builtin(),
    };
    let compiler = PredicateCompiler::new(registry);

    for entry in &context.operations {
        match entry.op.as_str() {
            "where" | "filter" | "find" => {
                let spec = first_arg(&entry.op, &entry.args)?;
                let predicate = compiler.compile(spec)?;
                rows.retain(|r| predicate(r));
            }
            "exclude" => {
                let spec = first_arg(&entry.op, &entry.args)?;
                let predicate = compiler.compile(spec)?;
                rows.retain(|r| !predicate(r));
            }
            "sort" => {
                let field = first_arg(&entry.op, &entry.args)?
                    .as_str()
                    .ok_or_else(|| {
                        ExecutorError::invalid_arguments("sort", "expected a field path string")
                    })?;
                // An absent direction defaults; a present one must be
                // a parseable string
                let direction = match entry.args.get(1) {
                    None => SortDirection::Asc,
                    Some(arg) => arg.as_str().and_then(SortDirection::parse).ok_or_else(
                        || {
                            ExecutorError::invalid_arguments(
                                "sort",
                                "direction must be asc or desc",
                            )
                        },
                    )?,
                };
                let key = match direction {
                    SortDirection::Asc => SortKey::asc(field),
                    SortDirection::Desc => SortKey::desc(field),
                };
                crate::collection::sort::sort_records(&mut rows, &key);
            }
            "limit" => {
                let count = count_arg(&entry.op, &entry.args)?;
                rows.truncate(count);
            }
            "skip" => {
                let count = count_arg(&entry.op, &entry.args)?.min(rows.len());
                rows.drain(..count);
            }
            "select" => {
                let fields = first_arg(&entry.op, &entry.args)?
                    .as_array()
                    .ok_or_else(|| {
                        ExecutorError::invalid_arguments("select", "expected an array of paths")
                    })?;
                let mut paths = Vec::with_capacity(fields.len());
                for field in fields {
                    paths.push(field.as_str().ok_or_else(|| {
                        ExecutorError::invalid_arguments("select", "paths must be strings")
                    })?);
                }
                rows = rows.iter().map(|r| project(r, &paths)).collect();
            }
            // Positional terminals; resolved after the walk
            "first" | "last" => {}
            other => return Err(ExecutorError::UnsupportedOperation(other.to_string())),
        }
    }

    // The most recent entry's name decides the output shape
    Ok(match context.last_operation() {
        Some("first") | Some("find") => ExecutorOutput::One(rows.first().cloned()),
        Some("last") => ExecutorOutput::One(rows.last().cloned()),
        _ => ExecutorOutput::Many(rows),
    })
}

fn first_arg<'a>(op: &str, args: &'a [Value]) -> Result<&'a Value, ExecutorError> {
    args.first()
        .ok_or_else(|| ExecutorError::invalid_arguments(op, "missing argument"))
}

fn count_arg(op: &str, args: &[Value]) -> Result<usize, ExecutorError> {
    first_arg(op, args)?
        .as_u64()
        .map(|n| n as usize)
        .ok_or_else(|| ExecutorError::invalid_arguments(op, "expected a non-negative count"))
}

fn project(record: &Value, paths: &[&str]) -> Value {
    let mut out = Value::Object(Map::new());
    for p in paths {
        if let Some(value) = path::get(record, p) {
            path::set(&mut out, p, value.clone());
        }
    }
    out
}
