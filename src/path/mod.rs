//! Dot-path resolution over nested JSON records
//!
//! Field paths are dot-separated strings addressing nested fields
//! (`"a.b.c"` reads `record["a"]["b"]["c"]`).
//!
//! # Resolution rules
//!
//! - Missing intermediates resolve to nothing, never an error
//! - Non-object intermediates resolve to nothing on read
//! - `set` creates intermediate objects and preserves sibling fields
//! - Only the path shape itself can be invalid (empty path or segment)

use serde_json::{Map, Value};
use thiserror::Error;

/// Result type for path operations
pub type PathResult<T> = Result<T, PathError>;

/// Structural errors for field paths
///
/// Data-shape irregularities (missing fields, scalar intermediates) are
/// not errors; they resolve to the documented fallback.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PathError {
    /// The path string is empty
    #[error("Field path must not be empty")]
    Empty,

    /// The path contains an empty segment (e.g. "a..b" or "a.")
    #[error("Field path {0:?} contains an empty segment")]
    EmptySegment(String),
}

/// Validates the shape of a field path.
///
/// Call once at the API boundary; resolution itself never fails.
pub fn validate(path: &str) -> PathResult<()> {
    if path.is_empty() {
        return Err(PathError::Empty);
    }
    if path.split('.').any(str::is_empty) {
        return Err(PathError::EmptySegment(path.to_string()));
    }
    Ok(())
}

/// Reads the value at a dotted path.
///
/// Returns `None` when any intermediate segment is missing or not an
/// object.
pub fn get<'a>(record: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = record;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Reads the value at a dotted path, falling back when absent.
pub fn get_or<'a>(record: &'a Value, path: &str, fallback: &'a Value) -> &'a Value {
    get(record, path).unwrap_or(fallback)
}

/// Returns whether the full path resolves to a defined, non-null value.
pub fn has(record: &Value, path: &str) -> bool {
    matches!(get(record, path), Some(v) if !v.is_null())
}

/// Writes a value at a dotted path.
///
/// Creates intermediate objects as needed and never discards sibling
/// fields. A non-object intermediate (including the record root) is
/// replaced by an object so the write always lands.
pub fn set(record: &mut Value, path: &str, value: Value) {
    let mut current = record;
    let mut segments = path.split('.').peekable();

    while let Some(segment) = segments.next() {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        // The is_object guard above makes this lookup infallible
        let map = match current.as_object_mut() {
            Some(m) => m,
            None => return,
        };

        if segments.peek().is_none() {
            map.insert(segment.to_string(), value);
            return;
        }

        current = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
}

/// Removes and returns the value at a dotted path.
///
/// Returns `None` when the path does not resolve; sibling fields and
/// intermediate objects are left untouched.
pub fn remove(record: &mut Value, path: &str) -> Option<Value> {
    let mut current = record;
    let mut segments = path.split('.').peekable();

    while let Some(segment) = segments.next() {
        let map = current.as_object_mut()?;
        if segments.peek().is_none() {
            return map.remove(segment);
        }
        current = map.get_mut(segment)?;
    }
    None
}
