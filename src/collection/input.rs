//! Tagged input variants for collection operations
//!
//! The call boundary decides once whether an argument is a declarative
//! specification, a predicate function, a field path, or a comparator;
//! the engine never sniffs argument shapes at runtime.

use std::cmp::Ordering;
use std::sync::Arc;

use serde_json::Value;

use crate::path;
use crate::query::Predicate;

/// What to match records against: a declarative specification or a
/// predicate function
#[derive(Clone)]
pub enum Matcher {
    /// A declarative query specification (compiled on use)
    Spec(Value),
    /// A caller-supplied predicate
    Func(Predicate),
}

impl Matcher {
    /// Wraps a predicate function
    pub fn func(f: impl Fn(&Value) -> bool + Send + Sync + 'static) -> Self {
        Self::Func(Arc::new(f))
    }
}

impl From<Value> for Matcher {
    fn from(spec: Value) -> Self {
        Self::Spec(spec)
    }
}

/// The shapes accepted by `Collection::every`
#[derive(Clone)]
pub enum EveryCheck {
    /// Every record matches the given matcher
    Matcher(Matcher),
    /// Every record has a defined value at the path
    Path(String),
    /// Every record equals the value at the path
    PathValue(String, Value),
    /// Every record satisfies `path <operator> value`
    PathOpValue(String, String, Value),
}

impl EveryCheck {
    /// Check a declarative specification
    pub fn spec(spec: Value) -> Self {
        Self::Matcher(Matcher::Spec(spec))
    }

    /// Check a predicate function
    pub fn func(f: impl Fn(&Value) -> bool + Send + Sync + 'static) -> Self {
        Self::Matcher(Matcher::func(f))
    }

    /// Check that a field path is present on every record
    pub fn path(path: impl Into<String>) -> Self {
        Self::Path(path.into())
    }

    /// Check `path == value` on every record
    pub fn path_value(path: impl Into<String>, value: Value) -> Self {
        Self::PathValue(path.into(), value)
    }

    /// Check `path <operator> value` on every record
    pub fn path_op_value(
        path: impl Into<String>,
        operator: impl Into<String>,
        value: Value,
    ) -> Self {
        Self::PathOpValue(path.into(), operator.into(), value)
    }
}

impl From<Matcher> for EveryCheck {
    fn from(matcher: Matcher) -> Self {
        Self::Matcher(matcher)
    }
}

impl From<Value> for EveryCheck {
    fn from(spec: Value) -> Self {
        Self::spec(spec)
    }
}

/// What `Collection::update` merges into matching records
#[derive(Clone)]
pub enum Patch {
    /// A literal patch object; dotted keys deep-merge, and string
    /// values of the form `{{dot.path}}` resolve against the record's
    /// pre-update snapshot
    Fields(Value),
    /// A function from the pre-update record to a patch object
    Func(Arc<dyn Fn(&Value) -> Value + Send + Sync>),
}

impl Patch {
    /// Wraps a patch-producing function
    pub fn func(f: impl Fn(&Value) -> Value + Send + Sync + 'static) -> Self {
        Self::Func(Arc::new(f))
    }

    /// Produces the concrete patch object for one record snapshot.
    pub(crate) fn resolve(&self, snapshot: &Value) -> Value {
        match self {
            Self::Fields(fields) => resolve_templates(fields, snapshot),
            Self::Func(f) => f(snapshot),
        }
    }
}

impl From<Value> for Patch {
    fn from(fields: Value) -> Self {
        Self::Fields(fields)
    }
}

/// Replaces `{{dot.path}}` string values with the snapshot's value at
/// that path. Unresolvable references become null, consistent with the
/// missing-field fallback everywhere else.
fn resolve_templates(patch: &Value, snapshot: &Value) -> Value {
    match patch {
        Value::String(s) => match template_path(s) {
            Some(p) => path::get(snapshot, p).cloned().unwrap_or(Value::Null),
            None => patch.clone(),
        },
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), resolve_templates(v, snapshot)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items.iter().map(|v| resolve_templates(v, snapshot)).collect(),
        ),
        other => other.clone(),
    }
}

fn template_path(s: &str) -> Option<&str> {
    let inner = s.strip_prefix("{{")?.strip_suffix("}}")?;
    if inner.is_empty() {
        None
    } else {
        Some(inner)
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }

    /// Parses `"asc"` / `"desc"` (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }
}

/// What `Collection::sort` orders by
#[derive(Clone)]
pub enum SortKey {
    /// Resolve a dotted field path on each record
    Path(String, SortDirection),
    /// A comparator that bypasses path resolution entirely
    Comparator(Arc<dyn Fn(&Value, &Value) -> Ordering + Send + Sync>),
}

impl SortKey {
    /// Sort ascending by a field path
    pub fn asc(path: impl Into<String>) -> Self {
        Self::Path(path.into(), SortDirection::Asc)
    }

    /// Sort descending by a field path
    pub fn desc(path: impl Into<String>) -> Self {
        Self::Path(path.into(), SortDirection::Desc)
    }

    /// Sort with a comparator
    pub fn comparator(f: impl Fn(&Value, &Value) -> Ordering + Send + Sync + 'static) -> Self {
        Self::Comparator(Arc::new(f))
    }
}

/// How `group_by` / `count_by` / `unique` derive a record's key
#[derive(Clone)]
pub enum KeyFn {
    /// Resolve a dotted field path and stringify the scalar there
    Path(String),
    /// A caller-supplied key function
    Func(Arc<dyn Fn(&Value) -> String + Send + Sync>),
}

impl KeyFn {
    /// Derive keys from a field path
    pub fn path(path: impl Into<String>) -> Self {
        Self::Path(path.into())
    }

    /// Derive keys with a function
    pub fn func(f: impl Fn(&Value) -> String + Send + Sync + 'static) -> Self {
        Self::Func(Arc::new(f))
    }
}
