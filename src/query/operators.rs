//! Operator registry for the predicate compiler
//!
//! Canonical operator names carry the `$` prefix; each has at most one
//! short alias. Alias resolution is one-to-one and happens before
//! registry lookup.
//!
//! Built-in entries are process-wide and read-only. Caller-supplied
//! custom operators ("validators") are merged copy-on-construct; a
//! custom operator sharing a built-in canonical name overrides the
//! built-in for that registry only.

use std::collections::HashMap;
use std::sync::Arc;

use regex::Regex;
use serde_json::Value;

use crate::path;

use super::errors::{QueryError, QueryResult};

/// A compiled predicate: record in, match verdict out
pub type Predicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// A predicate constructor: `(field_path, argument) -> Predicate`
pub type OperatorFn = Arc<dyn Fn(&str, &Value) -> QueryResult<Predicate> + Send + Sync>;

/// Reserved combinator key: negates the sub-specification it wraps
pub const NOT: &str = "$not";

/// Per-field negation operator (scalar arg inverts equality, object
/// arg inverts the nested clause)
pub const NE: &str = "$ne";

/// Equality operator, used for literal values (rule 6)
pub const EQ: &str = "$eq";

/// Pattern-match operator, target of pattern-literal rewriting
pub const REGEX: &str = "$regex";

/// Short alias table: exactly one alias per canonical operator
const ALIASES: &[(&str, &str)] = &[
    ("=", "$eq"),
    ("!=", "$ne"),
    (">", "$gt"),
    ("<", "$lt"),
    (">=", "$gte"),
    ("<=", "$lte"),
    ("in", "$in"),
    ("includes", "$contains"),
];

/// Maps operator names to predicate constructors
#[derive(Clone)]
pub struct OperatorRegistry {
    ops: HashMap<String, OperatorFn>,
}

impl OperatorRegistry {
    /// Creates a registry holding only the built-in operators
    pub fn builtin() -> Self {
        let mut ops: HashMap<String, OperatorFn> = HashMap::new();
        ops.insert("$eq".to_string(), Arc::new(op_eq));
        ops.insert("$gt".to_string(), Arc::new(op_gt));
        ops.insert("$gte".to_string(), Arc::new(op_gte));
        ops.insert("$lt".to_string(), Arc::new(op_lt));
        ops.insert("$lte".to_string(), Arc::new(op_lte));
        ops.insert("$in".to_string(), Arc::new(op_in));
        ops.insert("$contains".to_string(), Arc::new(op_contains));
        ops.insert("$exists".to_string(), Arc::new(op_exists));
        ops.insert("$regex".to_string(), Arc::new(op_regex));
        Self { ops }
    }

    /// Creates a registry of built-ins plus caller-supplied validators.
    ///
    /// A validator sharing a built-in canonical name overrides the
    /// built-in in this registry; the shared built-in table is never
    /// mutated.
    pub fn with_validators(validators: &HashMap<String, OperatorFn>) -> Self {
        let mut registry = Self::builtin();
        for (name, op) in validators {
            registry.ops.insert(name.clone(), op.clone());
        }
        registry
    }

    /// Resolves a short alias to its canonical name.
    ///
    /// Names without an alias entry (canonical and custom names alike)
    /// resolve to themselves.
    pub fn resolve<'a>(&self, name: &'a str) -> &'a str {
        ALIASES
            .iter()
            .find(|(alias, _)| *alias == name)
            .map_or(name, |(_, canonical)| *canonical)
    }

    /// Returns whether a name (canonical, alias, or custom) is a
    /// recognized operator.
    ///
    /// The negation names are recognized even though they have no
    /// registry entry; the compiler handles them structurally.
    pub fn is_recognized(&self, name: &str) -> bool {
        let canonical = self.resolve(name);
        canonical == NOT || canonical == NE || self.ops.contains_key(canonical)
    }

    /// Looks up the constructor for a canonical name
    pub fn get(&self, canonical: &str) -> Option<&OperatorFn> {
        self.ops.get(canonical)
    }
}

impl Default for OperatorRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Coerces a JSON value to a number for range comparisons.
///
/// Numbers pass through, numeric strings parse, everything else
/// (missing fields included) coerces to 0.
pub fn coerce_number(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        Some(Value::Bool(true)) => 1.0,
        _ => 0.0,
    }
}

/// Stringifies a field value for pattern matching.
///
/// Objects, arrays, and missing fields have no string form and never
/// match a pattern.
fn stringify(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn op_eq(field: &str, arg: &Value) -> QueryResult<Predicate> {
    let field = field.to_string();
    let expected = arg.clone();
    Ok(Arc::new(move |record| match path::get(record, &field) {
        Some(actual) => *actual == expected,
        None => expected.is_null(),
    }))
}

fn range_op(
    field: &str,
    arg: &Value,
    cmp: fn(f64, f64) -> bool,
) -> QueryResult<Predicate> {
    let field = field.to_string();
    let bound = coerce_number(Some(arg));
    Ok(Arc::new(move |record| {
        cmp(coerce_number(path::get(record, &field)), bound)
    }))
}

fn op_gt(field: &str, arg: &Value) -> QueryResult<Predicate> {
    range_op(field, arg, |a, b| a > b)
}

fn op_gte(field: &str, arg: &Value) -> QueryResult<Predicate> {
    range_op(field, arg, |a, b| a >= b)
}

fn op_lt(field: &str, arg: &Value) -> QueryResult<Predicate> {
    range_op(field, arg, |a, b| a < b)
}

fn op_lte(field: &str, arg: &Value) -> QueryResult<Predicate> {
    range_op(field, arg, |a, b| a <= b)
}

fn op_in(field: &str, arg: &Value) -> QueryResult<Predicate> {
    let set = match arg.as_array() {
        Some(values) => values.clone(),
        None => {
            return Err(QueryError::invalid_argument(
                "$in",
                field,
                "expected an array of candidate values",
            ))
        }
    };
    let field = field.to_string();
    Ok(Arc::new(move |record| {
        path::get(record, &field).is_some_and(|v| set.contains(v))
    }))
}

fn op_contains(field: &str, arg: &Value) -> QueryResult<Predicate> {
    let field = field.to_string();
    let needle = arg.clone();
    Ok(Arc::new(move |record| {
        path::get(record, &field)
            .and_then(Value::as_array)
            .is_some_and(|items| items.contains(&needle))
    }))
}

fn op_exists(field: &str, arg: &Value) -> QueryResult<Predicate> {
    let want = match arg.as_bool() {
        Some(b) => b,
        None => {
            return Err(QueryError::invalid_argument(
                "$exists",
                field,
                "expected a boolean",
            ))
        }
    };
    let field = field.to_string();
    Ok(Arc::new(move |record| path::has(record, &field) == want))
}

fn op_regex(field: &str, arg: &Value) -> QueryResult<Predicate> {
    let pattern = match arg.as_str() {
        Some(p) => p,
        None => {
            return Err(QueryError::invalid_argument(
                "$regex",
                field,
                "expected a pattern string",
            ))
        }
    };
    if pattern.is_empty() {
        return Err(QueryError::EmptyPattern(field.to_string()));
    }
    let regex = Regex::new(pattern).map_err(|e| QueryError::InvalidPattern {
        field: field.to_string(),
        reason: e.to_string(),
    })?;
    let field = field.to_string();
    Ok(Arc::new(move |record| {
        path::get(record, &field)
            .and_then(stringify)
            .is_some_and(|text| regex.is_match(&text))
    }))
}
