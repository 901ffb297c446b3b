//! Recursive predicate compiler
//!
//! Turns a declarative query specification (a nested JSON object) into
//! a single executable predicate. For each key of the specification:
//!
//! 1. The `$not` combinator compiles its sub-spec at the same path
//!    prefix and negates it
//! 2. Other keys extend the dot-joined field path
//! 3. A pattern literal (`"/expr/"`) is rewritten to a `$regex` clause
//! 4. An object whose keys are ALL recognized operator names is an
//!    operator clause; one predicate is built per operator and the
//!    results are ANDed
//! 5. Any other object recurses as nested fields
//! 6. Any other value compiles to an equality predicate
//!
//! Sibling predicates always combine with logical AND; there is no
//! implicit OR.
//!
//! # Precedence caveat
//!
//! Rule 4 wins over rule 5: a literal object field whose keys all
//! happen to collide with operator names compiles as an operator
//! clause. An object mixing recognized and unrecognized keys falls
//! through to rule 5 and is matched as nested fields, so unknown names
//! in that position are not an error.

use serde_json::Value;

use crate::path;

use super::errors::{QueryError, QueryResult};
use super::operators::{OperatorRegistry, Predicate, EQ, NE, NOT, REGEX};

use std::sync::Arc;

/// Compiles query specifications against one operator registry
#[derive(Clone, Default)]
pub struct PredicateCompiler {
    registry: OperatorRegistry,
}

impl PredicateCompiler {
    /// Creates a compiler over the given registry
    pub fn new(registry: OperatorRegistry) -> Self {
        Self { registry }
    }

    /// Returns the bound operator registry
    pub fn registry(&self) -> &OperatorRegistry {
        &self.registry
    }

    /// Compiles a specification into a single predicate.
    ///
    /// An empty specification compiles to an always-true predicate.
    pub fn compile(&self, spec: &Value) -> QueryResult<Predicate> {
        self.compile_at(spec, "")
    }

    fn compile_at(&self, spec: &Value, prefix: &str) -> QueryResult<Predicate> {
        let object = spec
            .as_object()
            .ok_or_else(|| QueryError::SpecNotObject(type_name(spec).to_string()))?;

        let mut predicates = Vec::with_capacity(object.len());
        for (key, value) in object {
            if key == NOT {
                predicates.push(negate(self.compile_at(value, prefix)?));
                continue;
            }

            let field = join(prefix, key);
            path::validate(&field)?;
            predicates.push(self.compile_entry(&field, value)?);
        }
        Ok(all_of(predicates))
    }

    /// Compiles a single `field: value` entry (rules 3-6).
    fn compile_entry(&self, field: &str, value: &Value) -> QueryResult<Predicate> {
        // Rule 3: pattern literal rewrites to a $regex clause
        if let Some(pattern) = pattern_literal(value) {
            if pattern.is_empty() {
                return Err(QueryError::EmptyPattern(field.to_string()));
            }
            return self.build(REGEX, field, &Value::String(pattern.to_string()));
        }

        if let Some(object) = value.as_object() {
            // Rule 4: operator clause
            if !object.is_empty() && object.keys().all(|k| self.registry.is_recognized(k)) {
                let mut predicates = Vec::with_capacity(object.len());
                for (name, arg) in object {
                    let canonical = self.registry.resolve(name);
                    if canonical == NE || canonical == NOT {
                        // Nested boolean negation: an object argument
                        // compiles recursively before inversion
                        predicates.push(negate(self.compile_entry(field, arg)?));
                    } else {
                        predicates.push(self.build(canonical, field, arg)?);
                    }
                }
                return Ok(all_of(predicates));
            }

            // Rule 5: nested fields
            return self.compile_at(value, field);
        }

        // Rule 6: literal equality
        self.build(EQ, field, value)
    }

    fn build(&self, canonical: &str, field: &str, arg: &Value) -> QueryResult<Predicate> {
        let op = self
            .registry
            .get(canonical)
            .ok_or_else(|| QueryError::UnknownOperator(canonical.to_string()))?;
        op(field, arg)
    }
}

/// Recognizes a pattern literal: a string wrapped in `/` delimiters.
///
/// Returns the inner expression; `"//"` yields the empty pattern,
/// which the compiler rejects.
fn pattern_literal(value: &Value) -> Option<&str> {
    let s = value.as_str()?;
    if s.len() >= 2 && s.starts_with('/') && s.ends_with('/') {
        Some(&s[1..s.len() - 1])
    } else {
        None
    }
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

fn negate(predicate: Predicate) -> Predicate {
    Arc::new(move |record| !predicate(record))
}

fn all_of(predicates: Vec<Predicate>) -> Predicate {
    Arc::new(move |record| predicates.iter().all(|p| p(record)))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
