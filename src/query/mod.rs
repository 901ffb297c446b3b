//! Query subsystem: operator registry and predicate compiler
//!
//! A query specification is a plain nested JSON object whose keys are
//! dot-separated field paths or the `$not` combinator, and whose values
//! are literals, pattern literals, operator clauses, or nested
//! specifications. Compilation produces a single `Predicate` closure;
//! all sibling clauses combine with logical AND.
//!
//! # Operator vocabulary
//!
//! | Alias      | Canonical   | Meaning                         |
//! |------------|-------------|---------------------------------|
//! | `=`        | `$eq`       | field equals value              |
//! | `!=`       | `$ne`       | not equal / inverted clause     |
//! | `>`        | `$gt`       | numeric greater-than            |
//! | `<`        | `$lt`       | numeric less-than               |
//! | `>=`       | `$gte`      | numeric greater-or-equal        |
//! | `<=`       | `$lte`      | numeric less-or-equal           |
//! | `in`       | `$in`       | value in enumerated set         |
//! | `includes` | `$contains` | array field contains value      |
//!
//! `$exists` and `$regex` are canonical-only; `$not` negates a whole
//! sub-specification.

mod compiler;
mod errors;
mod operators;

pub use compiler::PredicateCompiler;
pub use errors::{QueryError, QueryResult};
pub use operators::{coerce_number, OperatorFn, OperatorRegistry, Predicate, NOT};
