//! sievedb - declarative querying over in-memory JSON record collections
//!
//! MongoDB-style filtering, aggregation, and deferred query
//! construction for ordered collections of `serde_json::Value`
//! records.
//!
//! - `path`: dot-path resolution inside nested records
//! - `query`: operator registry and recursive predicate compiler
//! - `collection`: ordered record collections with query-driven
//!   operations and an extension registry
//! - `deferred`: operation logs settled by a caller-supplied executor
//! - `obs`: structured logging

pub mod collection;
pub mod deferred;
pub mod obs;
pub mod path;
pub mod query;
