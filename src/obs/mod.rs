//! Observability for sievedb
//!
//! Structured, synchronous JSON logging. Events are emitted for shared
//! extension registration and deferred query settlement.

mod logger;

pub use logger::{Logger, Severity};
