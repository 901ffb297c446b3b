//! Collection factory
//!
//! Holds the shared extension table so "type-level" extensions are
//! explicit, injectable state rather than process globals. Every
//! collection built by one factory sees the same shared table;
//! instance-level registration stays local to one collection.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::obs::{Logger, Severity};
use crate::query::OperatorFn;

use super::errors::CollectionResult;
use super::extensions::{ExtensionFn, SharedExtensions};
use super::Collection;

/// Builds collections bound to one shared extension table
#[derive(Clone, Default)]
pub struct CollectionFactory {
    shared: Arc<SharedExtensions>,
}

impl CollectionFactory {
    /// Creates a factory with an empty shared table
    pub fn new() -> Self {
        Self {
            shared: Arc::new(SharedExtensions::new()),
        }
    }

    /// Registers a shared extension visible to every collection built
    /// by this factory.
    ///
    /// Names are write-once; re-registering an existing name fails and
    /// has no effect.
    pub fn register(&self, name: &str, f: ExtensionFn) -> CollectionResult<()> {
        match self.shared.register(name, f) {
            Ok(()) => {
                Logger::log(
                    Severity::Info,
                    "extension_registered",
                    &[("name", name), ("scope", "shared")],
                );
                Ok(())
            }
            Err(err) => {
                Logger::log_stderr(
                    Severity::Warn,
                    "extension_collision",
                    &[("name", name)],
                );
                Err(err)
            }
        }
    }

    /// Builds a collection from an initial sequence (copied on intake)
    pub fn collection(&self, records: &[Value]) -> Collection {
        Collection::with_shared(records, Arc::clone(&self.shared), &HashMap::new())
    }

    /// Builds a collection with caller-supplied custom operators
    pub fn collection_with_validators(
        &self,
        records: &[Value],
        validators: &HashMap<String, OperatorFn>,
    ) -> Collection {
        Collection::with_shared(records, Arc::clone(&self.shared), validators)
    }
}
