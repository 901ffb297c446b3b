//! Extension registry ("macros")
//!
//! Named operations attached either to every collection built by one
//! factory (the shared table) or to a single instance (the overlay).
//! Shared names are write-once: re-registering an existing name is an
//! error and leaves the table unchanged. The table sits behind an
//! `RwLock`, so concurrent registration of distinct names is safe and
//! the loser of a same-name race observes the collision error.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde_json::Value;

use super::errors::{CollectionError, CollectionResult};
use super::Collection;

/// An extension body, invoked with the owning collection as receiver
pub type ExtensionFn =
    Arc<dyn Fn(&mut Collection, &[Value]) -> CollectionResult<Value> + Send + Sync>;

/// The shared, write-once-per-name extension table
pub struct SharedExtensions {
    table: RwLock<HashMap<String, ExtensionFn>>,
}

impl SharedExtensions {
    /// Creates an empty table
    pub fn new() -> Self {
        Self {
            table: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a shared extension.
    ///
    /// Fails with `ExtensionExists` if the name is taken; the existing
    /// entry is never overwritten.
    pub fn register(&self, name: &str, f: ExtensionFn) -> CollectionResult<()> {
        let mut table = self
            .table
            .write()
            .map_err(|_| CollectionError::ExtensionTablePoisoned)?;
        if table.contains_key(name) {
            return Err(CollectionError::ExtensionExists(name.to_string()));
        }
        table.insert(name.to_string(), f);
        Ok(())
    }

    /// Looks up a shared extension by name
    pub fn get(&self, name: &str) -> Option<ExtensionFn> {
        self.table.read().ok()?.get(name).cloned()
    }

    /// Returns the registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .table
            .read()
            .map(|t| t.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }
}

impl Default for SharedExtensions {
    fn default() -> Self {
        Self::new()
    }
}
