//! Collection engine
//!
//! An ordered, mutable sequence of JSON records exposing query-driven
//! operations built on the predicate compiler, plus an extension
//! registry for shared or per-instance operations.
//!
//! # Guarantees
//!
//! - Construction copies the input sequence; the caller's data is
//!   never aliased
//! - `filter` / `exclude` partition a collection completely: every
//!   record lands in exactly one side
//! - `delete` has selection semantics identical to `filter`
//! - `update` computes each record's patch from that record's own
//!   pre-mutation snapshot, so application order cannot change the
//!   final state
//! - Structural query errors fail fast; records that merely fail to
//!   match never raise

mod errors;
mod extensions;
mod factory;
mod input;
pub(crate) mod sort;

pub use errors::{CollectionError, CollectionResult};
pub use extensions::{ExtensionFn, SharedExtensions};
pub use factory::CollectionFactory;
pub use input::{EveryCheck, KeyFn, Matcher, Patch, SortDirection, SortKey};

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use rand::seq::SliceRandom;
use serde_json::{Map, Value};

use crate::path;
use crate::query::{OperatorFn, OperatorRegistry, Predicate, PredicateCompiler};

/// An ordered, mutable collection of JSON records with a bound
/// predicate compiler
#[derive(Clone)]
pub struct Collection {
    records: Vec<Value>,
    compiler: PredicateCompiler,
    instance_extensions: HashMap<String, ExtensionFn>,
    shared: Arc<SharedExtensions>,
}

impl Collection {
    /// Creates a collection from an initial sequence.
    ///
    /// Records are copied on intake; the input is never mutated.
    pub fn new(records: &[Value]) -> Self {
        Self::with_shared(records, Arc::new(SharedExtensions::new()), &HashMap::new())
    }

    /// Creates a collection with caller-supplied custom operators.
    ///
    /// A validator sharing a built-in canonical name overrides the
    /// built-in for this collection only.
    pub fn with_validators(records: &[Value], validators: &HashMap<String, OperatorFn>) -> Self {
        Self::with_shared(records, Arc::new(SharedExtensions::new()), validators)
    }

    pub(crate) fn with_shared(
        records: &[Value],
        shared: Arc<SharedExtensions>,
        validators: &HashMap<String, OperatorFn>,
    ) -> Self {
        let registry = if validators.is_empty() {
            OperatorRegistry::builtin()
        } else {
            OperatorRegistry::with_validators(validators)
        };
        Self {
            records: records.to_vec(),
            compiler: PredicateCompiler::new(registry),
            instance_extensions: HashMap::new(),
            shared,
        }
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the collection holds no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The records in order
    pub fn records(&self) -> &[Value] {
        &self.records
    }

    /// Iterates the records in order
    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.records.iter()
    }

    /// Consumes the collection, yielding its records
    pub fn into_records(self) -> Vec<Value> {
        self.records
    }

    fn predicate_for(&self, matcher: &Matcher) -> CollectionResult<Predicate> {
        match matcher {
            Matcher::Spec(spec) => Ok(self.compiler.compile(spec)?),
            Matcher::Func(f) => Ok(f.clone()),
        }
    }

    /// A new collection carrying this one's compiler and extensions
    fn derived(&self, records: Vec<Value>) -> Collection {
        Collection {
            records,
            compiler: self.compiler.clone(),
            instance_extensions: self.instance_extensions.clone(),
            shared: Arc::clone(&self.shared),
        }
    }

    /// Returns a new collection of the records matching the matcher,
    /// in original order.
    pub fn filter(&self, matcher: impl Into<Matcher>) -> CollectionResult<Collection> {
        let predicate = self.predicate_for(&matcher.into())?;
        Ok(self.derived(
            self.records
                .iter()
                .filter(|r| predicate(r))
                .cloned()
                .collect(),
        ))
    }

    /// Complement of `filter`: the records that do NOT match.
    pub fn exclude(&self, matcher: impl Into<Matcher>) -> CollectionResult<Collection> {
        let predicate = self.predicate_for(&matcher.into())?;
        Ok(self.derived(
            self.records
                .iter()
                .filter(|r| !predicate(r))
                .cloned()
                .collect(),
        ))
    }

    /// First matching record in iteration order, or the first record
    /// when no matcher is given.
    pub fn find_first(&self, matcher: Option<Matcher>) -> CollectionResult<Option<&Value>> {
        match matcher {
            None => Ok(self.records.first()),
            Some(m) => {
                let predicate = self.predicate_for(&m)?;
                Ok(self.records.iter().find(|r| predicate(r)))
            }
        }
    }

    /// Last matching record in iteration order, or the last record
    /// when no matcher is given.
    pub fn find_last(&self, matcher: Option<Matcher>) -> CollectionResult<Option<&Value>> {
        match matcher {
            None => Ok(self.records.last()),
            Some(m) => {
                let predicate = self.predicate_for(&m)?;
                Ok(self.records.iter().rev().find(|r| predicate(r)))
            }
        }
    }

    /// True iff every record satisfies the check.
    ///
    /// An empty collection vacuously satisfies any check.
    pub fn every(&self, check: impl Into<EveryCheck>) -> CollectionResult<bool> {
        let predicate: Predicate = match check.into() {
            EveryCheck::Matcher(m) => self.predicate_for(&m)?,
            EveryCheck::Path(p) => {
                path::validate(&p)?;
                Arc::new(move |r: &Value| path::has(r, &p))
            }
            EveryCheck::PathValue(p, value) => {
                let mut spec = Map::new();
                spec.insert(p, value);
                self.compiler.compile(&Value::Object(spec))?
            }
            EveryCheck::PathOpValue(p, op, value) => {
                // The operator position is explicit here, so an
                // unknown name is an error, never a nested literal
                if !self.compiler.registry().is_recognized(&op) {
                    return Err(crate::query::QueryError::UnknownOperator(op).into());
                }
                let mut clause = Map::new();
                clause.insert(op, value);
                let mut spec = Map::new();
                spec.insert(p, Value::Object(clause));
                self.compiler.compile(&Value::Object(spec))?
            }
        };
        Ok(self.records.iter().all(|r| predicate(r)))
    }

    /// Merges a patch into every matching record (all records when the
    /// specification is omitted) and returns the count touched.
    ///
    /// Each record's patch is computed from its own pre-mutation
    /// snapshot, so the final state is independent of application
    /// order. Dotted patch keys deep-merge without discarding
    /// siblings.
    ///
    /// A literal patch is checked before any record is written; a
    /// function patch is checked per record, before that record is
    /// written.
    pub fn update(&mut self, spec: Option<&Value>, patch: &Patch) -> CollectionResult<usize> {
        let predicate = match spec {
            Some(s) => Some(self.compiler.compile(s)?),
            None => None,
        };

        // Template resolution never changes keys, so validating the
        // literal keys up front covers every record
        if let Patch::Fields(fields) = patch {
            check_patch_object(fields)?;
        }

        let mut touched = 0;
        for record in &mut self.records {
            if predicate.as_ref().is_some_and(|p| !p(record)) {
                continue;
            }
            let snapshot = record.clone();
            let resolved = patch.resolve(&snapshot);
            let fields = check_patch_object(&resolved)?;
            for (key, value) in fields {
                path::set(record, key, value.clone());
            }
            touched += 1;
        }
        Ok(touched)
    }

    /// Removes matching records in place, preserving the relative
    /// order of the remainder, and returns the removed count.
    ///
    /// Selection semantics are identical to `filter` / `exclude`.
    pub fn delete(&mut self, matcher: impl Into<Matcher>) -> CollectionResult<usize> {
        let predicate = self.predicate_for(&matcher.into())?;
        let before = self.records.len();
        self.records.retain(|r| !predicate(r));
        Ok(before - self.records.len())
    }

    /// Sorts records in place (stable) and returns the collection for
    /// chaining.
    ///
    /// Missing field values sort to the end ascending and to the start
    /// descending; a comparator bypasses path resolution entirely.
    pub fn sort(&mut self, key: SortKey) -> &mut Self {
        sort::sort_records(&mut self.records, &key);
        self
    }

    /// Shuffles records in place
    pub fn shuffle(&mut self) -> &mut Self {
        self.records.shuffle(&mut rand::thread_rng());
        self
    }

    /// Partitions records by a derived key.
    ///
    /// Records with a missing or non-scalar key land in the
    /// `"undefined"` bucket rather than being dropped.
    pub fn group_by(&self, key: &KeyFn) -> CollectionResult<BTreeMap<String, Vec<Value>>> {
        if let KeyFn::Path(p) = key {
            path::validate(p)?;
        }
        let mut groups: BTreeMap<String, Vec<Value>> = BTreeMap::new();
        for record in &self.records {
            groups
                .entry(derive_key(key, record))
                .or_default()
                .push(record.clone());
        }
        Ok(groups)
    }

    /// Counts records by a derived key
    pub fn count_by(&self, key: &KeyFn) -> CollectionResult<BTreeMap<String, usize>> {
        Ok(self
            .group_by(key)?
            .into_iter()
            .map(|(k, group)| (k, group.len()))
            .collect())
    }

    /// Returns a new collection keeping the first-seen record per
    /// derived key.
    pub fn unique(&self, key: &KeyFn) -> CollectionResult<Collection> {
        if let KeyFn::Path(p) = key {
            path::validate(p)?;
        }
        let mut seen = HashSet::new();
        let mut kept = Vec::new();
        for record in &self.records {
            if seen.insert(derive_key(key, record)) {
                kept.push(record.clone());
            }
        }
        Ok(self.derived(kept))
    }

    /// Strips a dotted field from every record; returns how many
    /// records actually carried it.
    pub fn remove_field(&mut self, field: &str) -> usize {
        self.records
            .iter_mut()
            .filter_map(|r| path::remove(r, field))
            .count()
    }

    /// Registers an instance-local extension.
    ///
    /// Always permitted; visible only on this instance (and its
    /// clones), shadowing a shared extension of the same name.
    pub fn register_extension(&mut self, name: &str, f: ExtensionFn) {
        self.instance_extensions.insert(name.to_string(), f);
    }

    /// Invokes an extension with this collection as receiver.
    ///
    /// The instance overlay is consulted before the shared table.
    pub fn invoke(&mut self, name: &str, args: &[Value]) -> CollectionResult<Value> {
        let f = self
            .instance_extensions
            .get(name)
            .cloned()
            .or_else(|| self.shared.get(name))
            .ok_or_else(|| CollectionError::UnknownExtension(name.to_string()))?;
        f(self, args)
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Requires a patch to be an object with structurally valid keys,
/// before anything is merged.
fn check_patch_object(patch: &Value) -> CollectionResult<&Map<String, Value>> {
    let object = patch.as_object().ok_or_else(|| {
        let got = match patch {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        };
        CollectionError::PatchNotObject(got.to_string())
    })?;
    for key in object.keys() {
        path::validate(key)?;
    }
    Ok(object)
}

fn derive_key(key: &KeyFn, record: &Value) -> String {
    match key {
        KeyFn::Func(f) => f(record),
        KeyFn::Path(p) => match path::get(record, p) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Bool(b)) => b.to_string(),
            _ => "undefined".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn shop() -> Collection {
        Collection::new(&[
            json!({"name": "Mouse", "price": 20}),
            json!({"name": "Monitor", "price": 200}),
        ])
    }

    #[test]
    fn test_construction_copies_input() {
        let input = vec![json!({"n": 1})];
        let mut collection = Collection::new(&input);
        collection.update(None, &Patch::Fields(json!({"n": 2}))).unwrap();
        assert_eq!(input[0]["n"], 1);
    }

    #[test]
    fn test_filter_preserves_order() {
        let collection = shop();
        let cheap = collection.filter(json!({"price": {"<": 100}})).unwrap();
        assert_eq!(cheap.len(), 1);
        assert_eq!(cheap.records()[0]["name"], "Mouse");
    }

    #[test]
    fn test_filter_with_predicate_fn() {
        let collection = shop();
        let found = collection
            .filter(Matcher::func(|r| r["price"].as_i64().unwrap_or(0) > 100))
            .unwrap();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_find_first_and_last() {
        let collection = shop();
        assert_eq!(
            collection.find_first(None).unwrap().unwrap()["name"],
            "Mouse"
        );
        assert_eq!(
            collection.find_last(None).unwrap().unwrap()["name"],
            "Monitor"
        );
        let found = collection
            .find_first(Some(Matcher::Spec(json!({"price": {">": 50}}))))
            .unwrap();
        assert_eq!(found.unwrap()["name"], "Monitor");
        assert!(collection
            .find_first(Some(Matcher::Spec(json!({"price": {">": 500}}))))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_every_variants() {
        let collection = shop();
        assert!(collection.every(EveryCheck::path("price")).unwrap());
        assert!(!collection.every(EveryCheck::path("discount")).unwrap());
        assert!(collection
            .every(EveryCheck::path_op_value("price", ">=", json!(20)))
            .unwrap());
        assert!(!collection
            .every(EveryCheck::path_value("name", json!("Mouse")))
            .unwrap());
        assert!(collection
            .every(EveryCheck::func(|r| r["price"].is_number()))
            .unwrap());
    }

    #[test]
    fn test_every_vacuous_on_empty() {
        let empty = Collection::new(&[]);
        assert!(empty.every(EveryCheck::path("anything")).unwrap());
    }

    #[test]
    fn test_every_unknown_operator_is_error() {
        let collection = shop();
        let err = collection
            .every(EveryCheck::path_op_value("price", "$frobnicate", json!(1)))
            .unwrap_err();
        assert!(err.to_string().contains("$frobnicate"));
    }

    #[test]
    fn test_invalid_path_surfaces_as_query_error() {
        let collection = shop();
        let err = collection.every(EveryCheck::path("a..b")).unwrap_err();
        assert_eq!(
            err,
            CollectionError::Query(crate::query::QueryError::InvalidPath(
                crate::path::PathError::EmptySegment("a..b".to_string())
            ))
        );
    }

    #[test]
    fn test_update_scenario() {
        // The documented scenario: one cheap record gains a discount
        let mut collection = shop();
        let touched = collection
            .update(
                Some(&json!({"price": {"<": 100}})),
                &Patch::Fields(json!({"discount": true})),
            )
            .unwrap();
        assert_eq!(touched, 1);
        assert_eq!(collection.records()[0]["discount"], true);
        assert_eq!(collection.records()[1].get("discount"), None);
    }

    #[test]
    fn test_update_all_when_spec_omitted() {
        let mut collection = shop();
        let touched = collection
            .update(None, &Patch::Fields(json!({"seen": true})))
            .unwrap();
        assert_eq!(touched, 2);
    }

    #[test]
    fn test_update_with_template() {
        let mut collection = shop();
        collection
            .update(None, &Patch::Fields(json!({"label": "{{name}}"})))
            .unwrap();
        assert_eq!(collection.records()[0]["label"], "Mouse");
        assert_eq!(collection.records()[1]["label"], "Monitor");
    }

    #[test]
    fn test_update_dotted_key_preserves_siblings() {
        let mut collection = Collection::new(&[json!({"meta": {"kept": 1}})]);
        collection
            .update(None, &Patch::Fields(json!({"meta.flag": true})))
            .unwrap();
        assert_eq!(
            collection.records()[0],
            json!({"meta": {"kept": 1, "flag": true}})
        );
    }

    #[test]
    fn test_update_patch_fn_uses_snapshot() {
        let mut collection = shop();
        collection
            .update(
                None,
                &Patch::func(|r| json!({"price": r["price"].as_i64().unwrap_or(0) * 2})),
            )
            .unwrap();
        assert_eq!(collection.records()[0]["price"], 40);
        assert_eq!(collection.records()[1]["price"], 400);
    }

    #[test]
    fn test_update_invalid_key_leaves_records_untouched() {
        let mut collection = shop();
        let before = collection.records().to_vec();
        let err = collection
            .update(None, &Patch::Fields(json!({"aa": 1, "zz..bad": 2})))
            .unwrap_err();
        assert!(matches!(err, CollectionError::Query(_)));
        assert_eq!(collection.records(), &before[..]);
    }

    #[test]
    fn test_update_non_object_patch_is_error() {
        let mut collection = shop();
        let before = collection.records().to_vec();

        let err = collection
            .update(None, &Patch::Fields(json!([1, 2])))
            .unwrap_err();
        assert_eq!(err, CollectionError::PatchNotObject("array".to_string()));

        let err = collection
            .update(None, &Patch::func(|_| json!(42)))
            .unwrap_err();
        assert_eq!(err, CollectionError::PatchNotObject("number".to_string()));
        assert_eq!(collection.records(), &before[..]);
    }

    #[test]
    fn test_delete_matches_filter_selection() {
        let mut collection = shop();
        let spec = json!({"price": {">": 50}});
        let selected = collection.filter(spec.clone()).unwrap().len();
        let removed = collection.delete(spec).unwrap();
        assert_eq!(removed, selected);
        assert_eq!(collection.len(), 1);
        assert_eq!(collection.records()[0]["name"], "Mouse");
    }

    #[test]
    fn test_sort_scenario() {
        let mut collection = shop();
        collection.sort(SortKey::desc("price"));
        assert_eq!(collection.records()[0]["name"], "Monitor");
        assert_eq!(collection.records()[1]["name"], "Mouse");
    }

    #[test]
    fn test_count_by_scenario() {
        let collection = shop();
        let counts = collection
            .count_by(&KeyFn::func(|r| {
                if r["price"].as_i64().unwrap_or(0) > 100 {
                    "expensive".to_string()
                } else {
                    "cheap".to_string()
                }
            }))
            .unwrap();
        assert_eq!(counts.get("cheap"), Some(&1));
        assert_eq!(counts.get("expensive"), Some(&1));
    }

    #[test]
    fn test_group_by_missing_key_bucket() {
        let collection = Collection::new(&[
            json!({"cat": "a"}),
            json!({"other": 1}),
            json!({"cat": "a"}),
        ]);
        let groups = collection.group_by(&KeyFn::path("cat")).unwrap();
        assert_eq!(groups["a"].len(), 2);
        assert_eq!(groups["undefined"].len(), 1);
    }

    #[test]
    fn test_unique_keeps_first_seen() {
        let collection = Collection::new(&[
            json!({"cat": "a", "n": 1}),
            json!({"cat": "a", "n": 2}),
            json!({"cat": "b", "n": 3}),
        ]);
        let uniq = collection.unique(&KeyFn::path("cat")).unwrap();
        assert_eq!(uniq.len(), 2);
        assert_eq!(uniq.records()[0]["n"], 1);
    }

    #[test]
    fn test_remove_field() {
        let mut collection = shop();
        let stripped = collection.remove_field("price");
        assert_eq!(stripped, 2);
        assert_eq!(collection.records()[0].get("price"), None);
    }

    #[test]
    fn test_shuffle_keeps_all_records() {
        let mut collection = Collection::new(
            &(0..20).map(|n| json!({ "n": n })).collect::<Vec<_>>(),
        );
        collection.shuffle();
        assert_eq!(collection.len(), 20);
        collection.sort(SortKey::asc("n"));
        for (i, record) in collection.iter().enumerate() {
            assert_eq!(record["n"], i as i64);
        }
    }

    #[test]
    fn test_instance_extension_shadows_shared() {
        let factory = CollectionFactory::new();
        factory
            .register("kind", Arc::new(|_, _| Ok(json!("shared"))))
            .unwrap();

        let mut collection = factory.collection(&[]);
        assert_eq!(collection.invoke("kind", &[]).unwrap(), json!("shared"));

        collection.register_extension("kind", Arc::new(|_, _| Ok(json!("instance"))));
        assert_eq!(collection.invoke("kind", &[]).unwrap(), json!("instance"));

        // Sibling instances are unaffected by the overlay
        let mut sibling = factory.collection(&[]);
        assert_eq!(sibling.invoke("kind", &[]).unwrap(), json!("shared"));
    }

    #[test]
    fn test_unknown_extension_is_error() {
        let mut collection = Collection::new(&[]);
        let err = collection.invoke("nope", &[]).unwrap_err();
        assert_eq!(err, CollectionError::UnknownExtension("nope".to_string()));
    }

    #[test]
    fn test_extension_receives_collection_and_args() {
        let mut collection = shop();
        collection.register_extension(
            "total",
            Arc::new(|c, args| {
                let field = args
                    .first()
                    .and_then(Value::as_str)
                    .ok_or_else(|| CollectionError::extension_failed("total", "missing field"))?;
                let total: f64 = c
                    .iter()
                    .map(|r| crate::query::coerce_number(crate::path::get(r, field)))
                    .sum();
                Ok(json!(total))
            }),
        );
        assert_eq!(
            collection.invoke("total", &[json!("price")]).unwrap(),
            json!(220.0)
        );
    }

    #[test]
    fn test_clone_preserves_extensions_and_validators() {
        let mut validators: HashMap<String, OperatorFn> = HashMap::new();
        validators.insert(
            "$near".to_string(),
            Arc::new(|field: &str, arg: &Value| {
                let field = field.to_string();
                let target = arg.as_f64().unwrap_or(0.0);
                Ok(Arc::new(move |r: &Value| {
                    (crate::query::coerce_number(path::get(r, &field)) - target).abs() <= 5.0
                }) as Predicate)
            }),
        );

        let mut original = Collection::with_validators(&[json!({"n": 10})], &validators);
        original.register_extension("marker", Arc::new(|_, _| Ok(json!(true))));

        let mut cloned = original.clone();
        assert_eq!(cloned.invoke("marker", &[]).unwrap(), json!(true));
        let near = cloned.filter(json!({"n": {"$near": 12}})).unwrap();
        assert_eq!(near.len(), 1);
    }

    #[test]
    fn test_structural_error_fails_fast() {
        let collection = shop();
        let err = collection.filter(json!({"price": {"in": 5}})).err().unwrap();
        assert!(matches!(err, CollectionError::Query(_)));
    }
}
