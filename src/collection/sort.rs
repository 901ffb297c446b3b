//! Record ordering
//!
//! Sorting is stable. Missing field values sort to the end ascending
//! and to the start descending.

use std::cmp::Ordering;

use serde_json::Value;

use crate::path;

use super::input::{SortDirection, SortKey};

/// Sorts records in place according to a sort key.
pub(crate) fn sort_records(records: &mut [Value], key: &SortKey) {
    match key {
        SortKey::Path(field, direction) => {
            records.sort_by(|a, b| {
                let ordering = compare_at(a, b, field);
                match direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            });
        }
        SortKey::Comparator(cmp) => records.sort_by(|a, b| cmp(a, b)),
    }
}

/// Compares two records by the value at a field path.
///
/// Ascending order puts missing values last; reversing it for
/// descending order puts them first.
pub(crate) fn compare_at(a: &Value, b: &Value, field: &str) -> Ordering {
    match (path::get(a, field), path::get(b, field)) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a_val), Some(b_val)) => compare_values(a_val, b_val),
    }
}

/// Compares two JSON values for sorting.
///
/// Ordering rules:
/// - null < bool < number < string < array < object
/// - For same types, natural ordering
pub(crate) fn compare_values(a: &Value, b: &Value) -> Ordering {
    let type_order = |v: &Value| -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    };

    let a_type = type_order(a);
    let b_type = type_order(b);
    if a_type != b_type {
        return a_type.cmp(&b_type);
    }

    match (a, b) {
        (Value::Bool(a_b), Value::Bool(b_b)) => a_b.cmp(b_b),
        (Value::Number(a_n), Value::Number(b_n)) => {
            let a_f = a_n.as_f64().unwrap_or(0.0);
            let b_f = b_n.as_f64().unwrap_or(0.0);
            a_f.partial_cmp(&b_f).unwrap_or(Ordering::Equal)
        }
        (Value::String(a_s), Value::String(b_s)) => a_s.cmp(b_s),
        // Arrays and objects are not ordered against each other
        _ => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sort_ascending_by_path() {
        let mut records = vec![
            json!({"price": 200}),
            json!({"price": 20}),
            json!({"price": 80}),
        ];
        sort_records(&mut records, &SortKey::asc("price"));
        assert_eq!(records[0]["price"], 20);
        assert_eq!(records[2]["price"], 200);
    }

    #[test]
    fn test_sort_descending_by_path() {
        let mut records = vec![json!({"price": 20}), json!({"price": 200})];
        sort_records(&mut records, &SortKey::desc("price"));
        assert_eq!(records[0]["price"], 200);
    }

    #[test]
    fn test_missing_values_end_asc_start_desc() {
        let mut records = vec![json!({}), json!({"n": 1}), json!({"n": 2})];
        sort_records(&mut records, &SortKey::asc("n"));
        assert_eq!(records[2], json!({}));

        sort_records(&mut records, &SortKey::desc("n"));
        assert_eq!(records[0], json!({}));
        assert_eq!(records[1]["n"], 2);
    }

    #[test]
    fn test_sort_stable() {
        let mut records = vec![
            json!({"n": 1, "tag": "a"}),
            json!({"n": 1, "tag": "b"}),
            json!({"n": 1, "tag": "c"}),
        ];
        sort_records(&mut records, &SortKey::asc("n"));
        let tags: Vec<_> = records.iter().map(|r| r["tag"].clone()).collect();
        assert_eq!(tags, vec![json!("a"), json!("b"), json!("c")]);
    }

    #[test]
    fn test_comparator_bypasses_paths() {
        let mut records = vec![json!({"n": 1}), json!({"n": 3}), json!({"n": 2})];
        sort_records(
            &mut records,
            &SortKey::comparator(|a, b| compare_values(&b["n"], &a["n"])),
        );
        assert_eq!(records[0]["n"], 3);
    }

    #[test]
    fn test_cross_type_ordering() {
        assert_eq!(compare_values(&json!(null), &json!(false)), Ordering::Less);
        assert_eq!(compare_values(&json!(5), &json!("5")), Ordering::Less);
    }
}
