//! Attribute discovery over sampled documents.
//!
//! Walks a handful of documents from an unknown collection or table and
//! collects every attribute path seen. Sequences are sampled rather than
//! traversed: only the first element contributes paths, which keeps the cost
//! linear in document size but can miss attributes that appear only in later
//! elements of heterogeneous arrays.

use std::collections::BTreeSet;

use serde_json::Value;
use tracing::debug;

use crate::Document;

/// Dot-delimited location of a field within a document.
pub type AttributePath = String;

/// Prefix that marks operator-like keys in the document store.
const SIGIL: char = '$';

/// Rewrite a key so it can never be mistaken for a query operator.
///
/// `"$vector"` becomes `"_$vector"`; every other key is returned unchanged.
pub fn escape_key(key: &str) -> String {
    if key.starts_with(SIGIL) {
        format!("_{key}")
    } else {
        key.to_string()
    }
}

/// Collect the attribute paths present across `samples`.
///
/// The result is sorted and free of duplicates, and does not depend on the
/// order of the samples.
pub fn discover(samples: &[Document]) -> Vec<AttributePath> {
    let mut paths = BTreeSet::new();
    for document in samples {
        walk_object(document, None, &mut paths);
    }
    debug!(
        "Discovered {} attributes across {} samples",
        paths.len(),
        samples.len()
    );
    paths.into_iter().collect()
}

fn walk_object(object: &Document, prefix: Option<&str>, paths: &mut BTreeSet<AttributePath>) {
    for (key, value) in object {
        let key = escape_key(key);
        let path = match prefix {
            Some(prefix) => format!("{prefix}.{key}"),
            None => key,
        };
        walk_value(value, &path, paths);
        paths.insert(path);
    }
}

fn walk_value(value: &Value, path: &str, paths: &mut BTreeSet<AttributePath>) {
    match value {
        Value::Object(object) => walk_object(object, Some(path), paths),
        // Only the first element is sampled.
        Value::Array(items) => {
            if let Some(first) = items.first() {
                walk_value(first, path, paths);
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            other => panic!("expected an object, got {other}"),
        }
    }

    #[test]
    fn test_empty_sample_set() {
        assert!(discover(&[]).is_empty());
    }

    #[test]
    fn test_nested_objects_and_first_array_element() {
        let samples = vec![doc(json!({"a": {"b": 1}, "c": [{"d": 2}, {"d": 3, "e": 4}]}))];

        assert_eq!(discover(&samples), vec!["a", "a.b", "c", "c.d"]);
    }

    #[test]
    fn test_sigil_keys_are_escaped() {
        let samples = vec![doc(json!({
            "$vector": [0.1, 0.2],
            "meta": {"$similarity": 0.9}
        }))];

        let paths = discover(&samples);
        assert_eq!(paths, vec!["_$vector", "meta", "meta._$similarity"]);
        assert!(!paths.iter().any(|p| p.starts_with('$') || p.contains(".$")));
    }

    #[test]
    fn test_union_is_sorted_and_order_independent() {
        let first = doc(json!({"title": "x", "author": {"name": "a"}}));
        let second = doc(json!({"title": "y", "year": 1999, "author": null}));

        let forward = discover(&[first.clone(), second.clone()]);
        let backward = discover(&[second, first]);

        assert_eq!(forward, vec!["author", "author.name", "title", "year"]);
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_null_and_empty_array_stop_recursion() {
        let samples = vec![doc(json!({"gone": null, "items": [], "nested": [[{"deep": 1}]]}))];

        assert_eq!(
            discover(&samples),
            vec!["gone", "items", "nested", "nested.deep"]
        );
    }

    #[test]
    fn test_escape_key() {
        assert_eq!(escape_key("$vectorize"), "_$vectorize");
        assert_eq!(escape_key("price$"), "price$");
        assert_eq!(escape_key("_id"), "_id");
    }
}
