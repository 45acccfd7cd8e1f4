//! Dotted-path access to nested documents.
//!
//! Paths split on `'.'` and descend through nested JSON objects. Absence is a
//! value, not an error: [`get`] returns [`None`] whenever a segment is missing
//! or a non-object is hit, and never panics. [`set`] and [`unset`] take the
//! document by value and return the updated document, so a caller never
//! observes a half-applied mutation on a shared reference.

use serde_json::{Map, Value};

use crate::types::Document;

/// Reads the value at a dotted path in a nested document.
///
/// Returns [`None`] when any segment is missing or a non-object is reached
/// before the final segment.
pub fn get<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut current = doc;
    let mut segments = path.split('.').peekable();

    while let Some(segment) = segments.next() {
        let value = current.get(segment)?;
        if segments.peek().is_none() {
            return Some(value);
        }
        current = value.as_object()?;
    }

    None
}

/// Writes a value at a dotted path, creating intermediate objects as needed.
///
/// A non-object value standing in the way of an intermediate segment is
/// replaced by an object, matching the source store's modifier semantics.
pub fn set(mut doc: Document, path: &str, value: Value) -> Document {
    set_in(&mut doc, path, value);
    doc
}

/// Removes the leaf at a dotted path.
///
/// A parent object left empty by the removal stays in place.
pub fn unset(mut doc: Document, path: &str) -> Document {
    unset_in(&mut doc, path);
    doc
}

fn set_in(doc: &mut Map<String, Value>, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            doc.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let entry = doc
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Some(child) = entry.as_object_mut() {
                set_in(child, rest, value);
            }
        }
    }
}

fn unset_in(doc: &mut Map<String, Value>, path: &str) {
    match path.split_once('.') {
        None => {
            doc.remove(path);
        }
        Some((head, rest)) => {
            if let Some(child) = doc.get_mut(head).and_then(Value::as_object_mut) {
                unset_in(child, rest);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn get_descends_nested_objects() {
        let doc = doc(json!({ "field0": { "field1": 1 } }));
        assert_eq!(get(&doc, "field0.field1"), Some(&json!(1)));
        assert_eq!(get(&doc, "field0"), Some(&json!({ "field1": 1 })));
    }

    #[test]
    fn get_returns_none_for_missing_segments() {
        let doc = doc(json!({ "field0": { "field1": 1 } }));
        assert_eq!(get(&doc, "field0.field2"), None);
        assert_eq!(get(&doc, "missing.field1"), None);
    }

    #[test]
    fn get_returns_none_through_non_objects() {
        let doc = doc(json!({ "field0": 1 }));
        assert_eq!(get(&doc, "field0.field1"), None);
    }

    #[test]
    fn set_creates_intermediate_objects() {
        let updated = set(Document::new(), "a.b.c", json!(1));
        assert_eq!(Value::Object(updated), json!({ "a": { "b": { "c": 1 } } }));
    }

    #[test]
    fn set_overwrites_existing_leaf() {
        let initial = doc(json!({ "a": { "b": 1 } }));
        let updated = set(initial, "a.b", json!("x"));
        assert_eq!(Value::Object(updated), json!({ "a": { "b": "x" } }));
    }

    #[test]
    fn set_replaces_non_object_intermediate() {
        let initial = doc(json!({ "a": 1 }));
        let updated = set(initial, "a.b", json!(2));
        assert_eq!(Value::Object(updated), json!({ "a": { "b": 2 } }));
    }

    #[test]
    fn set_does_not_disturb_siblings() {
        let initial = doc(json!({ "a": { "b": 1, "c": 2 } }));
        let updated = set(initial, "a.b", json!(3));
        assert_eq!(Value::Object(updated), json!({ "a": { "b": 3, "c": 2 } }));
    }

    #[test]
    fn unset_removes_leaf() {
        let initial = doc(json!({ "a": { "b": 1, "c": 2 } }));
        let updated = unset(initial, "a.b");
        assert_eq!(Value::Object(updated), json!({ "a": { "c": 2 } }));
    }

    #[test]
    fn unset_keeps_emptied_parent() {
        let initial = doc(json!({ "a": { "b": 1 } }));
        let updated = unset(initial, "a.b");
        assert_eq!(Value::Object(updated), json!({ "a": {} }));
    }

    #[test]
    fn unset_of_missing_path_is_a_no_op() {
        let initial = doc(json!({ "a": { "b": 1 } }));
        let updated = unset(initial.clone(), "a.c.d");
        assert_eq!(updated, initial);
    }
}
