//! Application of modifier documents to both document representations.
//!
//! An update's set-map and unset-set are applied to the nested source-shaped
//! document when folding events, and to the flat target-shaped document when
//! patching an already-projected document without recomputing the whole
//! projection.

use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

use crate::mapping::FieldMapping;
use crate::paths;
use crate::types::{Document, TargetDocument};

/// Outcome of patching a flat target document.
#[derive(Debug, Clone, PartialEq)]
pub enum PatchOutcome {
    /// The patch was applied key by key.
    Patched(TargetDocument),
    /// The mapping is a projection function and cannot be patched
    /// incrementally; the caller must re-project the complete updated source
    /// document instead.
    RequiresReprojection,
}

/// Applies a modifier document to a nested source-shaped document.
///
/// Unsets are applied before sets so that a path present in both resolves to
/// "set wins", matching the last-writer intent of a single modifier document.
pub fn apply_to_nested(
    doc: Document,
    set_map: &BTreeMap<String, Value>,
    unset_paths: &BTreeSet<String>,
) -> Document {
    let doc = unset_paths
        .iter()
        .fold(doc, |doc, path| paths::unset(doc, path));

    set_map.iter().fold(doc, |doc, (path, value)| {
        paths::set(doc, path, value.clone())
    })
}

/// Applies a modifier document to a flat target-shaped document.
///
/// Each source path resolves through the mapping's reverse lookup; resolved
/// unsets delete the flat key and resolved sets assign it directly, with no
/// path walking since the target representation is never nested. Paths with
/// no mapped target key describe source fields outside the projection and are
/// silently ignored.
pub fn apply_to_flat(
    target: TargetDocument,
    set_map: &BTreeMap<String, Value>,
    unset_paths: &BTreeSet<String>,
    mapping: &FieldMapping,
) -> PatchOutcome {
    if let FieldMapping::Projection(_) = mapping {
        return PatchOutcome::RequiresReprojection;
    }

    let mut target = target;
    for path in unset_paths {
        if let Some(target_key) = mapping.reverse_target_key(path) {
            target.remove(target_key);
        }
    }
    for (path, value) in set_map {
        if let Some(target_key) = mapping.reverse_target_key(path) {
            target.insert(target_key.to_string(), value.clone());
        }
    }

    PatchOutcome::Patched(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{MappingEntry, ProjectionFn};
    use serde_json::json;
    use std::sync::Arc;

    fn modifiers() -> (BTreeMap<String, Value>, BTreeSet<String>) {
        let set_map = BTreeMap::from([("field0.field1".to_string(), json!("x"))]);
        let unset_paths = BTreeSet::from(["field0.field2".to_string()]);
        (set_map, unset_paths)
    }

    fn table_mapping() -> FieldMapping {
        FieldMapping::table(vec![
            MappingEntry::new("field0.field1", "field1"),
            MappingEntry::new("field0.field2", "field2"),
        ])
        .unwrap()
    }

    #[test]
    fn nested_patch_sets_and_unsets_along_paths() {
        let doc = json!({ "_id": "a", "field0": { "field1": 1, "field2": 2 } })
            .as_object()
            .cloned()
            .unwrap();
        let (set_map, unset_paths) = modifiers();

        let updated = apply_to_nested(doc, &set_map, &unset_paths);
        assert_eq!(
            Value::Object(updated),
            json!({ "_id": "a", "field0": { "field1": "x" } })
        );
    }

    #[test]
    fn set_wins_over_unset_for_the_same_path() {
        let doc = json!({ "a": 1 }).as_object().cloned().unwrap();
        let set_map = BTreeMap::from([("a".to_string(), json!(2))]);
        let unset_paths = BTreeSet::from(["a".to_string()]);

        let updated = apply_to_nested(doc, &set_map, &unset_paths);
        assert_eq!(Value::Object(updated), json!({ "a": 2 }));
    }

    #[test]
    fn flat_patch_resolves_through_reverse_lookup() {
        let target = json!({ "field1": 1, "field2": 2 })
            .as_object()
            .cloned()
            .unwrap();
        let (set_map, unset_paths) = modifiers();

        let outcome = apply_to_flat(target, &set_map, &unset_paths, &table_mapping());
        assert_eq!(
            outcome,
            PatchOutcome::Patched(json!({ "field1": "x" }).as_object().cloned().unwrap())
        );
    }

    #[test]
    fn flat_patch_ignores_unmapped_paths() {
        let target = json!({ "field1": 1 }).as_object().cloned().unwrap();
        let set_map = BTreeMap::from([("field9".to_string(), json!(9))]);
        let unset_paths = BTreeSet::from(["field8".to_string()]);

        let outcome = apply_to_flat(target.clone(), &set_map, &unset_paths, &table_mapping());
        assert_eq!(outcome, PatchOutcome::Patched(target));
    }

    #[test]
    fn flat_patch_of_function_mapping_requires_reprojection() {
        let function: ProjectionFn = Arc::new(|_| Ok(TargetDocument::new()));
        let mapping = FieldMapping::projection(function);
        let (set_map, unset_paths) = modifiers();

        let outcome = apply_to_flat(TargetDocument::new(), &set_map, &unset_paths, &mapping);
        assert_eq!(outcome, PatchOutcome::RequiresReprojection);
    }
}
