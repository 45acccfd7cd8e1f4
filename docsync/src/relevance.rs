//! Fast-path filter for updates that cannot affect the projection.
//!
//! Skipping an irrelevant update saves a downstream write; skipping a
//! relevant one silently drops data. The test is therefore exact in one
//! direction: it may claim relevance for an update that turns out to be a
//! no-op, but it must never claim irrelevance for an update that touches a
//! mapped subtree.

use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

use crate::mapping::FieldMapping;

/// Decides whether an update's modifiers can be skipped entirely.
///
/// True iff the mapping is a table and no touched path (set-map keys plus
/// unset paths) is related to any mapped source path. Always false for a
/// projection mapping, whose relevance cannot be proven without invoking the
/// function.
pub fn is_irrelevant(
    mapping: &FieldMapping,
    set_map: &BTreeMap<String, Value>,
    unset_paths: &BTreeSet<String>,
) -> bool {
    if let FieldMapping::Projection(_) = mapping {
        return false;
    }

    !set_map
        .keys()
        .chain(unset_paths.iter())
        .any(|path| mapping.touches(path))
}
