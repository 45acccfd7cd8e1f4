//! Polymorphic projection from source documents to the target shape.
//!
//! A task's transform stage holds exactly one [`FieldMapping`]: either a
//! declarative table of (source path, target key) pairs, or an opaque
//! projection function over the whole document. The two variants are a sum
//! type so that every call site handles both tags explicitly; a third
//! projection kind would be a compile-time-visible change.

use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use docsync_config::shared::TransformConfig;

use crate::error::{SyncError, SyncResult};
use crate::paths;
use crate::types::{Document, TargetDocument};

/// Opaque projection function over a whole source document.
///
/// Failures are propagated to the caller unmodified; the mapping does not
/// sandbox or retry the function.
pub type ProjectionFn = Arc<dyn Fn(&Document) -> SyncResult<TargetDocument> + Send + Sync>;

/// One (source path, target key) pair of a table mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingEntry {
    /// Dotted path into the nested source document.
    pub source_path: String,
    /// Flat key in the projected target document.
    pub target_key: String,
}

impl MappingEntry {
    /// Creates a new mapping entry.
    pub fn new(source_path: impl Into<String>, target_key: impl Into<String>) -> Self {
        Self {
            source_path: source_path.into(),
            target_key: target_key.into(),
        }
    }
}

/// Projection of a source document into the target store's shape.
#[derive(Clone)]
pub enum FieldMapping {
    /// Ordered table of (source path, target key) pairs, each unique within
    /// the table.
    Table(Vec<MappingEntry>),
    /// Opaque projection function over the whole document.
    Projection(ProjectionFn),
}

impl FieldMapping {
    /// Builds a mapping from the two mutually exclusive construction inputs.
    ///
    /// Fails with [`SyncError::Config`] when both or neither variant is
    /// supplied.
    pub fn from_parts(
        table: Option<Vec<MappingEntry>>,
        projection: Option<ProjectionFn>,
    ) -> SyncResult<Self> {
        match (table, projection) {
            (Some(entries), None) => Self::table(entries),
            (None, Some(function)) => Ok(Self::Projection(function)),
            (Some(_), Some(_)) => Err(SyncError::Config(
                "transform mapping must supply a table or a projection function, not both"
                    .to_string(),
            )),
            (None, None) => Err(SyncError::Config(
                "transform mapping must supply a table or a projection function".to_string(),
            )),
        }
    }

    /// Builds a table mapping, validating that source paths and target keys
    /// are unique within the table.
    pub fn table(entries: Vec<MappingEntry>) -> SyncResult<Self> {
        for (index, entry) in entries.iter().enumerate() {
            for other in &entries[index + 1..] {
                if entry.source_path == other.source_path {
                    return Err(SyncError::Config(format!(
                        "duplicate source path in mapping table: `{}`",
                        entry.source_path
                    )));
                }
                if entry.target_key == other.target_key {
                    return Err(SyncError::Config(format!(
                        "duplicate target key in mapping table: `{}`",
                        entry.target_key
                    )));
                }
            }
        }

        Ok(Self::Table(entries))
    }

    /// Builds a mapping around an opaque projection function.
    pub fn projection(function: ProjectionFn) -> Self {
        Self::Projection(function)
    }

    /// Builds a table mapping from a validated task configuration.
    pub fn from_config(config: &TransformConfig) -> SyncResult<Self> {
        config
            .validate()
            .map_err(|error| SyncError::Config(error.to_string()))?;

        Self::table(
            config
                .mapping
                .iter()
                .map(|entry| MappingEntry::new(entry.source.clone(), entry.target.clone()))
                .collect(),
        )
    }

    /// Projects a source document into the target shape.
    ///
    /// The table variant emits one key per entry; absent source paths become
    /// explicit [`Value::Null`] so a key is never omitted from the result.
    /// The projection variant invokes the function and returns its result
    /// unchanged, propagating its error.
    pub fn project(&self, document: &Document) -> SyncResult<TargetDocument> {
        match self {
            FieldMapping::Table(entries) => {
                let mut data = TargetDocument::new();
                for entry in entries {
                    let value = paths::get(document, &entry.source_path)
                        .cloned()
                        .unwrap_or(Value::Null);
                    data.insert(entry.target_key.clone(), value);
                }
                Ok(data)
            }
            FieldMapping::Projection(function) => function(document),
        }
    }

    /// Resolves the target key a source path projects onto.
    ///
    /// Exact string lookup for the table variant; always [`None`] for the
    /// projection variant, which cannot be statically inverted.
    pub fn reverse_target_key(&self, source_path: &str) -> Option<&str> {
        match self {
            FieldMapping::Table(entries) => entries
                .iter()
                .find(|entry| entry.source_path == source_path)
                .map(|entry| entry.target_key.as_str()),
            FieldMapping::Projection(_) => None,
        }
    }

    /// Tests whether an edit to `source_path` can affect the projection.
    ///
    /// True iff the path equals a mapped path, is a dotted-prefix of one
    /// (an ancestor of a mapped leaf), or has a mapped path as its own
    /// dotted-prefix (a descendant of a mapped subtree). Always true for the
    /// projection variant, which cannot be inspected.
    pub fn touches(&self, source_path: &str) -> bool {
        match self {
            FieldMapping::Table(entries) => entries
                .iter()
                .any(|entry| paths_related(source_path, &entry.source_path)),
            FieldMapping::Projection(_) => true,
        }
    }
}

impl fmt::Debug for FieldMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldMapping::Table(entries) => f.debug_tuple("Table").field(entries).finish(),
            FieldMapping::Projection(_) => f.write_str("Projection(..)"),
        }
    }
}

/// Tests whether two dotted paths are equal or related by subtree
/// containment, on segment boundaries only (`a` relates to `a.b`, not `ab`).
pub(crate) fn paths_related(a: &str, b: &str) -> bool {
    a == b || is_dotted_prefix(a, b) || is_dotted_prefix(b, a)
}

fn is_dotted_prefix(prefix: &str, path: &str) -> bool {
    path.len() > prefix.len()
        && path.starts_with(prefix)
        && path.as_bytes()[prefix.len()] == b'.'
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn source_document() -> Document {
        json!({ "_id": "a", "field0": { "field1": 1, "field2": 2 } })
            .as_object()
            .cloned()
            .unwrap()
    }

    fn table_mapping() -> FieldMapping {
        FieldMapping::table(vec![
            MappingEntry::new("field0.field1", "field1"),
            MappingEntry::new("field0.field2", "field2"),
        ])
        .unwrap()
    }

    #[test]
    fn from_parts_rejects_both_and_neither() {
        let function: ProjectionFn = Arc::new(|_| Ok(TargetDocument::new()));
        assert!(matches!(
            FieldMapping::from_parts(Some(vec![]), Some(function.clone())),
            Err(SyncError::Config(_))
        ));
        assert!(matches!(
            FieldMapping::from_parts(None, None),
            Err(SyncError::Config(_))
        ));
        assert!(FieldMapping::from_parts(None, Some(function)).is_ok());
    }

    #[test]
    fn table_rejects_duplicate_source_paths() {
        let result = FieldMapping::table(vec![
            MappingEntry::new("field0.field1", "a"),
            MappingEntry::new("field0.field1", "b"),
        ]);
        assert!(matches!(result, Err(SyncError::Config(_))));
    }

    #[test]
    fn table_rejects_duplicate_target_keys() {
        let result = FieldMapping::table(vec![
            MappingEntry::new("field0.field1", "a"),
            MappingEntry::new("field0.field2", "a"),
        ]);
        assert!(matches!(result, Err(SyncError::Config(_))));
    }

    #[test]
    fn table_projection_emits_one_key_per_entry() {
        let data = table_mapping().project(&source_document()).unwrap();
        assert_eq!(Value::Object(data), json!({ "field1": 1, "field2": 2 }));
    }

    #[test]
    fn table_projection_is_total_over_target_keys() {
        let mapping = FieldMapping::table(vec![
            MappingEntry::new("field0.field1", "field1"),
            MappingEntry::new("field0.missing", "missing"),
        ])
        .unwrap();

        let data = mapping.project(&source_document()).unwrap();
        assert_eq!(Value::Object(data), json!({ "field1": 1, "missing": null }));
    }

    #[test]
    fn function_projection_returns_result_unchanged() {
        let function: ProjectionFn = Arc::new(|doc| {
            let mut data = TargetDocument::new();
            data.insert(
                "field1".to_string(),
                paths::get(doc, "field0.field1").cloned().unwrap_or(Value::Null),
            );
            Ok(data)
        });

        let mapping = FieldMapping::projection(function);
        let data = mapping.project(&source_document()).unwrap();
        assert_eq!(Value::Object(data), json!({ "field1": 1 }));
    }

    #[test]
    fn function_projection_propagates_errors() {
        let function: ProjectionFn =
            Arc::new(|_| Err(SyncError::Projection("boom".to_string())));
        let mapping = FieldMapping::projection(function);
        assert!(matches!(
            mapping.project(&source_document()),
            Err(SyncError::Projection(_))
        ));
    }

    #[test]
    fn reverse_lookup_is_exact_for_tables_and_none_for_functions() {
        let mapping = table_mapping();
        assert_eq!(mapping.reverse_target_key("field0.field1"), Some("field1"));
        assert_eq!(mapping.reverse_target_key("field0"), None);

        let function: ProjectionFn = Arc::new(|_| Ok(TargetDocument::new()));
        let mapping = FieldMapping::projection(function);
        assert_eq!(mapping.reverse_target_key("field0.field1"), None);
    }

    #[test]
    fn touches_covers_ancestors_and_descendants() {
        let mapping = table_mapping();
        assert!(mapping.touches("field0.field1"));
        assert!(mapping.touches("field0"));
        assert!(mapping.touches("field0.field1.deep"));
        assert!(!mapping.touches("field1"));
        assert!(!mapping.touches("field0x"));
    }

    #[test]
    fn from_config_builds_a_table() {
        let config: TransformConfig = serde_json::from_value(json!({
            "mapping": [
                { "source": "field0.field1", "target": "field1" }
            ],
            "namespace": "db0.collection0"
        }))
        .unwrap();

        let mapping = FieldMapping::from_config(&config).unwrap();
        assert_eq!(mapping.reverse_target_key("field0.field1"), Some("field1"));
    }
}
