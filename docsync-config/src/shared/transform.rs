use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A field holds a value outside its allowed range.
    #[error("invalid value for `{field}`: {constraint}")]
    InvalidFieldValue { field: String, constraint: String },
    /// The declarative mapping table is empty.
    #[error("`transform.mapping` must contain at least one entry")]
    EmptyMapping,
    /// Two mapping entries share the same source path.
    #[error("duplicate source path in `transform.mapping`: `{0}`")]
    DuplicateSourcePath(String),
    /// Two mapping entries share the same target key.
    #[error("duplicate target key in `transform.mapping`: `{0}`")]
    DuplicateTargetKey(String),
}

/// One declarative mapping entry: a dotted source path projected onto a flat
/// target key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MappingEntryConfig {
    /// Dotted path into the nested source document.
    pub source: String,
    /// Flat key in the projected target document.
    pub target: String,
}

/// Transform stage configuration for one replication task.
///
/// A declarative mapping table is the only projection expressible in
/// configuration; tasks that need a custom projection function register it in
/// code when building the stage.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TransformConfig {
    /// Ordered table of source path to target key pairs.
    #[serde(default)]
    pub mapping: Vec<MappingEntryConfig>,
    /// Optional field of the source document used as the routing parent of the
    /// projected document.
    #[serde(default)]
    pub parent_field: Option<String>,
    /// Namespace (database.collection) this task replicates.
    pub namespace: String,
}

impl TransformConfig {
    /// Validates transform configuration settings.
    ///
    /// Ensures the mapping table is non-empty and that source paths and target
    /// keys are unique within it.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.mapping.is_empty() {
            return Err(ValidationError::EmptyMapping);
        }

        let mut sources = HashSet::new();
        let mut targets = HashSet::new();
        for entry in &self.mapping {
            if !sources.insert(entry.source.as_str()) {
                return Err(ValidationError::DuplicateSourcePath(entry.source.clone()));
            }
            if !targets.insert(entry.target.as_str()) {
                return Err(ValidationError::DuplicateTargetKey(entry.target.clone()));
            }
        }

        if let Some(parent_field) = &self.parent_field
            && parent_field.is_empty()
        {
            return Err(ValidationError::InvalidFieldValue {
                field: "transform.parent_field".to_string(),
                constraint: "must not be empty".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_mapping(entries: &[(&str, &str)]) -> TransformConfig {
        TransformConfig {
            mapping: entries
                .iter()
                .map(|(source, target)| MappingEntryConfig {
                    source: source.to_string(),
                    target: target.to_string(),
                })
                .collect(),
            parent_field: None,
            namespace: "db0.collection0".to_string(),
        }
    }

    #[test]
    fn valid_mapping_passes_validation() {
        let config = config_with_mapping(&[("field0.field1", "field1"), ("field0.field2", "field2")]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_mapping_is_rejected() {
        let config = config_with_mapping(&[]);
        assert!(matches!(config.validate(), Err(ValidationError::EmptyMapping)));
    }

    #[test]
    fn duplicate_source_path_is_rejected() {
        let config = config_with_mapping(&[("field0.field1", "a"), ("field0.field1", "b")]);
        assert!(matches!(
            config.validate(),
            Err(ValidationError::DuplicateSourcePath(path)) if path == "field0.field1"
        ));
    }

    #[test]
    fn duplicate_target_key_is_rejected() {
        let config = config_with_mapping(&[("field0.field1", "a"), ("field0.field2", "a")]);
        assert!(matches!(
            config.validate(),
            Err(ValidationError::DuplicateTargetKey(key)) if key == "a"
        ));
    }

    #[test]
    fn deserializes_from_json() {
        let config: TransformConfig = serde_json::from_str(
            r#"{
                "mapping": [
                    { "source": "field0.field1", "target": "field1" }
                ],
                "parent_field": "group",
                "namespace": "db0.collection0"
            }"#,
        )
        .unwrap();

        assert_eq!(config.mapping.len(), 1);
        assert_eq!(config.parent_field.as_deref(), Some("group"));
        assert!(config.validate().is_ok());
    }
}
