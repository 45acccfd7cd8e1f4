use serde_json::{Map, Value};
use std::fmt;

/// Name of the identity field in source documents.
pub const ID_FIELD: &str = "_id";

/// Nested source-shaped document keyed by top-level field names.
pub type Document = Map<String, Value>;

/// Flat target-shaped document keyed by target field names.
///
/// Produced by a field mapping; by construction it has no nesting.
pub type TargetDocument = Map<String, Value>;

/// Store-native identity of a source document.
///
/// The source store may use any scalar as a document id. [`DocumentId`] keeps
/// the native value and coerces it to its string form at the boundary, before
/// anything leaves the core.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentId(Value);

impl DocumentId {
    /// Wraps a store-native id value.
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Returns the native id value.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Returns the string form of the id.
    ///
    /// String ids are returned unquoted; any other value uses its compact
    /// JSON rendering.
    pub fn to_string_form(&self) -> String {
        match &self.0 {
            Value::String(id) => id.clone(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_form())
    }
}

/// Identity of one logical document: the pair of namespace and string-form id.
///
/// All events sharing one identity are processed as one ordered group.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventIdentity {
    /// Namespace (database.collection) of the document.
    pub namespace: String,
    /// String form of the document id.
    pub id: String,
}

impl fmt::Display for EventIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.namespace, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn string_id_is_unquoted() {
        let id = DocumentId::new(json!("aaaaaaaaaaaaaaaaaaaaaaaa"));
        assert_eq!(id.to_string_form(), "aaaaaaaaaaaaaaaaaaaaaaaa");
    }

    #[test]
    fn numeric_id_uses_json_rendering() {
        let id = DocumentId::new(json!(42));
        assert_eq!(id.to_string_form(), "42");
    }
}
