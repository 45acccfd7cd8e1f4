//! Projection of whole documents into action records.
//!
//! The transformer turns a source document plus an action kind into the
//! canonical intermediate [`ActionRecord`] handed to the target writer,
//! resolving the string-form id, the optional routing parent, and the
//! version timestamp from the originating event's clock.

use serde_json::Value;
use std::sync::Arc;

use crate::error::{SyncError, SyncResult};
use crate::mapping::FieldMapping;
use crate::paths;
use crate::types::{ActionKind, ActionRecord, Document, DocumentId, ID_FIELD, LogicalClock};

/// Selector resolving the routing parent of a projected document.
pub type ParentSelector = Arc<dyn Fn(&Document) -> Option<String> + Send + Sync>;

/// Builds a parent selector that reads a dotted path of the source document.
///
/// Absent and null values resolve to no parent; any other value is coerced
/// to its string form the same way document ids are.
pub fn parent_from_field(field: impl Into<String>) -> ParentSelector {
    let field = field.into();
    Arc::new(move |document| match paths::get(document, &field) {
        None | Some(Value::Null) => None,
        Some(value) => Some(DocumentId::new(value.clone()).to_string_form()),
    })
}

/// Projects a document into the action record for the given kind.
///
/// The id is the string form of the document's identity field. Delete
/// records carry no data; upsert data comes from the mapping's projection.
/// The timestamp is the packed clock of the originating event, defaulting to
/// `0` when the caller supplies none.
pub fn project(
    kind: ActionKind,
    document: &Document,
    mapping: &FieldMapping,
    parent_selector: Option<&ParentSelector>,
    clock: Option<LogicalClock>,
) -> SyncResult<ActionRecord> {
    let id = document
        .get(ID_FIELD)
        .map(|value| DocumentId::new(value.clone()).to_string_form())
        .ok_or_else(|| SyncError::MalformedEvent {
            operation: kind.to_string(),
            reason: format!("document has no `{ID_FIELD}` field"),
        })?;

    let parent = parent_selector.and_then(|selector| selector(document));
    let timestamp = clock.map(|clock| clock.as_timestamp()).unwrap_or(0);

    match kind {
        ActionKind::Delete => Ok(ActionRecord::Delete {
            id,
            parent,
            timestamp,
        }),
        ActionKind::Upsert => {
            let data = mapping.project(document)?;
            Ok(ActionRecord::Upsert {
                id,
                data,
                parent,
                timestamp,
            })
        }
    }
}
