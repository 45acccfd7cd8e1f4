use serde::Serialize;
use std::fmt;

use crate::types::TargetDocument;

/// Normalized instruction handed to the target writer.
///
/// [`ActionRecord`] is the intermediate representation produced by the
/// projection stage. Ids are always in string form, `data` is the flat
/// target-shaped document, and `timestamp` is the packed logical clock of the
/// originating event (`0` when no clock was supplied). Records are immutable
/// once produced; there is no mutating API.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ActionRecord {
    /// Creates or fully replaces the projected document in the target store.
    Upsert {
        /// String form of the document id.
        id: String,
        /// Flat projected document matching the field mapping's target keys.
        data: TargetDocument,
        /// Optional routing parent of the projected document.
        parent: Option<String>,
        /// Packed logical clock of the originating event.
        timestamp: i64,
    },
    /// Removes the projected document from the target store.
    Delete {
        /// String form of the document id.
        id: String,
        /// Optional routing parent of the projected document.
        parent: Option<String>,
        /// Packed logical clock of the originating event.
        timestamp: i64,
    },
}

impl ActionRecord {
    /// Returns the [`ActionKind`] that corresponds to this record.
    pub fn kind(&self) -> ActionKind {
        match self {
            ActionRecord::Upsert { .. } => ActionKind::Upsert,
            ActionRecord::Delete { .. } => ActionKind::Delete,
        }
    }

    /// Returns the string-form document id of this record.
    pub fn id(&self) -> &str {
        match self {
            ActionRecord::Upsert { id, .. } => id,
            ActionRecord::Delete { id, .. } => id,
        }
    }

    /// Returns the packed logical clock of this record.
    pub fn timestamp(&self) -> i64 {
        match self {
            ActionRecord::Upsert { timestamp, .. } => *timestamp,
            ActionRecord::Delete { timestamp, .. } => *timestamp,
        }
    }
}

/// Classification of action record kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ActionKind {
    /// Create or replace the projected document.
    Upsert,
    /// Remove the projected document.
    Delete,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Upsert => write!(f, "Upsert"),
            Self::Delete => write!(f, "Delete"),
        }
    }
}
