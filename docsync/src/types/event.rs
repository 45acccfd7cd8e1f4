use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::types::{Document, DocumentId, EventIdentity, LogicalClock};

/// Document insertion event from the source change log.
///
/// [`InsertEvent`] carries the complete document as written to the source
/// store. It is also produced by the merger when a window of updates is
/// folded back into the insert that opened it.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertEvent {
    /// Store-native id of the inserted document.
    pub id: DocumentId,
    /// Namespace (database.collection) of the document.
    pub namespace: String,
    /// Logical clock at which the insert was logged.
    pub clock: LogicalClock,
    /// Complete document as inserted.
    pub document: Document,
}

/// Incremental document update event from the source change log.
///
/// [`UpdateEvent`] describes field-level changes as a modifier document: a
/// map of dotted source paths to new values, a set of dotted source paths to
/// remove, and any literal (non-modifier) fields that were logged alongside
/// the modifiers.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateEvent {
    /// Store-native id of the updated document.
    pub id: DocumentId,
    /// Namespace (database.collection) of the document.
    pub namespace: String,
    /// Logical clock at which the update was logged.
    pub clock: LogicalClock,
    /// Dotted source path to new value assignments.
    pub set_map: BTreeMap<String, Value>,
    /// Dotted source paths to remove.
    pub unset_paths: BTreeSet<String>,
    /// Pass-through fields present alongside the modifiers, keyed by their
    /// top-level field name.
    pub literal_fields: Map<String, Value>,
}

/// Document deletion event from the source change log.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteEvent {
    /// Store-native id of the deleted document.
    pub id: DocumentId,
    /// Namespace (database.collection) of the document.
    pub namespace: String,
    /// Logical clock at which the delete was logged.
    pub clock: LogicalClock,
}

/// Represents a single mutation event from the source change log.
///
/// [`MutationEvent`] encapsulates the three mutation kinds a document store
/// change log can emit. Events for one identity are collected into a batch
/// and compacted by the merger before any of them reaches the projection
/// stage.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationEvent {
    /// Document insertion with the complete document.
    Insert(InsertEvent),
    /// Incremental field-level update.
    Update(UpdateEvent),
    /// Document deletion.
    Delete(DeleteEvent),
}

impl MutationEvent {
    /// Returns the [`MutationKind`] that corresponds to this event.
    pub fn kind(&self) -> MutationKind {
        self.into()
    }

    /// Returns the logical clock carried by this event.
    pub fn clock(&self) -> LogicalClock {
        match self {
            MutationEvent::Insert(event) => event.clock,
            MutationEvent::Update(event) => event.clock,
            MutationEvent::Delete(event) => event.clock,
        }
    }

    /// Returns the store-native id carried by this event.
    pub fn id(&self) -> &DocumentId {
        match self {
            MutationEvent::Insert(event) => &event.id,
            MutationEvent::Update(event) => &event.id,
            MutationEvent::Delete(event) => &event.id,
        }
    }

    /// Returns the namespace carried by this event.
    pub fn namespace(&self) -> &str {
        match self {
            MutationEvent::Insert(event) => &event.namespace,
            MutationEvent::Update(event) => &event.namespace,
            MutationEvent::Delete(event) => &event.namespace,
        }
    }

    /// Returns the logical identity of the document this event mutates.
    pub fn identity(&self) -> EventIdentity {
        EventIdentity {
            namespace: self.namespace().to_string(),
            id: self.id().to_string_form(),
        }
    }
}

/// Classification of mutation event kinds.
///
/// [`MutationKind`] enumerates the possible mutation events without carrying
/// their data, for filtering and routing decisions based on kind alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    /// Document insertion.
    Insert,
    /// Incremental update.
    Update,
    /// Document deletion.
    Delete,
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Insert => write!(f, "Insert"),
            Self::Update => write!(f, "Update"),
            Self::Delete => write!(f, "Delete"),
        }
    }
}

impl From<&MutationEvent> for MutationKind {
    fn from(event: &MutationEvent) -> Self {
        match event {
            MutationEvent::Insert(_) => MutationKind::Insert,
            MutationEvent::Update(_) => MutationKind::Update,
            MutationEvent::Delete(_) => MutationKind::Delete,
        }
    }
}

impl From<MutationEvent> for MutationKind {
    fn from(event: MutationEvent) -> Self {
        (&event).into()
    }
}
