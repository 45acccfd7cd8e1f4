//! Parsing of raw change-log entries into typed mutation events.
//!
//! The tailer hands over entries in the source store's oplog shape: an `op`
//! code, a `ns` namespace, a `ts` logical clock, the payload `o`, and for
//! updates the identity document `o2`. An update payload mixes `$set` and
//! `$unset` modifiers with literal pass-through fields; parsing splits them
//! apart so the rest of the engine never sees modifier syntax.
//!
//! Entries whose identity cannot be resolved are rejected with
//! [`SyncError::MalformedEvent`]; the caller logs and drops them, since the
//! core has no retry concept.

use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{SyncError, SyncResult};
use crate::types::{
    DeleteEvent, Document, DocumentId, ID_FIELD, InsertEvent, LogicalClock, MutationEvent,
    UpdateEvent,
};

/// Operation code of an insert entry.
const OP_INSERT: &str = "i";
/// Operation code of an update entry.
const OP_UPDATE: &str = "u";
/// Operation code of a delete entry.
const OP_DELETE: &str = "d";

/// Modifier key holding path assignments in an update payload.
const SET_MODIFIER: &str = "$set";
/// Modifier key holding path removals in an update payload.
const UNSET_MODIFIER: &str = "$unset";

/// Parses one raw change-log entry into a typed [`MutationEvent`].
pub fn parse_entry(entry: &Value) -> SyncResult<MutationEvent> {
    let op = require_str(entry, "op", "entry")?;

    match op {
        OP_INSERT => parse_insert_entry(entry),
        OP_UPDATE => parse_update_entry(entry),
        OP_DELETE => parse_delete_entry(entry),
        other => Err(SyncError::InvalidOperation(other.to_string())),
    }
}

/// Parses an insert entry; the payload `o` is the complete document.
pub fn parse_insert_entry(entry: &Value) -> SyncResult<MutationEvent> {
    let namespace = require_str(entry, "ns", "insert")?.to_string();
    let clock = parse_clock(entry, "insert")?;
    let document = require_object(entry, "o", "insert")?;

    let id = document
        .get(ID_FIELD)
        .cloned()
        .ok_or_else(|| malformed("insert", format!("payload has no `{ID_FIELD}` field")))?;

    Ok(MutationEvent::Insert(InsertEvent {
        id: DocumentId::new(id),
        namespace,
        clock,
        document: document.clone(),
    }))
}

/// Parses an update entry, splitting modifiers from literal fields.
///
/// The identity comes from `o2`; an update without a resolvable identity is
/// malformed.
pub fn parse_update_entry(entry: &Value) -> SyncResult<MutationEvent> {
    let namespace = require_str(entry, "ns", "update")?.to_string();
    let clock = parse_clock(entry, "update")?;
    let payload = require_object(entry, "o", "update")?;

    let id = entry
        .get("o2")
        .and_then(Value::as_object)
        .and_then(|identity| identity.get(ID_FIELD))
        .cloned()
        .ok_or_else(|| malformed("update", format!("no `o2.{ID_FIELD}` identity")))?;

    let (set_map, unset_paths, literal_fields) = split_update_payload(payload);

    Ok(MutationEvent::Update(UpdateEvent {
        id: DocumentId::new(id),
        namespace,
        clock,
        set_map,
        unset_paths,
        literal_fields,
    }))
}

/// Parses a delete entry; the payload `o` carries only the identity.
pub fn parse_delete_entry(entry: &Value) -> SyncResult<MutationEvent> {
    let namespace = require_str(entry, "ns", "delete")?.to_string();
    let clock = parse_clock(entry, "delete")?;
    let payload = require_object(entry, "o", "delete")?;

    let id = payload
        .get(ID_FIELD)
        .cloned()
        .ok_or_else(|| malformed("delete", format!("payload has no `{ID_FIELD}` field")))?;

    Ok(MutationEvent::Delete(DeleteEvent {
        id: DocumentId::new(id),
        namespace,
        clock,
    }))
}

/// Splits an update payload into its set-map, unset-set, and literal fields.
///
/// `$unset` values are ignored (the source store uses a placeholder `1`);
/// only the keys matter. Every key that is not a recognized modifier passes
/// through as a literal field.
fn split_update_payload(
    payload: &Document,
) -> (BTreeMap<String, Value>, BTreeSet<String>, Map<String, Value>) {
    let mut set_map = BTreeMap::new();
    let mut unset_paths = BTreeSet::new();
    let mut literal_fields = Map::new();

    for (key, value) in payload {
        match key.as_str() {
            SET_MODIFIER => {
                if let Some(assignments) = value.as_object() {
                    for (path, value) in assignments {
                        set_map.insert(path.clone(), value.clone());
                    }
                }
            }
            UNSET_MODIFIER => {
                if let Some(removals) = value.as_object() {
                    for path in removals.keys() {
                        unset_paths.insert(path.clone());
                    }
                }
            }
            _ => {
                literal_fields.insert(key.clone(), value.clone());
            }
        }
    }

    (set_map, unset_paths, literal_fields)
}

fn parse_clock(entry: &Value, operation: &str) -> SyncResult<LogicalClock> {
    let clock = entry
        .get("ts")
        .and_then(Value::as_object)
        .ok_or_else(|| malformed(operation, "no `ts` clock".to_string()))?;

    let epoch = clock_component(clock, "t", operation)?;
    let counter = clock_component(clock, "i", operation)?;

    Ok(LogicalClock::new(epoch, counter))
}

fn clock_component(clock: &Document, key: &str, operation: &str) -> SyncResult<u32> {
    clock
        .get(key)
        .and_then(Value::as_u64)
        .and_then(|component| u32::try_from(component).ok())
        .ok_or_else(|| malformed(operation, format!("`ts.{key}` is not a u32")))
}

fn require_str<'a>(entry: &'a Value, key: &str, operation: &str) -> SyncResult<&'a str> {
    entry
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| malformed(operation, format!("`{key}` is missing or not a string")))
}

fn require_object<'a>(entry: &'a Value, key: &str, operation: &str) -> SyncResult<&'a Document> {
    entry
        .get(key)
        .and_then(Value::as_object)
        .ok_or_else(|| malformed(operation, format!("`{key}` is missing or not an object")))
}

fn malformed(operation: &str, reason: String) -> SyncError {
    SyncError::MalformedEvent {
        operation: operation.to_string(),
        reason,
    }
}
