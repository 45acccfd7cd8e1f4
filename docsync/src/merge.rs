//! Compaction of a per-document event batch into its minimal equivalent.
//!
//! The tailer buffers a window of events per document identity and flushes
//! the whole group at once; arrival order within the group carries no
//! meaning. The merger sorts the group by logical clock and folds adjacent
//! events together wherever a combination rule exists, so downstream sees
//! the shortest sequence that produces the same final target state.
//!
//! The fold is deterministic in the batch content: any permutation of the
//! input yields a content-equal output.

use std::fmt;

use tracing::debug;

use crate::apply::apply_to_nested;
use crate::types::{EventIdentity, InsertEvent, LogicalClock, MutationEvent, UpdateEvent};

/// A sequence anomaly observed while merging one identity's batch.
///
/// An update following a delete with no intervening insert has no domain
/// meaning; the offending event is passed through unchanged and the anomaly
/// is surfaced here for the caller to log or flag, never as a crash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceAnomaly {
    /// Identity of the document the anomalous update targets.
    pub identity: EventIdentity,
    /// Clock of the anomalous update.
    pub clock: LogicalClock,
}

impl fmt::Display for SequenceAnomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "update at {} follows a delete of {} with no intervening insert",
            self.clock, self.identity
        )
    }
}

/// Result of merging one identity's event batch.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedBatch {
    /// The minimal ordered event sequence, in clock order.
    pub events: Vec<MutationEvent>,
    /// Sequence anomalies observed during the fold.
    pub anomalies: Vec<SequenceAnomaly>,
}

/// Merges an unordered batch of mutation events for one logical document.
///
/// Events are sorted ascending by clock (stable, so arrival order breaks the
/// ties a well-formed store log never produces) and folded left, combining
/// the last accumulated event with the next according to the rule table:
///
/// - Insert + Update folds the modifiers into the inserted document.
/// - Update + Update folds the modifiers, later operation winning per path.
/// - Update + Delete discards the update state, keeping the delete.
/// - Insert + Delete annihilates both; the document's whole lifetime fits
///   inside the observed window.
/// - Delete + Insert stays two events; both transitions must reach
///   downstream.
/// - Delete + Update stays two events and records a [`SequenceAnomaly`].
///
/// The remaining kind pairs have no combination rule and append the next
/// event unchanged. Any new mutation kind must extend this table explicitly.
pub fn merge_events(mut events: Vec<MutationEvent>) -> MergedBatch {
    let input_len = events.len();
    events.sort_by_key(|event| event.clock());

    let mut merged: Vec<MutationEvent> = Vec::with_capacity(events.len());
    let mut anomalies = Vec::new();

    for next in events {
        let Some(last) = merged.pop() else {
            merged.push(next);
            continue;
        };

        match (last, next) {
            (MutationEvent::Insert(insert), MutationEvent::Update(update)) => {
                merged.push(MutationEvent::Insert(fold_update_into_insert(
                    insert, update,
                )));
            }
            (MutationEvent::Update(prev), MutationEvent::Update(next)) => {
                merged.push(MutationEvent::Update(fold_updates(prev, next)));
            }
            (MutationEvent::Update(_), next @ MutationEvent::Delete(_)) => {
                merged.push(next);
            }
            (MutationEvent::Insert(_), MutationEvent::Delete(_)) => {}
            (last @ MutationEvent::Delete(_), next @ MutationEvent::Insert(_)) => {
                merged.push(last);
                merged.push(next);
            }
            (last @ MutationEvent::Delete(_), MutationEvent::Update(update)) => {
                anomalies.push(SequenceAnomaly {
                    identity: EventIdentity {
                        namespace: update.namespace.clone(),
                        id: update.id.to_string_form(),
                    },
                    clock: update.clock,
                });
                merged.push(last);
                merged.push(MutationEvent::Update(update));
            }
            (last @ MutationEvent::Insert(_), next @ MutationEvent::Insert(_))
            | (last @ MutationEvent::Update(_), next @ MutationEvent::Insert(_))
            | (last @ MutationEvent::Delete(_), next @ MutationEvent::Delete(_)) => {
                merged.push(last);
                merged.push(next);
            }
        }
    }

    debug!(
        input = input_len,
        output = merged.len(),
        anomalies = anomalies.len(),
        "merged event batch"
    );

    MergedBatch {
        events: merged,
        anomalies,
    }
}

/// Folds an update's modifiers into the insert that precedes it.
///
/// The modifiers are applied to the accumulated document through the nested
/// applier, literal fields overwrite top-level keys directly, and the result
/// keeps kind Insert with the update's clock.
fn fold_update_into_insert(insert: InsertEvent, update: UpdateEvent) -> InsertEvent {
    let mut document = apply_to_nested(insert.document, &update.set_map, &update.unset_paths);
    for (key, value) in update.literal_fields {
        document.insert(key, value);
    }

    InsertEvent {
        id: insert.id,
        namespace: insert.namespace,
        clock: update.clock,
        document,
    }
}

/// Folds two adjacent updates into one, the later operation winning per path.
///
/// The merged set-map overlays the earlier map with the later one. The merged
/// unset-set keeps the earlier unsets not cancelled by a later set, then
/// applies the later unsets last, each of which also removes its path from
/// the merged set-map.
fn fold_updates(prev: UpdateEvent, next: UpdateEvent) -> UpdateEvent {
    let mut set_map = prev.set_map;
    set_map.extend(next.set_map);

    let mut unset_paths: std::collections::BTreeSet<String> = prev
        .unset_paths
        .into_iter()
        .filter(|path| !set_map.contains_key(path))
        .collect();
    for path in next.unset_paths {
        set_map.remove(&path);
        unset_paths.insert(path);
    }

    let mut literal_fields = prev.literal_fields;
    literal_fields.extend(next.literal_fields);

    UpdateEvent {
        id: next.id,
        namespace: next.namespace,
        clock: next.clock,
        set_map,
        unset_paths,
        literal_fields,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DeleteEvent, DocumentId};
    use serde_json::{Map, Value, json};
    use std::collections::{BTreeMap, BTreeSet};

    const NS: &str = "example1";

    fn id() -> DocumentId {
        DocumentId::new(json!("aaaaaaaaaaaaaaaaaaaaaaaa"))
    }

    fn insert(clock: (u32, u32), document: Value) -> MutationEvent {
        MutationEvent::Insert(InsertEvent {
            id: id(),
            namespace: NS.to_string(),
            clock: LogicalClock::new(clock.0, clock.1),
            document: document.as_object().cloned().unwrap(),
        })
    }

    fn update(
        clock: (u32, u32),
        set: &[(&str, Value)],
        unset: &[&str],
        literal: Value,
    ) -> MutationEvent {
        MutationEvent::Update(UpdateEvent {
            id: id(),
            namespace: NS.to_string(),
            clock: LogicalClock::new(clock.0, clock.1),
            set_map: set
                .iter()
                .map(|(path, value)| (path.to_string(), value.clone()))
                .collect(),
            unset_paths: unset.iter().map(|path| path.to_string()).collect(),
            literal_fields: literal.as_object().cloned().unwrap_or_default(),
        })
    }

    fn delete(clock: (u32, u32)) -> MutationEvent {
        MutationEvent::Delete(DeleteEvent {
            id: id(),
            namespace: NS.to_string(),
            clock: LogicalClock::new(clock.0, clock.1),
        })
    }

    #[test]
    fn insert_then_update_folds_into_insert() {
        let merged = merge_events(vec![
            insert((0, 0), json!({ "_id": "a", "field0": { "field1": 0 } })),
            update(
                (0, 1),
                &[("field0.field1", json!(1))],
                &["field0.field2"],
                json!({}),
            ),
        ]);

        assert!(merged.anomalies.is_empty());
        assert_eq!(
            merged.events,
            vec![insert((0, 1), json!({ "_id": "a", "field0": { "field1": 1 } }))]
        );
    }

    #[test]
    fn update_then_update_folds_with_later_operation_winning() {
        let merged = merge_events(vec![
            update(
                (0, 1),
                &[("field0.field2", json!(1))],
                &[],
                json!({ "field0.field1": 1 }),
            ),
            update(
                (0, 0),
                &[("field0.field1", json!(3)), ("field0.field2", json!(2))],
                &[],
                json!({}),
            ),
        ]);

        assert!(merged.anomalies.is_empty());
        assert_eq!(
            merged.events,
            vec![update(
                (0, 1),
                &[("field0.field1", json!(3)), ("field0.field2", json!(1))],
                &[],
                json!({ "field0.field1": 1 }),
            )]
        );
    }

    #[test]
    fn later_set_cancels_earlier_unset() {
        let merged = merge_events(vec![
            update((0, 0), &[], &["a"], json!({})),
            update((0, 1), &[("a", json!(1))], &[], json!({})),
        ]);

        assert_eq!(
            merged.events,
            vec![update((0, 1), &[("a", json!(1))], &[], json!({}))]
        );
    }

    #[test]
    fn later_unset_removes_earlier_set() {
        let merged = merge_events(vec![
            update((0, 0), &[("a", json!(1)), ("b", json!(2))], &[], json!({})),
            update((0, 1), &[], &["a"], json!({})),
        ]);

        assert_eq!(
            merged.events,
            vec![update((0, 1), &[("b", json!(2))], &["a"], json!({}))]
        );
    }

    #[test]
    fn update_then_delete_keeps_the_delete_verbatim() {
        let merged = merge_events(vec![
            update(
                (0, 0),
                &[("field0.field2", json!(1))],
                &[],
                json!({ "field0.field1": 1 }),
            ),
            delete((0, 1)),
        ]);

        assert!(merged.anomalies.is_empty());
        assert_eq!(merged.events, vec![delete((0, 1))]);
    }

    #[test]
    fn insert_then_delete_annihilates() {
        let merged = merge_events(vec![
            insert((0, 0), json!({ "_id": "a", "field0": 1 })),
            delete((0, 1)),
        ]);

        assert!(merged.events.is_empty());
        assert!(merged.anomalies.is_empty());
    }

    #[test]
    fn out_of_order_updates_compact_by_clock() {
        let merged = merge_events(vec![
            insert((0, 0), json!({ "_id": "a", "field0": { "field1": 0 } })),
            update((0, 2), &[("field0.field1", json!(2))], &[], json!({})),
            update((0, 1), &[("field0.field1", json!(1))], &[], json!({})),
        ]);

        assert_eq!(
            merged.events,
            vec![insert((0, 2), json!({ "_id": "a", "field0": { "field1": 2 } }))]
        );
    }

    #[test]
    fn delete_then_insert_keeps_both_transitions() {
        let merged = merge_events(vec![
            delete((0, 0)),
            insert((0, 1), json!({ "_id": "a", "field0": 1 })),
        ]);

        assert_eq!(
            merged.events,
            vec![delete((0, 0)), insert((0, 1), json!({ "_id": "a", "field0": 1 }))]
        );
        assert!(merged.anomalies.is_empty());
    }

    #[test]
    fn delete_then_update_is_surfaced_as_an_anomaly() {
        let merged = merge_events(vec![
            delete((0, 0)),
            update((0, 1), &[("a", json!(1))], &[], json!({})),
        ]);

        assert_eq!(
            merged.events,
            vec![
                delete((0, 0)),
                update((0, 1), &[("a", json!(1))], &[], json!({})),
            ]
        );
        assert_eq!(
            merged.anomalies,
            vec![SequenceAnomaly {
                identity: EventIdentity {
                    namespace: NS.to_string(),
                    id: "aaaaaaaaaaaaaaaaaaaaaaaa".to_string(),
                },
                clock: LogicalClock::new(0, 1),
            }]
        );
    }

    #[test]
    fn insert_after_delete_then_update_recovers() {
        let merged = merge_events(vec![
            delete((0, 0)),
            insert((0, 1), json!({ "_id": "a", "field0": { "field1": 0 } })),
            update((0, 2), &[("field0.field1", json!(1))], &[], json!({})),
        ]);

        assert_eq!(
            merged.events,
            vec![
                delete((0, 0)),
                insert((0, 2), json!({ "_id": "a", "field0": { "field1": 1 } })),
            ]
        );
        assert!(merged.anomalies.is_empty());
    }

    #[test]
    fn merge_is_arrival_order_independent() {
        let events = vec![
            insert((0, 0), json!({ "_id": "a", "field0": { "field1": 0 } })),
            update((0, 1), &[("field0.field1", json!(1))], &[], json!({})),
            update((0, 2), &[], &["field0.field1"], json!({})),
            update((0, 3), &[("field0.field2", json!(5))], &[], json!({})),
        ];

        let expected = merge_events(events.clone());

        let permutations: [[usize; 4]; 5] = [
            [3, 2, 1, 0],
            [1, 0, 3, 2],
            [2, 3, 0, 1],
            [0, 2, 1, 3],
            [3, 0, 2, 1],
        ];
        for permutation in permutations {
            let shuffled: Vec<_> = permutation.iter().map(|&i| events[i].clone()).collect();
            assert_eq!(merge_events(shuffled), expected);
        }
    }

    #[test]
    fn literal_fields_overwrite_top_level_keys_when_folded_into_insert() {
        let merged = merge_events(vec![
            insert((0, 0), json!({ "_id": "a", "kind": "old" })),
            update((0, 1), &[], &[], json!({ "kind": "new" })),
        ]);

        assert_eq!(
            merged.events,
            vec![insert((0, 1), json!({ "_id": "a", "kind": "new" }))]
        );
    }

    #[test]
    fn empty_batch_merges_to_empty() {
        let merged = merge_events(Vec::new());
        assert!(merged.events.is_empty());
        assert!(merged.anomalies.is_empty());
    }

    #[test]
    fn update_folding_keeps_maps_deterministic() {
        // Exercises the BTree-backed modifier containers directly.
        let mut set_map = BTreeMap::new();
        set_map.insert("b".to_string(), json!(2));
        set_map.insert("a".to_string(), json!(1));
        let event = UpdateEvent {
            id: id(),
            namespace: NS.to_string(),
            clock: LogicalClock::new(0, 0),
            set_map,
            unset_paths: BTreeSet::new(),
            literal_fields: Map::new(),
        };

        let keys: Vec<_> = event.set_map.keys().cloned().collect();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
    }
}
