//! Per-task orchestration of merging, filtering, and projection.
//!
//! A [`TransformStage`] owns one task's field mapping and parent selector.
//! It groups a raw event batch by document identity, compacts each group
//! through the merger, gates updates through the relevance filter, and plans
//! the writes the target writer must perform. The stage itself is pure
//! computation; independent identity groups can be processed concurrently by
//! fanning them out across tasks, each owning its group exclusively.

use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use docsync_config::shared::TransformConfig;

use crate::apply::{self, PatchOutcome};
use crate::destination::Destination;
use crate::error::SyncResult;
use crate::mapping::FieldMapping;
use crate::merge::{self, MergedBatch, SequenceAnomaly};
use crate::relevance;
use crate::transform::{self, ParentSelector, parent_from_field};
use crate::types::{
    ActionKind, ActionRecord, Document, EventIdentity, ID_FIELD, LogicalClock, MutationEvent,
    TargetDocument, UpdateEvent,
};

/// Incremental patch for an already-projected target document.
///
/// Carries the update's modifiers in source-path form; the writer resolves
/// them against the stage's mapping when applying the patch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetPatch {
    /// String form of the document id.
    pub id: String,
    /// Dotted source path to new value assignments.
    pub set_map: BTreeMap<String, Value>,
    /// Dotted source paths to remove.
    pub unset_paths: BTreeSet<String>,
    /// Packed logical clock of the originating update.
    pub timestamp: i64,
}

/// Request to re-project a document from its complete source form.
///
/// Emitted for updates under a projection-function mapping, which cannot be
/// patched incrementally. The caller fetches the current source document and
/// runs it back through [`TransformStage::transform`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReprojectRequest {
    /// Identity of the document to re-project.
    pub identity: EventIdentity,
    /// Clock of the update that triggered the re-projection.
    pub clock: LogicalClock,
}

/// One planned write for the target store.
#[derive(Debug, Clone, PartialEq)]
pub enum PlannedWrite {
    /// A full upsert or delete action.
    Action(ActionRecord),
    /// An incremental patch of the projected document.
    Patch(TargetPatch),
    /// A full re-projection the caller must perform.
    Reproject(ReprojectRequest),
}

/// Result of processing one raw event batch through the stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageOutput {
    /// Planned writes, grouped per identity in identity order and in clock
    /// order within each identity.
    pub writes: Vec<PlannedWrite>,
    /// Sequence anomalies observed while merging.
    pub anomalies: Vec<SequenceAnomaly>,
    /// Number of updates skipped by the relevance filter.
    pub skipped_updates: usize,
}

/// Transform stage of one replication task.
#[derive(Clone)]
pub struct TransformStage {
    mapping: FieldMapping,
    parent_selector: Option<ParentSelector>,
}

impl std::fmt::Debug for TransformStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformStage")
            .field("mapping", &self.mapping)
            .field("has_parent_selector", &self.parent_selector.is_some())
            .finish()
    }
}

impl TransformStage {
    /// Creates a stage around the given mapping.
    pub fn new(mapping: FieldMapping) -> Self {
        Self {
            mapping,
            parent_selector: None,
        }
    }

    /// Builds a stage from a validated task configuration.
    pub fn from_config(config: &TransformConfig) -> SyncResult<Self> {
        let mapping = FieldMapping::from_config(config)?;
        let parent_selector = config
            .parent_field
            .as_deref()
            .map(parent_from_field);

        Ok(Self {
            mapping,
            parent_selector,
        })
    }

    /// Attaches a parent selector to the stage.
    pub fn with_parent_selector(mut self, parent_selector: ParentSelector) -> Self {
        self.parent_selector = Some(parent_selector);
        self
    }

    /// Returns the stage's field mapping.
    pub fn mapping(&self) -> &FieldMapping {
        &self.mapping
    }

    /// Merges one identity's event batch, logging any sequence anomaly.
    pub fn merge(&self, events: Vec<MutationEvent>) -> MergedBatch {
        let merged = merge::merge_events(events);
        for anomaly in &merged.anomalies {
            warn!(identity = %anomaly.identity, clock = %anomaly.clock, "inconsistent event sequence");
        }

        merged
    }

    /// Projects a document into the action record for the given kind.
    pub fn transform(
        &self,
        kind: ActionKind,
        document: &Document,
        clock: Option<LogicalClock>,
    ) -> SyncResult<ActionRecord> {
        transform::project(
            kind,
            document,
            &self.mapping,
            self.parent_selector.as_ref(),
            clock,
        )
    }

    /// Applies an update's modifiers to a nested source document.
    pub fn patch_source(&self, document: Document, update: &UpdateEvent) -> Document {
        apply::apply_to_nested(document, &update.set_map, &update.unset_paths)
    }

    /// Applies an update's modifiers to an already-projected target document.
    pub fn patch_target(&self, target: TargetDocument, update: &UpdateEvent) -> PatchOutcome {
        apply::apply_to_flat(target, &update.set_map, &update.unset_paths, &self.mapping)
    }

    /// Processes a raw event batch into planned writes.
    ///
    /// Events are grouped by identity, each group is merged, and every
    /// surviving event is planned: inserts become full upserts, deletes
    /// become delete actions, and updates become either an incremental patch
    /// (table mapping) or a re-projection request (projection mapping),
    /// unless the relevance filter proves them skippable.
    pub fn process_batch(&self, events: Vec<MutationEvent>) -> SyncResult<StageOutput> {
        let mut output = StageOutput::default();

        for (identity, group) in group_by_identity(events) {
            let merged = self.merge(group);
            output.anomalies.extend(merged.anomalies);

            for event in merged.events {
                match event {
                    MutationEvent::Insert(insert) => {
                        let action = self.transform(
                            ActionKind::Upsert,
                            &insert.document,
                            Some(insert.clock),
                        )?;
                        output.writes.push(PlannedWrite::Action(action));
                    }
                    MutationEvent::Delete(delete) => {
                        let mut document = Document::new();
                        document.insert(ID_FIELD.to_string(), delete.id.as_value().clone());
                        let action =
                            self.transform(ActionKind::Delete, &document, Some(delete.clock))?;
                        output.writes.push(PlannedWrite::Action(action));
                    }
                    MutationEvent::Update(update) => {
                        self.plan_update(&identity, update, &mut output);
                    }
                }
            }
        }

        Ok(output)
    }

    fn plan_update(&self, identity: &EventIdentity, update: UpdateEvent, output: &mut StageOutput) {
        let skippable = update.literal_fields.is_empty()
            && relevance::is_irrelevant(&self.mapping, &update.set_map, &update.unset_paths);
        if skippable {
            debug!(identity = %identity, clock = %update.clock, "skipping irrelevant update");
            output.skipped_updates += 1;
            return;
        }

        match &self.mapping {
            FieldMapping::Table(_) => {
                let mut set_map = update.set_map;
                for (key, value) in update.literal_fields {
                    set_map.insert(key, value);
                }

                output.writes.push(PlannedWrite::Patch(TargetPatch {
                    id: update.id.to_string_form(),
                    set_map,
                    unset_paths: update.unset_paths,
                    timestamp: update.clock.as_timestamp(),
                }));
            }
            FieldMapping::Projection(_) => {
                output.writes.push(PlannedWrite::Reproject(ReprojectRequest {
                    identity: identity.clone(),
                    clock: update.clock,
                }));
            }
        }
    }
}

/// Groups a raw event batch by document identity.
///
/// The groups come back in identity order so that processing a batch is
/// deterministic across runs.
pub fn group_by_identity(
    events: Vec<MutationEvent>,
) -> BTreeMap<EventIdentity, Vec<MutationEvent>> {
    let mut groups: BTreeMap<EventIdentity, Vec<MutationEvent>> = BTreeMap::new();
    for event in events {
        groups.entry(event.identity()).or_default().push(event);
    }

    groups
}

/// Dispatches planned writes to a destination.
///
/// Actions and patches are handed to the destination in plan order:
/// contiguous runs of the same write category are batched into one call, and
/// a category switch flushes the pending run before the next write is
/// buffered. A plan like patch-then-upsert (an update followed by an insert
/// the merger keeps as two events) therefore reaches the destination in that
/// order, never upsert-then-stale-patch. Re-projection requests are returned
/// to the caller, which owns source document access.
pub async fn dispatch<D>(
    destination: &D,
    writes: Vec<PlannedWrite>,
) -> SyncResult<Vec<ReprojectRequest>>
where
    D: Destination,
{
    let mut actions = Vec::new();
    let mut patches = Vec::new();
    let mut reprojections = Vec::new();

    for write in writes {
        match write {
            PlannedWrite::Action(action) => {
                if !patches.is_empty() {
                    destination.apply_patches(std::mem::take(&mut patches)).await?;
                }
                actions.push(action);
            }
            PlannedWrite::Patch(patch) => {
                if !actions.is_empty() {
                    destination.write_actions(std::mem::take(&mut actions)).await?;
                }
                patches.push(patch);
            }
            PlannedWrite::Reproject(request) => reprojections.push(request),
        }
    }

    if !actions.is_empty() {
        destination.write_actions(actions).await?;
    }
    if !patches.is_empty() {
        destination.apply_patches(patches).await?;
    }

    Ok(reprojections)
}
