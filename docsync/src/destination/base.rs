use std::future::Future;

use crate::error::SyncResult;
use crate::pipeline::TargetPatch;
use crate::types::ActionRecord;

/// Trait for systems that can receive projected documents from the transform
/// stage.
///
/// [`Destination`] implementations define how planned writes reach the target
/// store. Action records must be applied in the order they are handed over;
/// within one batch they are already in per-identity clock order, which the
/// target relies on for conflict resolution via the carried timestamps.
///
/// Implementations should be idempotent where possible, since the pipeline
/// may retry a failed batch. The optional [`Destination::shutdown`] method
/// has a default no-op implementation; override it if the destination needs
/// cleanup when the pipeline shuts down.
pub trait Destination {
    /// Returns the name of the destination.
    fn name() -> &'static str;

    /// Propagates the shutdown signal to the destination.
    ///
    /// The default implementation is a no-op.
    fn shutdown(&self) -> impl Future<Output = SyncResult<()>> + Send {
        async { Ok(()) }
    }

    /// Writes a batch of upsert and delete actions to the target store.
    fn write_actions(
        &self,
        actions: Vec<ActionRecord>,
    ) -> impl Future<Output = SyncResult<()>> + Send;

    /// Applies incremental patches to already-projected documents.
    ///
    /// Patches carry modifiers in source-path form; the destination resolves
    /// them against the task's field mapping so it can issue partial updates
    /// instead of full re-projections.
    fn apply_patches(
        &self,
        patches: Vec<TargetPatch>,
    ) -> impl Future<Output = SyncResult<()>> + Send;
}
