//! Event-compaction and document-transformation engine for replicating a
//! document store's change log into a search index.
//!
//! The tailer upstream reads an ordered log of document mutations and groups
//! them by document identity; the writer downstream bulk-applies the
//! resulting actions to the index. This crate is the transform stage in
//! between:
//!
//! - the merger compacts a burst of per-document mutation events into the
//!   minimal equivalent sequence, in logical-clock order;
//! - the relevance filter skips updates that cannot affect the configured
//!   projection;
//! - the field mapping projects a nested source document into the flat
//!   target shape, either declaratively or through a custom function;
//! - the update applier patches both the nested and the flat representation
//!   incrementally, without recomputing the whole projection.
//!
//! Everything in the core is a deterministic function of its inputs, with no
//! shared mutable state and no blocking I/O; batches for independent
//! identities can be processed concurrently without locking.

pub mod apply;
pub mod conversions;
pub mod destination;
pub mod error;
pub mod mapping;
pub mod merge;
pub mod paths;
pub mod pipeline;
pub mod relevance;
pub mod transform;
pub mod types;

pub use apply::{PatchOutcome, apply_to_flat, apply_to_nested};
pub use error::{SyncError, SyncResult};
pub use mapping::{FieldMapping, MappingEntry, ProjectionFn};
pub use merge::{MergedBatch, SequenceAnomaly, merge_events};
pub use pipeline::{PlannedWrite, ReprojectRequest, StageOutput, TargetPatch, TransformStage};
pub use transform::{ParentSelector, parent_from_field};
