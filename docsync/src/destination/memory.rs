use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;

use crate::apply::{self, PatchOutcome};
use crate::destination::Destination;
use crate::error::SyncResult;
use crate::mapping::FieldMapping;
use crate::pipeline::TargetPatch;
use crate::types::{ActionRecord, TargetDocument};

#[derive(Debug)]
struct Inner {
    documents: HashMap<String, TargetDocument>,
    actions: Vec<ActionRecord>,
}

/// In-memory destination for testing and development purposes.
///
/// [`MemoryDestination`] maintains the projected index in memory: upserts
/// replace the stored document, deletes remove it, and patches are applied
/// through the flat-document applier using the task's field mapping. A patch
/// for a document that is not stored is dropped with a warning, like the
/// partial-update rejection of a real target store. Every received action is
/// also recorded verbatim so tests can assert on the exact write sequence.
/// All data is lost when the process terminates.
#[derive(Debug, Clone)]
pub struct MemoryDestination {
    mapping: FieldMapping,
    inner: Arc<Mutex<Inner>>,
}

impl MemoryDestination {
    /// Creates a new empty memory destination resolving patches through the
    /// given mapping.
    pub fn new(mapping: FieldMapping) -> Self {
        let inner = Inner {
            documents: HashMap::new(),
            actions: Vec::new(),
        };

        Self {
            mapping,
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    /// Returns a copy of the projected documents currently stored, keyed by
    /// string-form id.
    pub async fn documents(&self) -> HashMap<String, TargetDocument> {
        let inner = self.inner.lock().await;
        inner.documents.clone()
    }

    /// Returns a copy of all action records received so far.
    pub async fn actions(&self) -> Vec<ActionRecord> {
        let inner = self.inner.lock().await;
        inner.actions.clone()
    }

    /// Clears all stored documents and recorded actions.
    pub async fn clear(&self) {
        let mut inner = self.inner.lock().await;
        inner.documents.clear();
        inner.actions.clear();
    }
}

impl Destination for MemoryDestination {
    fn name() -> &'static str {
        "memory"
    }

    async fn write_actions(&self, actions: Vec<ActionRecord>) -> SyncResult<()> {
        let mut inner = self.inner.lock().await;
        for action in actions {
            match &action {
                ActionRecord::Upsert { id, data, .. } => {
                    inner.documents.insert(id.clone(), data.clone());
                }
                ActionRecord::Delete { id, .. } => {
                    inner.documents.remove(id);
                }
            }
            inner.actions.push(action);
        }

        Ok(())
    }

    async fn apply_patches(&self, patches: Vec<TargetPatch>) -> SyncResult<()> {
        let mut inner = self.inner.lock().await;
        for patch in patches {
            // A real target store rejects a partial update of a missing
            // document; materializing one here would hide ordering bugs.
            let Some(current) = inner.documents.remove(&patch.id) else {
                warn!(id = %patch.id, "dropping patch for a document that was never projected");
                continue;
            };
            match apply::apply_to_flat(
                current,
                &patch.set_map,
                &patch.unset_paths,
                &self.mapping,
            ) {
                PatchOutcome::Patched(document) => {
                    inner.documents.insert(patch.id, document);
                }
                PatchOutcome::RequiresReprojection => {
                    // The stage never routes patches to a projection mapping,
                    // so this destination was built with the wrong mapping.
                    warn!(id = %patch.id, "dropping patch that requires a full re-projection");
                }
            }
        }

        Ok(())
    }
}
