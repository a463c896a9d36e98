//! The process-wide active model pointer, as an explicit handle.

use std::sync::{Arc, RwLock};

use digero_model::ModelArtifact;

/// Shared reference to the currently published model.
///
/// Cloning the handle shares the same slot, so a prediction service and a
/// training orchestrator handed clones of one `ActiveModel` observe each
/// other's publishes; two engines with separate handles stay fully
/// isolated (one instance per tenant works in a single process).
///
/// Readers hold the lock only long enough to clone the inner `Arc`: they
/// see the artifact that was current at that instant, whole or not at
/// all, and a concurrent publish never blocks on them for long.
#[derive(Debug, Clone, Default)]
pub struct ActiveModel {
    slot: Arc<RwLock<Option<Arc<ModelArtifact>>>>,
}

impl ActiveModel {
    /// A handle with no published model, the cold-start state.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The current artifact, if one has been published.
    pub fn current(&self) -> Option<Arc<ModelArtifact>> {
        match self.slot.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Atomically replace the active artifact. The single mutation a
    /// publish makes visible.
    pub fn swap(&self, artifact: Arc<ModelArtifact>) {
        let mut guard = match self.slot.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Some(artifact);
    }

    pub fn version(&self) -> Option<u64> {
        self.current().map(|a| a.version)
    }
}
