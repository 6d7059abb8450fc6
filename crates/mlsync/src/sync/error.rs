use thiserror::Error;

/// Errors building a [`SyncOrchestrator`](super::SyncOrchestrator).
///
/// Once built, a run never fails as a whole: every outcome ends up in its
/// reports.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("sync orchestrator needs a listing client")]
    MissingClient,

    #[error("sync orchestrator needs a store")]
    MissingStore,

    #[error("no resources selected for sync")]
    NoResources,
}
