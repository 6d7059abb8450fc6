//! Quota-governed sync of listing resources and the dataset catalog.
//!
//! # Module Structure
//!
//! - [`types`] - Run reports, statuses and options
//! - [`progress`] - Progress reporting: `SyncProgress`, `ProgressCallback`, `emit()`
//! - [`resource`] - Which collections sync, in what order, with which filters
//! - [`reconcile`] - What a single record means for the store
//! - `orchestrator` - [`SyncOrchestrator`]: sequential resources with an emergency stop
//! - `catalog` - [`import_catalog`]: batched dataset import
//!
//! # Example
//!
//! ```ignore
//! use mlsync::sync::{SyncKind, SyncOrchestrator};
//!
//! let orchestrator = SyncOrchestrator::builder()
//!     .client(Arc::new(client))
//!     .store(Arc::new(DbStore::new(db)))
//!     .build()?;
//! let run = orchestrator.run(SyncKind::Incremental).await;
//! println!("{}: {} records", run.summary.status, run.summary.records_processed);
//! ```

mod catalog;
mod error;
mod orchestrator;
pub mod progress;
pub mod reconcile;
pub mod resource;
pub mod types;

pub use catalog::{
    CatalogImportOptions, DEFAULT_METADATA_CONCURRENCY, DEFAULT_METADATA_PAUSE, import_catalog,
};
pub use error::SyncError;
pub use orchestrator::{EmergencyStop, SyncOrchestrator, SyncOrchestratorBuilder, record_failed_run};
pub use progress::{ProgressCallback, SyncProgress, emit};
pub use reconcile::reconcile_record;
pub use resource::{LocationFilter, ParentRequirement, ResourceDefinition};
pub use types::{
    AGGREGATE_RESOURCE, MAX_SAMPLED_FAILURES, RATE_LIMIT_COOLDOWN_MINUTES, RecordError,
    RecordOutcome, RunStatus, SyncKind, SyncOptions, SyncRun, SyncRunReport,
};
