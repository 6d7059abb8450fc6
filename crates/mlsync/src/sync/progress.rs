//! Progress reporting types for sync operations.
//!
//! Events are emitted through an optional callback so that the library
//! stays independent of how (or whether) progress is displayed.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::types::{RunStatus, SyncKind};
use crate::entity::resource_kind::ResourceKind;

/// Progress events emitted during a sync run.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum SyncProgress {
    /// A run is starting.
    RunStarted {
        run_id: Uuid,
        sync_kind: SyncKind,
        /// Number of resources in the run.
        resources: usize,
    },

    /// Starting to sync one resource.
    ResourceStarted {
        resource: ResourceKind,
        /// Watermark the fetch is filtered on, if any.
        since: Option<DateTime<Utc>>,
    },

    /// A resource was not fetched at all.
    ResourceSkipped {
        resource: ResourceKind,
        reason: String,
    },

    /// A page was fetched and reconciled.
    PageFetched {
        resource: ResourceKind,
        /// Page number (1-indexed).
        page: u32,
        /// Records on the page before filtering.
        fetched: usize,
        /// Records handed to reconciliation.
        delivered: usize,
        has_next: bool,
    },

    /// A batch of catalog datasets is about to be imported.
    DatasetBatch {
        batch: usize,
        total: usize,
        size: usize,
    },

    /// Reconciling a single record failed.
    RecordFailed {
        resource: ResourceKind,
        key: Option<String>,
        error: String,
    },

    /// The provider throttled a request; the client is waiting before retry.
    Throttled {
        /// Which limit the provider's message points at.
        kind: String,
        wait_secs: u64,
        /// Current attempt number.
        attempt: u32,
    },

    /// Throttle retries ran out; the remaining resources will be skipped.
    EmergencyStop {
        resource: ResourceKind,
        message: String,
    },

    /// A resource finished, successfully or not.
    ResourceFinished {
        resource: ResourceKind,
        status: RunStatus,
        processed: u64,
        created: u64,
        updated: u64,
        deleted: u64,
        failed: u64,
    },

    /// The whole run finished.
    RunFinished {
        run_id: Uuid,
        status: RunStatus,
        processed: u64,
        duration_seconds: f64,
    },

    /// Warning message (non-fatal).
    Warning { message: String },
}

/// Callback for progress updates during sync operations.
pub type ProgressCallback = Box<dyn Fn(SyncProgress) + Send + Sync>;

/// Emit a progress event if a callback is provided.
#[inline]
pub fn emit(on_progress: Option<&ProgressCallback>, event: SyncProgress) {
    if let Some(cb) = on_progress {
        cb(event);
    }
}
