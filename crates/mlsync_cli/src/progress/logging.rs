use mlsync::sync::SyncProgress;

/// Logging reporter using tracing for structured output.
pub(crate) struct LoggingReporter;

impl LoggingReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, event: SyncProgress) {
        match event {
            SyncProgress::RunStarted {
                run_id,
                sync_kind,
                resources,
            } => {
                tracing::info!(%run_id, sync_kind = %sync_kind, resources, "Sync run started");
            }

            SyncProgress::ResourceStarted { resource, since } => {
                tracing::info!(resource = %resource, since = ?since, "Syncing resource");
            }

            SyncProgress::ResourceSkipped { resource, reason } => {
                tracing::warn!(resource = %resource, reason = %reason, "Resource skipped");
            }

            SyncProgress::PageFetched {
                resource,
                page,
                fetched,
                delivered,
                has_next,
            } => {
                tracing::debug!(resource = %resource, page, fetched, delivered, has_next, "Fetched page");
            }

            SyncProgress::DatasetBatch { batch, total, size } => {
                tracing::info!(batch, total, size, "Importing dataset batch");
            }

            SyncProgress::RecordFailed {
                resource,
                key,
                error,
            } => {
                tracing::warn!(resource = %resource, key = ?key, error = %error, "Record failed");
            }

            SyncProgress::Throttled {
                kind,
                wait_secs,
                attempt,
            } => {
                tracing::warn!(kind = %kind, wait_secs, attempt, "Throttled by provider, waiting");
            }

            SyncProgress::EmergencyStop { resource, message } => {
                tracing::error!(resource = %resource, message = %message, "Emergency stop");
            }

            SyncProgress::ResourceFinished {
                resource,
                status,
                processed,
                created,
                updated,
                deleted,
                failed,
            } => {
                tracing::info!(
                    resource = %resource,
                    status = %status,
                    processed,
                    created,
                    updated,
                    deleted,
                    failed,
                    "Resource finished"
                );
            }

            SyncProgress::RunFinished {
                run_id,
                status,
                processed,
                duration_seconds,
            } => {
                tracing::info!(%run_id, status = %status, processed, duration_seconds, "Sync run finished");
            }

            SyncProgress::Warning { message } => {
                tracing::warn!(message = %message, "Warning");
            }

            _ => {}
        }
    }
}

impl Default for LoggingReporter {
    fn default() -> Self {
        Self::new()
    }
}
