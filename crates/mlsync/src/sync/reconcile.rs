//! Per-record reconciliation against a [`SyncStore`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::progress::{ProgressCallback, SyncProgress, emit};
use super::resource::ResourceDefinition;
use super::types::{RecordError, RecordOutcome, SyncRunReport};
use crate::listing::{PageInfo, PageSink, Record};
use crate::store::{RecordWrite, StoreError, SyncStore};

/// Decide and apply what one record means for the store.
///
/// Visible records are upserted; invisible ones are deleted if stored and
/// ignored otherwise. A record whose required parent is not stored is
/// skipped without touching the store.
pub async fn reconcile_record(
    store: &dyn SyncStore,
    definition: &ResourceDefinition,
    record: &Record,
) -> RecordOutcome {
    let kind = definition.kind;
    let Some(key) = record.key(kind.key_field()) else {
        return RecordOutcome::Failed(RecordError::new(
            None,
            format!("record has no {}", kind.key_field()),
        ));
    };

    match apply(store, definition, record, &key).await {
        Ok(outcome) => outcome,
        Err(e) => RecordOutcome::Failed(RecordError::new(Some(&key), e.to_string())),
    }
}

async fn apply(
    store: &dyn SyncStore,
    definition: &ResourceDefinition,
    record: &Record,
    key: &str,
) -> Result<RecordOutcome, StoreError> {
    let kind = definition.kind;

    if let Some(parent) = definition.parent
        && let Some(parent_key) = record.key(parent.key_field)
        && !store.exists(parent.kind, &parent_key).await?
    {
        return Ok(RecordOutcome::Skipped);
    }

    let modified: Option<DateTime<Utc>> = record.timestamp(kind.timestamp_field());
    let visible = match kind.visibility_field() {
        Some(field) => record.flag(field).unwrap_or(false),
        None => true,
    };

    if visible {
        let write = RecordWrite::new(key, record)
            .modified(modified)
            .expand(definition.expand.as_deref());
        let existed = store.upsert(kind, write).await?;
        return Ok(if existed {
            RecordOutcome::Updated
        } else {
            RecordOutcome::Created
        });
    }

    if store.exists(kind, key).await? {
        store.delete(kind, key, modified).await?;
        return Ok(RecordOutcome::Deleted);
    }

    if let Some(ts) = modified {
        store.advance_watermark(kind, ts).await?;
    }
    Ok(RecordOutcome::Ignored)
}

/// Page sink that reconciles every delivered record and accumulates the
/// resource report.
pub(crate) struct Reconciler<'a> {
    store: &'a dyn SyncStore,
    definition: &'a ResourceDefinition,
    report: SyncRunReport,
    on_progress: Option<&'a ProgressCallback>,
}

impl<'a> Reconciler<'a> {
    pub(crate) fn new(
        store: &'a dyn SyncStore,
        definition: &'a ResourceDefinition,
        report: SyncRunReport,
        on_progress: Option<&'a ProgressCallback>,
    ) -> Self {
        Self {
            store,
            definition,
            report,
            on_progress,
        }
    }

    pub(crate) fn into_report(self) -> SyncRunReport {
        self.report
    }
}

#[async_trait]
impl PageSink for Reconciler<'_> {
    async fn on_page(&mut self, info: PageInfo, records: Vec<Record>) {
        let kind = self.definition.kind;
        self.report.records_fetched += info.fetched as u64;
        let delivered = records.len();

        for record in &records {
            let outcome = reconcile_record(self.store, self.definition, record).await;
            if let RecordOutcome::Failed(error) = &outcome {
                tracing::warn!(
                    resource = %kind,
                    key = error.key.as_deref().unwrap_or("-"),
                    error = %error.message,
                    "Failed to reconcile record"
                );
                emit(
                    self.on_progress,
                    SyncProgress::RecordFailed {
                        resource: kind,
                        key: error.key.clone(),
                        error: error.message.clone(),
                    },
                );
            }
            self.report.record(outcome);
        }

        tracing::debug!(
            resource = %kind,
            page = info.number,
            fetched = info.fetched,
            delivered,
            created = self.report.records_created,
            updated = self.report.records_updated,
            deleted = self.report.records_deleted,
            "Reconciled page"
        );
        emit(
            self.on_progress,
            SyncProgress::PageFetched {
                resource: kind,
                page: info.number,
                fetched: info.fetched,
                delivered,
                has_next: info.has_next,
            },
        );
    }
}
