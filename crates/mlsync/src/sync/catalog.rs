//! Catalog import: datasets from the statistical catalog, reconciled into
//! the same store as listing records.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinSet;
use uuid::Uuid;

use super::progress::{ProgressCallback, SyncProgress, emit};
use super::reconcile::reconcile_record;
use super::resource::ResourceDefinition;
use super::types::{RecordError, RecordOutcome, RunStatus, SyncKind, SyncRunReport};
use crate::catalog::{BatchInfo, BatchOptions, CatalogClient, CatalogDataset, CatalogMetadata, DatasetSink};
use crate::entity::resource_kind::ResourceKind;
use crate::store::SyncStore;

/// Datasets whose metadata is fetched at once.
pub const DEFAULT_METADATA_CONCURRENCY: usize = 10;

/// Pause between metadata groups.
pub const DEFAULT_METADATA_PAUSE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct CatalogImportOptions {
    pub batch: BatchOptions,
    /// Fetch and embed each dataset's linked metadata documents.
    pub with_metadata: bool,
    pub metadata_concurrency: usize,
    pub metadata_pause: Duration,
}

impl Default for CatalogImportOptions {
    fn default() -> Self {
        Self {
            batch: BatchOptions::default(),
            with_metadata: true,
            metadata_concurrency: DEFAULT_METADATA_CONCURRENCY,
            metadata_pause: DEFAULT_METADATA_PAUSE,
        }
    }
}

/// Import the catalog into `store` and append the run log.
///
/// Catalog imports are always full: every selected dataset is upserted.
pub async fn import_catalog(
    client: Arc<CatalogClient>,
    store: &dyn SyncStore,
    options: &CatalogImportOptions,
    on_progress: Option<&ProgressCallback>,
) -> SyncRunReport {
    let run_id = Uuid::new_v4();
    let report = SyncRunReport::start(run_id, ResourceKind::Dataset.as_str(), SyncKind::Full);
    let definition = ResourceDefinition::new(ResourceKind::Dataset);

    emit(
        on_progress,
        SyncProgress::RunStarted {
            run_id,
            sync_kind: SyncKind::Full,
            resources: 1,
        },
    );

    let mut importer = DatasetImporter {
        client: Arc::clone(&client),
        store,
        definition: &definition,
        options,
        report,
        on_progress,
    };
    let result = client.for_each_batch(&options.batch, &mut importer).await;
    let report = importer.report;

    let report = match result {
        Ok(stats) if stats.cancelled => report.finish(
            RunStatus::Paused,
            Some("Stopped before all batches were imported".to_string()),
        ),
        Ok(_) => report.finish(RunStatus::Success, None),
        Err(e) => {
            tracing::error!(error = %e, "Catalog import failed");
            report.finish(RunStatus::Error, Some(e.to_string()))
        }
    };

    tracing::info!(
        status = %report.status,
        fetched = report.records_fetched,
        created = report.records_created,
        updated = report.records_updated,
        failed = report.records_failed,
        duration_seconds = report.duration_seconds,
        "Catalog import finished"
    );

    if let Err(e) = store.append_run_log(&report).await {
        tracing::error!(error = %e, "Failed to write sync log");
    }
    emit(
        on_progress,
        SyncProgress::RunFinished {
            run_id,
            status: report.status,
            processed: report.records_processed,
            duration_seconds: report.duration_seconds,
        },
    );

    report
}

struct DatasetImporter<'a> {
    client: Arc<CatalogClient>,
    store: &'a dyn SyncStore,
    definition: &'a ResourceDefinition,
    options: &'a CatalogImportOptions,
    report: SyncRunReport,
    on_progress: Option<&'a ProgressCallback>,
}

impl DatasetImporter<'_> {
    /// Metadata for each dataset, in input order, fetched in groups.
    async fn fetch_metadata(&self, datasets: &[CatalogDataset]) -> Vec<CatalogMetadata> {
        let concurrency = self.options.metadata_concurrency.max(1);
        let mut metadata = vec![CatalogMetadata::default(); datasets.len()];

        for (group, chunk) in datasets.chunks(concurrency).enumerate() {
            if group > 0 {
                tokio::time::sleep(self.options.metadata_pause).await;
            }

            let mut join_set: JoinSet<(usize, CatalogMetadata)> = JoinSet::new();
            for (offset, dataset) in chunk.iter().enumerate() {
                let client = Arc::clone(&self.client);
                let dataset = dataset.clone();
                let index = group * concurrency + offset;
                join_set.spawn(async move { (index, client.fetch_metadata(&dataset).await) });
            }

            while let Some(joined) = join_set.join_next().await {
                match joined {
                    Ok((index, fetched)) => metadata[index] = fetched,
                    Err(e) => tracing::warn!(error = %e, "Metadata task failed"),
                }
            }
        }

        metadata
    }
}

#[async_trait]
impl DatasetSink for DatasetImporter<'_> {
    async fn on_batch(&mut self, info: BatchInfo, datasets: Vec<CatalogDataset>) {
        self.report.records_fetched += datasets.len() as u64;
        emit(
            self.on_progress,
            SyncProgress::DatasetBatch {
                batch: info.number,
                total: info.total,
                size: datasets.len(),
            },
        );

        let metadata = if self.options.with_metadata {
            Some(self.fetch_metadata(&datasets).await)
        } else {
            None
        };

        for (index, dataset) in datasets.iter().enumerate() {
            let embedded = metadata.as_ref().map(|all| &all[index]);
            let outcome = match dataset.to_record(embedded) {
                Ok(record) => reconcile_record(self.store, self.definition, &record).await,
                Err(e) => RecordOutcome::Failed(RecordError::new(
                    Some(&dataset.identifier),
                    e.to_string(),
                )),
            };

            if let RecordOutcome::Failed(error) = &outcome {
                tracing::warn!(
                    key = %dataset.identifier,
                    error = %error.message,
                    "Failed to import dataset"
                );
                emit(
                    self.on_progress,
                    SyncProgress::RecordFailed {
                        resource: ResourceKind::Dataset,
                        key: error.key.clone(),
                        error: error.message.clone(),
                    },
                );
            }
            self.report.record(outcome);
        }
    }
}
