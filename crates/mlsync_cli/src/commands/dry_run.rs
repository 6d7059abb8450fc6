use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mlsync::entity::resource_kind::ResourceKind;
use mlsync::store::{DbStore, MemoryStore, RecordWrite, Result, SyncStore};
use mlsync::sync::SyncRunReport;

/// Store that reads the real database but writes nowhere.
///
/// Watermarks and existence checks come from the database so a dry run
/// fetches and classifies exactly what a real run would; writes land in a
/// scratch [`MemoryStore`] that is dropped afterwards.
pub(crate) struct DryRunStore {
    db: DbStore,
    scratch: MemoryStore,
}

impl DryRunStore {
    pub(crate) fn new(db: DbStore) -> Self {
        Self {
            db,
            scratch: MemoryStore::new(),
        }
    }
}

#[async_trait]
impl SyncStore for DryRunStore {
    async fn last_watermark(&self, kind: ResourceKind) -> Result<Option<DateTime<Utc>>> {
        let stored = self.db.last_watermark(kind).await?;
        let scratch = self.scratch.last_watermark(kind).await?;
        Ok(stored.max(scratch))
    }

    async fn exists(&self, kind: ResourceKind, key: &str) -> Result<bool> {
        Ok(self.scratch.exists(kind, key).await? || self.db.exists(kind, key).await?)
    }

    async fn upsert(&self, kind: ResourceKind, write: RecordWrite<'_>) -> Result<bool> {
        let existed = self.exists(kind, write.key).await?;
        self.scratch.upsert(kind, write).await?;
        Ok(existed)
    }

    async fn delete(
        &self,
        kind: ResourceKind,
        key: &str,
        modified: Option<DateTime<Utc>>,
    ) -> Result<bool> {
        let existed = self.exists(kind, key).await?;
        self.scratch.delete(kind, key, modified).await?;
        if let Some(ts) = modified {
            self.scratch.advance_watermark(kind, ts).await?;
        }
        Ok(existed)
    }

    async fn advance_watermark(&self, kind: ResourceKind, to: DateTime<Utc>) -> Result<()> {
        self.scratch.advance_watermark(kind, to).await
    }

    async fn append_run_log(&self, report: &SyncRunReport) -> Result<()> {
        tracing::debug!(
            resource = %report.resource_type,
            status = %report.status,
            "Dry run, not writing sync log"
        );
        Ok(())
    }
}
