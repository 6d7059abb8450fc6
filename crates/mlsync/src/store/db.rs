use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use super::error::{Result, StoreError};
use super::{RecordWrite, SyncStore};
use crate::entity::record_child::{
    ActiveModel as RecordChildActiveModel, Column as RecordChildColumn, Entity as RecordChild,
    Model as RecordChildModel,
};
use crate::entity::resource_kind::ResourceKind;
use crate::entity::sync_log::{
    ActiveModel as SyncLogActiveModel, Column as SyncLogColumn, Entity as SyncLog,
    Model as SyncLogModel,
};
use crate::entity::sync_state::{ActiveModel as SyncStateActiveModel, Entity as SyncState, Model as SyncStateModel};
use crate::entity::synced_record::{
    ActiveModel as SyncedRecordActiveModel, Column as SyncedRecordColumn, Entity as SyncedRecord,
    Model as SyncedRecordModel,
};
use crate::retry::with_retry;
use crate::sync::{RunStatus, SyncKind, SyncRunReport};

/// [`SyncStore`] backed by a sea-orm connection.
///
/// Every record write runs in its own transaction together with the child
/// rows and the watermark advance it implies. Transient lock errors are
/// retried with backoff.
#[derive(Debug)]
pub struct DbStore {
    db: DatabaseConnection,
}

impl DbStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    pub async fn find(&self, kind: ResourceKind, key: &str) -> Result<Option<SyncedRecordModel>> {
        find_record(&self.db, kind, key).await
    }

    /// Child rows of a record, grouped by collection in delivery order.
    pub async fn children(&self, kind: ResourceKind, key: &str) -> Result<Vec<RecordChildModel>> {
        Ok(RecordChild::find()
            .filter(RecordChildColumn::ResourceType.eq(kind))
            .filter(RecordChildColumn::ParentKey.eq(key))
            .order_by_asc(RecordChildColumn::Collection)
            .order_by_asc(RecordChildColumn::Position)
            .all(&self.db)
            .await?)
    }

    pub async fn count(&self, kind: ResourceKind) -> Result<u64> {
        Ok(SyncedRecord::find()
            .filter(SyncedRecordColumn::ResourceType.eq(kind))
            .count(&self.db)
            .await?)
    }

    /// Every stored watermark.
    pub async fn watermarks(&self) -> Result<Vec<SyncStateModel>> {
        Ok(SyncState::find().all(&self.db).await?)
    }

    /// Most recent run reports, newest first.
    pub async fn recent_runs(&self, limit: u64) -> Result<Vec<SyncRunReport>> {
        let logs = SyncLog::find()
            .order_by_desc(SyncLogColumn::StartedAt)
            .limit(limit)
            .all(&self.db)
            .await?;
        logs.into_iter().map(report_from_log).collect()
    }

    async fn upsert_once(&self, kind: ResourceKind, write: RecordWrite<'_>) -> Result<bool> {
        let (body, collections) = write.split();
        let now = Utc::now().fixed_offset();
        let modified = write.modified.map(|ts| ts.fixed_offset());

        let txn = self.db.begin().await?;

        let existing = find_record(&txn, kind, write.key).await?;
        let existed = existing.is_some();
        match existing {
            Some(model) => {
                let mut active: SyncedRecordActiveModel = model.into();
                active.body = Set(body);
                active.modification_timestamp = Set(modified);
                active.synced_at = Set(now);
                active.update(&txn).await?;
            }
            None => {
                SyncedRecordActiveModel {
                    id: Set(Uuid::new_v4()),
                    resource_type: Set(kind),
                    record_key: Set(write.key.to_string()),
                    body: Set(body),
                    modification_timestamp: Set(modified),
                    synced_at: Set(now),
                }
                .insert(&txn)
                .await?;
            }
        }

        if !collections.is_empty() {
            let names: Vec<&str> = collections.iter().map(|(name, _)| *name).collect();
            RecordChild::delete_many()
                .filter(RecordChildColumn::ResourceType.eq(kind))
                .filter(RecordChildColumn::ParentKey.eq(write.key))
                .filter(RecordChildColumn::Collection.is_in(names))
                .exec(&txn)
                .await?;

            let rows: Vec<RecordChildActiveModel> = collections
                .iter()
                .flat_map(|(name, items)| {
                    items.iter().enumerate().map(move |(position, item)| RecordChildActiveModel {
                        id: Set(Uuid::new_v4()),
                        resource_type: Set(kind),
                        parent_key: Set(write.key.to_string()),
                        collection: Set((*name).to_string()),
                        position: Set(i32::try_from(position).unwrap_or(i32::MAX)),
                        body: Set(item.clone()),
                    })
                })
                .collect();
            if !rows.is_empty() {
                RecordChild::insert_many(rows).exec(&txn).await?;
            }
        }

        if let Some(ts) = write.modified {
            advance_in(&txn, kind, ts).await?;
        }

        txn.commit().await?;
        Ok(existed)
    }

    async fn delete_once(
        &self,
        kind: ResourceKind,
        key: &str,
        modified: Option<DateTime<Utc>>,
    ) -> Result<bool> {
        let txn = self.db.begin().await?;

        let deleted = SyncedRecord::delete_many()
            .filter(SyncedRecordColumn::ResourceType.eq(kind))
            .filter(SyncedRecordColumn::RecordKey.eq(key))
            .exec(&txn)
            .await?;
        RecordChild::delete_many()
            .filter(RecordChildColumn::ResourceType.eq(kind))
            .filter(RecordChildColumn::ParentKey.eq(key))
            .exec(&txn)
            .await?;
        if let Some(ts) = modified {
            advance_in(&txn, kind, ts).await?;
        }

        txn.commit().await?;
        Ok(deleted.rows_affected > 0)
    }
}

#[async_trait]
impl SyncStore for DbStore {
    async fn last_watermark(&self, kind: ResourceKind) -> Result<Option<DateTime<Utc>>> {
        let state = SyncState::find_by_id(kind.as_str().to_string())
            .one(&self.db)
            .await?;
        Ok(state
            .and_then(|s| s.last_watermark)
            .map(|ts| ts.with_timezone(&Utc)))
    }

    async fn exists(&self, kind: ResourceKind, key: &str) -> Result<bool> {
        Ok(find_record(&self.db, kind, key).await?.is_some())
    }

    async fn upsert(&self, kind: ResourceKind, write: RecordWrite<'_>) -> Result<bool> {
        with_retry(
            || self.upsert_once(kind, write),
            StoreError::is_retryable,
            "upsert",
        )
        .await
    }

    async fn delete(
        &self,
        kind: ResourceKind,
        key: &str,
        modified: Option<DateTime<Utc>>,
    ) -> Result<bool> {
        with_retry(
            || self.delete_once(kind, key, modified),
            StoreError::is_retryable,
            "delete",
        )
        .await
    }

    async fn advance_watermark(&self, kind: ResourceKind, to: DateTime<Utc>) -> Result<()> {
        with_retry(
            || advance_in(&self.db, kind, to),
            StoreError::is_retryable,
            "advance_watermark",
        )
        .await
    }

    async fn append_run_log(&self, report: &SyncRunReport) -> Result<()> {
        let model = SyncLogActiveModel {
            id: Set(Uuid::new_v4()),
            run_id: Set(report.run_id),
            resource_type: Set(report.resource_type.clone()),
            sync_kind: Set(report.sync_kind.as_str().to_string()),
            status: Set(report.status.as_str().to_string()),
            records_fetched: Set(to_i64(report.records_fetched)),
            records_processed: Set(to_i64(report.records_processed)),
            records_created: Set(to_i64(report.records_created)),
            records_updated: Set(to_i64(report.records_updated)),
            records_deleted: Set(to_i64(report.records_deleted)),
            records_skipped: Set(to_i64(report.records_skipped)),
            records_failed: Set(to_i64(report.records_failed)),
            started_at: Set(report.started_at.fixed_offset()),
            completed_at: Set(report.completed_at.fixed_offset()),
            duration_seconds: Set(report.duration_seconds),
            error_message: Set(report.error_message.clone()),
            failures: Set(serde_json::to_value(&report.failures)?),
        };
        model.insert(&self.db).await?;
        Ok(())
    }
}

async fn find_record<C: ConnectionTrait>(
    conn: &C,
    kind: ResourceKind,
    key: &str,
) -> Result<Option<SyncedRecordModel>> {
    Ok(SyncedRecord::find()
        .filter(SyncedRecordColumn::ResourceType.eq(kind))
        .filter(SyncedRecordColumn::RecordKey.eq(key))
        .one(conn)
        .await?)
}

/// Move the watermark for `kind` to `to` unless it is already later.
async fn advance_in<C: ConnectionTrait>(conn: &C, kind: ResourceKind, to: DateTime<Utc>) -> Result<()> {
    let now = Utc::now().fixed_offset();
    match SyncState::find_by_id(kind.as_str().to_string()).one(conn).await? {
        Some(state)
            if state
                .last_watermark
                .is_some_and(|current| current.with_timezone(&Utc) >= to) => {}
        Some(state) => {
            let mut active: SyncStateActiveModel = state.into();
            active.last_watermark = Set(Some(to.fixed_offset()));
            active.updated_at = Set(now);
            active.update(conn).await?;
        }
        None => {
            SyncStateActiveModel {
                resource_type: Set(kind.as_str().to_string()),
                last_watermark: Set(Some(to.fixed_offset())),
                updated_at: Set(now),
            }
            .insert(conn)
            .await?;
        }
    }
    Ok(())
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn report_from_log(log: SyncLogModel) -> Result<SyncRunReport> {
    let sync_kind = log
        .sync_kind
        .parse::<SyncKind>()
        .map_err(StoreError::invalid)?;
    let status = log.status.parse::<RunStatus>().map_err(StoreError::invalid)?;
    Ok(SyncRunReport {
        run_id: log.run_id,
        resource_type: log.resource_type,
        sync_kind,
        status,
        records_fetched: log.records_fetched.max(0) as u64,
        records_processed: log.records_processed.max(0) as u64,
        records_created: log.records_created.max(0) as u64,
        records_updated: log.records_updated.max(0) as u64,
        records_deleted: log.records_deleted.max(0) as u64,
        records_skipped: log.records_skipped.max(0) as u64,
        records_failed: log.records_failed.max(0) as u64,
        started_at: log.started_at.with_timezone(&Utc),
        completed_at: log.completed_at.with_timezone(&Utc),
        duration_seconds: log.duration_seconds,
        error_message: log.error_message,
        failures: serde_json::from_value(log.failures)?,
    })
}
