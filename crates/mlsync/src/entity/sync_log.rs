//! SyncLog entity - one row per persisted run report.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sync_logs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Shared by every report of one orchestrator run.
    pub run_id: Uuid,
    /// Resource name, or `All` for the aggregate report.
    pub resource_type: String,
    pub sync_kind: String,
    pub status: String,

    pub records_fetched: i64,
    pub records_processed: i64,
    pub records_created: i64,
    pub records_updated: i64,
    pub records_deleted: i64,
    pub records_skipped: i64,
    pub records_failed: i64,

    pub started_at: DateTimeWithTimeZone,
    pub completed_at: DateTimeWithTimeZone,
    pub duration_seconds: f64,

    #[sea_orm(column_type = "Text", nullable)]
    pub error_message: Option<String>,

    /// Sampled per-record failures.
    #[sea_orm(column_type = "Json")]
    pub failures: serde_json::Value,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
