//! SyncState entity - the per-resource watermark.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sync_state")]
pub struct Model {
    /// Resource name as rendered by `ResourceKind::as_str`.
    #[sea_orm(primary_key, auto_increment = false)]
    pub resource_type: String,

    /// Latest modification timestamp reconciled for this resource.
    pub last_watermark: Option<DateTimeWithTimeZone>,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
