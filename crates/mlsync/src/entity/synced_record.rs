//! SyncedRecord entity - one row per provider record, keyed by resource and
//! natural key.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::entity::resource_kind::ResourceKind;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "synced_records")]
pub struct Model {
    /// Internal UUID primary key.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub resource_type: ResourceKind,
    /// Provider natural key (`ListingKey`, `MemberKey`, dataset identifier, ...).
    pub record_key: String,

    /// The record as received, minus expanded child collections.
    #[sea_orm(column_type = "Json")]
    pub body: serde_json::Value,

    /// Provider modification time, when the record carries one.
    pub modification_timestamp: Option<DateTimeWithTimeZone>,

    /// When this row was last written.
    pub synced_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
