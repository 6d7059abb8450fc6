//! RecordChild entity - elements of a record's expanded child collections
//! (media, rooms, unit types).
//!
//! Children are replaced wholesale whenever their parent is upserted.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::entity::resource_kind::ResourceKind;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "record_children")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub resource_type: ResourceKind,
    pub parent_key: String,
    /// Expansion name, e.g. `Media`.
    pub collection: String,
    /// Position within the collection as delivered.
    pub position: i32,

    #[sea_orm(column_type = "Json")]
    pub body: serde_json::Value,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
