//! Common re-exports for convenient entity usage.

pub use super::record_child::{
    ActiveModel as RecordChildActiveModel, Column as RecordChildColumn, Entity as RecordChild,
    Model as RecordChildModel,
};
pub use super::resource_kind::ResourceKind;
pub use super::sync_log::{
    ActiveModel as SyncLogActiveModel, Column as SyncLogColumn, Entity as SyncLog,
    Model as SyncLogModel,
};
pub use super::sync_state::{
    ActiveModel as SyncStateActiveModel, Column as SyncStateColumn, Entity as SyncState,
    Model as SyncStateModel,
};
pub use super::synced_record::{
    ActiveModel as SyncedRecordActiveModel, Column as SyncedRecordColumn, Entity as SyncedRecord,
    Model as SyncedRecordModel,
};
