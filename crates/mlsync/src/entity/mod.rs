//! SeaORM entity definitions for the sync database schema.

pub mod prelude;
pub mod record_child;
pub mod resource_kind;
pub mod sync_log;
pub mod sync_state;
pub mod synced_record;
