//! Persistence for reconciled records, watermarks and run logs.
//!
//! The orchestrator only talks to the [`SyncStore`] trait. [`DbStore`] is
//! the sea-orm implementation; [`MemoryStore`] keeps everything in process
//! for dry runs and tests.

mod db;
pub mod error;
mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::entity::resource_kind::ResourceKind;
use crate::listing::Record;
use crate::sync::SyncRunReport;

pub use db::DbStore;
pub use error::{Result, StoreError};
pub use memory::MemoryStore;

/// One record to write.
#[derive(Debug, Clone, Copy)]
pub struct RecordWrite<'a> {
    pub key: &'a str,
    pub record: &'a Record,
    /// Provider modification time; advances the watermark when present.
    pub modified: Option<DateTime<Utc>>,
    /// Comma-separated child collections stored as child rows.
    pub expand: Option<&'a str>,
}

impl<'a> RecordWrite<'a> {
    pub fn new(key: &'a str, record: &'a Record) -> Self {
        Self {
            key,
            record,
            modified: None,
            expand: None,
        }
    }

    #[must_use]
    pub fn modified(mut self, modified: Option<DateTime<Utc>>) -> Self {
        self.modified = modified;
        self
    }

    #[must_use]
    pub fn expand(mut self, expand: Option<&'a str>) -> Self {
        self.expand = expand;
        self
    }

    /// The record body without its child collections, and the child
    /// collections present on it.
    pub(crate) fn split(&self) -> (Value, Vec<(&'a str, &'a [Value])>) {
        let children = match self.expand {
            Some(expand) => self.record.child_collections(expand),
            None => Vec::new(),
        };
        let mut body = self.record.as_value().clone();
        if let Some(obj) = body.as_object_mut() {
            for (name, _) in &children {
                obj.remove(*name);
            }
        }
        (body, children)
    }
}

/// Persistence contract consumed by the orchestrator.
///
/// Upserts must be idempotent: replaying a record leaves the same end state.
/// A record write and the watermark advance it implies are atomic, and the
/// watermark never moves backwards.
#[async_trait]
pub trait SyncStore: Send + Sync {
    /// Latest modification timestamp reconciled for `kind`.
    async fn last_watermark(&self, kind: ResourceKind) -> Result<Option<DateTime<Utc>>>;

    async fn exists(&self, kind: ResourceKind, key: &str) -> Result<bool>;

    /// Insert or replace a record and its children. Returns whether the
    /// record existed before.
    async fn upsert(&self, kind: ResourceKind, write: RecordWrite<'_>) -> Result<bool>;

    /// Remove a record and its children. Returns whether it existed.
    async fn delete(
        &self,
        kind: ResourceKind,
        key: &str,
        modified: Option<DateTime<Utc>>,
    ) -> Result<bool>;

    /// Move the watermark forward without writing a record, for records
    /// that were seen but needed no write.
    async fn advance_watermark(&self, kind: ResourceKind, to: DateTime<Utc>) -> Result<()>;

    async fn append_run_log(&self, report: &SyncRunReport) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn split_removes_present_child_collections() {
        let record = Record::new(json!({
            "ListingKey": "L1",
            "Media": [{"MediaKey": "m1"}],
            "Rooms": null
        }));
        let write = RecordWrite::new("L1", &record).expand(Some("Media,Rooms"));
        let (body, children) = write.split();

        assert_eq!(body, json!({"ListingKey": "L1", "Rooms": null}));
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].0, "Media");
    }

    #[test]
    fn split_without_expand_keeps_body() {
        let record = Record::new(json!({"OfficeKey": "O1", "Media": []}));
        let (body, children) = RecordWrite::new("O1", &record).split();
        assert_eq!(body, *record.as_value());
        assert!(children.is_empty());
    }
}
