use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use super::{RecordWrite, Result, SyncStore};
use crate::entity::resource_kind::ResourceKind;
use crate::sync::SyncRunReport;

type RecordId = (ResourceKind, String);

#[derive(Debug, Default)]
struct MemoryInner {
    records: HashMap<RecordId, Value>,
    children: HashMap<RecordId, HashMap<String, Vec<Value>>>,
    watermarks: HashMap<ResourceKind, DateTime<Utc>>,
    runs: Vec<SyncRunReport>,
}

impl MemoryInner {
    fn advance(&mut self, kind: ResourceKind, to: Option<DateTime<Utc>>) {
        if let Some(to) = to {
            let current = self.watermarks.entry(kind).or_insert(to);
            if to > *current {
                *current = to;
            }
        }
    }
}

/// In-process [`SyncStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Start from a known watermark.
    pub fn set_watermark(&self, kind: ResourceKind, watermark: DateTime<Utc>) {
        self.inner().watermarks.insert(kind, watermark);
    }

    /// Stored body of a record, without child collections.
    pub fn get(&self, kind: ResourceKind, key: &str) -> Option<Value> {
        self.inner().records.get(&(kind, key.to_string())).cloned()
    }

    /// Stored elements of one child collection.
    pub fn children(&self, kind: ResourceKind, key: &str, collection: &str) -> Vec<Value> {
        self.inner()
            .children
            .get(&(kind, key.to_string()))
            .and_then(|c| c.get(collection))
            .cloned()
            .unwrap_or_default()
    }

    pub fn count(&self, kind: ResourceKind) -> usize {
        self.inner()
            .records
            .keys()
            .filter(|(k, _)| *k == kind)
            .count()
    }

    /// Run reports in the order they were appended.
    pub fn runs(&self) -> Vec<SyncRunReport> {
        self.inner().runs.clone()
    }
}

#[async_trait]
impl SyncStore for MemoryStore {
    async fn last_watermark(&self, kind: ResourceKind) -> Result<Option<DateTime<Utc>>> {
        Ok(self.inner().watermarks.get(&kind).copied())
    }

    async fn exists(&self, kind: ResourceKind, key: &str) -> Result<bool> {
        Ok(self.inner().records.contains_key(&(kind, key.to_string())))
    }

    async fn upsert(&self, kind: ResourceKind, write: RecordWrite<'_>) -> Result<bool> {
        let (body, collections) = write.split();
        let id = (kind, write.key.to_string());

        let mut inner = self.inner();
        let existed = inner.records.insert(id.clone(), body).is_some();
        let children = inner.children.entry(id).or_default();
        for (name, items) in collections {
            children.insert(name.to_string(), items.to_vec());
        }
        inner.advance(kind, write.modified);
        Ok(existed)
    }

    async fn delete(
        &self,
        kind: ResourceKind,
        key: &str,
        modified: Option<DateTime<Utc>>,
    ) -> Result<bool> {
        let id = (kind, key.to_string());
        let mut inner = self.inner();
        let existed = inner.records.remove(&id).is_some();
        inner.children.remove(&id);
        inner.advance(kind, modified);
        Ok(existed)
    }

    async fn advance_watermark(&self, kind: ResourceKind, to: DateTime<Utc>) -> Result<()> {
        self.inner().advance(kind, Some(to));
        Ok(())
    }

    async fn append_run_log(&self, report: &SyncRunReport) -> Result<()> {
        self.inner().runs.push(report.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;
    use crate::listing::Record;

    fn ts(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, hour, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn upsert_reports_prior_existence_and_replaces_children() {
        let store = MemoryStore::new();
        let first = Record::new(json!({"ListingKey": "L1", "Media": [{"n": 1}, {"n": 2}]}));
        let write = RecordWrite::new("L1", &first).expand(Some("Media"));

        assert!(!store.upsert(ResourceKind::Property, write).await.expect("upsert"));
        assert_eq!(store.children(ResourceKind::Property, "L1", "Media").len(), 2);

        let second = Record::new(json!({"ListingKey": "L1", "Media": [{"n": 3}]}));
        let write = RecordWrite::new("L1", &second).expand(Some("Media"));
        assert!(store.upsert(ResourceKind::Property, write).await.expect("upsert"));
        assert_eq!(
            store.children(ResourceKind::Property, "L1", "Media"),
            vec![json!({"n": 3})]
        );
        assert_eq!(
            store.get(ResourceKind::Property, "L1"),
            Some(json!({"ListingKey": "L1"}))
        );
    }

    #[tokio::test]
    async fn watermark_only_moves_forward() {
        let store = MemoryStore::new();
        let record = Record::new(json!({"OfficeKey": "O1"}));

        store
            .upsert(ResourceKind::Office, RecordWrite::new("O1", &record).modified(Some(ts(5))))
            .await
            .expect("upsert");
        store
            .upsert(ResourceKind::Office, RecordWrite::new("O1", &record).modified(Some(ts(3))))
            .await
            .expect("upsert");
        assert_eq!(
            store.last_watermark(ResourceKind::Office).await.expect("watermark"),
            Some(ts(5))
        );

        store
            .advance_watermark(ResourceKind::Office, ts(7))
            .await
            .expect("advance");
        assert_eq!(
            store.last_watermark(ResourceKind::Office).await.expect("watermark"),
            Some(ts(7))
        );
        assert_eq!(
            store.last_watermark(ResourceKind::Member).await.expect("watermark"),
            None
        );
    }

    #[tokio::test]
    async fn delete_removes_record_and_children() {
        let store = MemoryStore::new();
        let record = Record::new(json!({"MemberKey": "M1", "Media": [{"n": 1}]}));
        store
            .upsert(
                ResourceKind::Member,
                RecordWrite::new("M1", &record).expand(Some("Media")),
            )
            .await
            .expect("upsert");

        assert!(store.delete(ResourceKind::Member, "M1", Some(ts(1))).await.expect("delete"));
        assert!(!store.exists(ResourceKind::Member, "M1").await.expect("exists"));
        assert!(store.children(ResourceKind::Member, "M1", "Media").is_empty());
        assert!(!store.delete(ResourceKind::Member, "M1", None).await.expect("delete"));
    }
}
