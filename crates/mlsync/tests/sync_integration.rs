//! Integration tests for reconciliation against a migrated database.
//!
//! These tests require the `sqlite` and `migrate` features and use an
//! in-memory SQLite database.

#![cfg(all(feature = "sqlite", feature = "migrate"))]

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use mlsync::connect_and_migrate;
use mlsync::entity::resource_kind::ResourceKind;
use mlsync::listing::Record;
use mlsync::store::{DbStore, SyncStore};
use mlsync::sync::{
    RecordOutcome, ResourceDefinition, RunStatus, SyncKind, SyncRunReport, reconcile_record,
};
use serde_json::json;
use uuid::Uuid;

/// If exceeded, a write is likely stuck on a lock.
const STORE_TIMEOUT: Duration = Duration::from_secs(10);

async fn setup_store() -> DbStore {
    let db = connect_and_migrate("sqlite::memory:")
        .await
        .expect("Failed to create test database");
    DbStore::new(db)
}

fn ts(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, hour, 0, 0).unwrap()
}

fn property(key: &str, visible: bool, hour: u32, media: &[&str]) -> Record {
    Record::new(json!({
        "ListingKey": key,
        "MlgCanView": visible,
        "ModificationTimestamp": ts(hour).to_rfc3339(),
        "ListPrice": 350_000,
        "Media": media.iter().map(|m| json!({"MediaKey": m})).collect::<Vec<_>>()
    }))
}

fn property_def() -> ResourceDefinition {
    ResourceDefinition::new(ResourceKind::Property)
}

#[tokio::test]
async fn test_property_lifecycle_with_children() {
    let store = setup_store().await;
    let def = property_def();

    let outcome = reconcile_record(&store, &def, &property("P1", true, 1, &["m1", "m2"])).await;
    assert_eq!(outcome, RecordOutcome::Created);

    let stored = store
        .find(ResourceKind::Property, "P1")
        .await
        .expect("find")
        .expect("stored");
    assert_eq!(stored.body["ListPrice"], json!(350_000));
    assert!(stored.body.get("Media").is_none(), "children are stored as rows");
    assert_eq!(
        stored.modification_timestamp.map(|t| t.with_timezone(&Utc)),
        Some(ts(1))
    );

    let children = store
        .children(ResourceKind::Property, "P1")
        .await
        .expect("children");
    let keys: Vec<&str> = children
        .iter()
        .filter_map(|c| c.body["MediaKey"].as_str())
        .collect();
    assert_eq!(keys, vec!["m1", "m2"]);

    // An update replaces the collection rather than appending to it.
    let outcome = reconcile_record(&store, &def, &property("P1", true, 2, &["m3"])).await;
    assert_eq!(outcome, RecordOutcome::Updated);
    let children = store
        .children(ResourceKind::Property, "P1")
        .await
        .expect("children");
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].body["MediaKey"], json!("m3"));

    // Losing visibility deletes the record and its children.
    let outcome = reconcile_record(&store, &def, &property("P1", false, 3, &[])).await;
    assert_eq!(outcome, RecordOutcome::Deleted);
    assert!(
        store
            .find(ResourceKind::Property, "P1")
            .await
            .expect("find")
            .is_none()
    );
    assert!(
        store
            .children(ResourceKind::Property, "P1")
            .await
            .expect("children")
            .is_empty()
    );
    assert_eq!(
        store
            .last_watermark(ResourceKind::Property)
            .await
            .expect("watermark"),
        Some(ts(3))
    );
}

#[tokio::test]
async fn test_watermark_only_moves_forward() {
    let store = setup_store().await;
    let def = property_def();

    reconcile_record(&store, &def, &property("P1", true, 5, &[])).await;
    reconcile_record(&store, &def, &property("P2", true, 2, &[])).await;

    assert_eq!(
        store
            .last_watermark(ResourceKind::Property)
            .await
            .expect("watermark"),
        Some(ts(5))
    );
    assert_eq!(
        store
            .last_watermark(ResourceKind::Office)
            .await
            .expect("watermark"),
        None
    );
    assert_eq!(store.count(ResourceKind::Property).await.expect("count"), 2);
}

#[tokio::test]
async fn test_open_house_requires_stored_property() {
    let store = setup_store().await;
    let defs = ResourceDefinition::standard_set(None);
    let open_house_def = defs
        .iter()
        .find(|d| d.kind == ResourceKind::OpenHouse)
        .expect("open house definition");

    let open_house = Record::new(json!({
        "OpenHouseKey": "OH1",
        "ListingKey": "P1",
        "MlgCanView": true,
        "ModificationTimestamp": ts(4).to_rfc3339()
    }));

    let outcome = reconcile_record(&store, open_house_def, &open_house).await;
    assert_eq!(outcome, RecordOutcome::Skipped);
    assert_eq!(
        store
            .last_watermark(ResourceKind::OpenHouse)
            .await
            .expect("watermark"),
        None
    );

    reconcile_record(&store, &property_def(), &property("P1", true, 1, &[])).await;
    let outcome = reconcile_record(&store, open_house_def, &open_house).await;
    assert_eq!(outcome, RecordOutcome::Created);
}

#[tokio::test]
async fn test_run_logs_round_trip() {
    let store = setup_store().await;
    let run_id = Uuid::new_v4();

    let mut office = SyncRunReport::start(run_id, "Office", SyncKind::Full);
    office.records_fetched = 3;
    office.record(RecordOutcome::Created);
    office.record(RecordOutcome::Failed(mlsync::sync::RecordError::new(
        Some("O2"),
        "database is locked",
    )));
    let office = office.finish(RunStatus::Success, None);
    store.append_run_log(&office).await.expect("append office");

    let summary =
        SyncRunReport::aggregate(run_id, SyncKind::Full, office.started_at, &[office.clone()]);
    store.append_run_log(&summary).await.expect("append summary");

    let runs = store.recent_runs(10).await.expect("runs");
    assert_eq!(runs.len(), 2);
    assert!(runs.iter().all(|r| r.run_id == run_id));
    assert!(runs.iter().any(|r| r.resource_type == "All"));

    let logged = runs
        .iter()
        .find(|r| r.resource_type == "Office")
        .expect("office log");
    assert_eq!(logged.sync_kind, SyncKind::Full);
    assert_eq!(logged.records_fetched, 3);
    assert_eq!(logged.records_created, 1);
    assert_eq!(logged.records_failed, 1);
    assert_eq!(logged.failures, office.failures);
}

#[tokio::test]
async fn test_concurrent_writes_complete() {
    let store = Arc::new(setup_store().await);
    let def = Arc::new(property_def());

    let mut handles = Vec::new();
    for i in 0..20u32 {
        let store = Arc::clone(&store);
        let def = Arc::clone(&def);
        handles.push(tokio::spawn(async move {
            let record = property(&format!("P{i}"), true, i % 24, &["m"]);
            reconcile_record(store.as_ref(), &def, &record).await
        }));
    }

    let outcomes = tokio::time::timeout(STORE_TIMEOUT, async {
        let mut outcomes = Vec::new();
        for handle in handles {
            outcomes.push(handle.await.expect("task"));
        }
        outcomes
    })
    .await
    .expect("writes should not hang");

    assert!(outcomes.iter().all(|o| *o == RecordOutcome::Created));
    assert_eq!(store.count(ResourceKind::Property).await.expect("count"), 20);
    assert_eq!(
        store
            .last_watermark(ResourceKind::Property)
            .await
            .expect("watermark"),
        Some(ts(19))
    );
}
