//! Sequential multi-resource sync with a shared emergency stop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::error::SyncError;
use super::progress::{ProgressCallback, SyncProgress, emit};
use super::reconcile::Reconciler;
use super::resource::ResourceDefinition;
use super::types::{RunStatus, SyncKind, SyncOptions, SyncRun, SyncRunReport};
use crate::entity::resource_kind::ResourceKind;
use crate::listing::{ListingClient, PageOptions, StopReason, short_error_message};
use crate::quota::QuotaSnapshot;
use crate::store::SyncStore;

/// Run-scoped stop signal shared by every resource in one run.
///
/// Tripped when the provider's throttle retries run out. When created as a
/// child of an operator token, cancelling that token stops the run through
/// the same check.
#[derive(Debug, Clone, Default)]
pub struct EmergencyStop {
    token: CancellationToken,
    rate_limited: Arc<AtomicBool>,
}

impl EmergencyStop {
    pub fn new() -> Self {
        Self::default()
    }

    /// A stop that also fires when `parent` is cancelled. Triggering it
    /// never cancels `parent`.
    pub fn child_of(parent: &CancellationToken) -> Self {
        Self {
            token: parent.child_token(),
            rate_limited: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Stop because the provider's rate limit was exhausted.
    pub fn trigger(&self) {
        self.rate_limited.store(true, Ordering::SeqCst);
        self.token.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Whether the stop came from [`trigger`](Self::trigger) rather than
    /// the operator.
    pub fn is_rate_limited(&self) -> bool {
        self.rate_limited.load(Ordering::SeqCst)
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

/// Syncs resources one after another through a [`ListingClient`] into a
/// [`SyncStore`].
pub struct SyncOrchestrator {
    client: Arc<ListingClient>,
    store: Arc<dyn SyncStore>,
    resources: Vec<ResourceDefinition>,
    options: SyncOptions,
    on_progress: Option<Arc<ProgressCallback>>,
    cancel: Option<CancellationToken>,
}

#[derive(Default)]
pub struct SyncOrchestratorBuilder {
    client: Option<Arc<ListingClient>>,
    store: Option<Arc<dyn SyncStore>>,
    resources: Option<Vec<ResourceDefinition>>,
    options: SyncOptions,
    on_progress: Option<Arc<ProgressCallback>>,
    cancel: Option<CancellationToken>,
}

impl SyncOrchestratorBuilder {
    #[must_use]
    pub fn client(mut self, client: Arc<ListingClient>) -> Self {
        self.client = Some(client);
        self
    }

    #[must_use]
    pub fn store(mut self, store: Arc<dyn SyncStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Resources in sync order. Defaults to
    /// [`ResourceDefinition::standard_set`] without a location filter.
    #[must_use]
    pub fn resources(mut self, resources: Vec<ResourceDefinition>) -> Self {
        self.resources = Some(resources);
        self
    }

    #[must_use]
    pub fn options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn on_progress(mut self, callback: Arc<ProgressCallback>) -> Self {
        self.on_progress = Some(callback);
        self
    }

    /// Operator token; cancelling it stops the run before the next page.
    #[must_use]
    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn build(self) -> Result<SyncOrchestrator, SyncError> {
        let client = self.client.ok_or(SyncError::MissingClient)?;
        let store = self.store.ok_or(SyncError::MissingStore)?;
        let resources = self
            .resources
            .unwrap_or_else(|| ResourceDefinition::standard_set(None));
        if resources.is_empty() {
            return Err(SyncError::NoResources);
        }

        Ok(SyncOrchestrator {
            client,
            store,
            resources,
            options: self.options,
            on_progress: self.on_progress,
            cancel: self.cancel,
        })
    }
}

impl SyncOrchestrator {
    pub fn builder() -> SyncOrchestratorBuilder {
        SyncOrchestratorBuilder::default()
    }

    pub fn resources(&self) -> &[ResourceDefinition] {
        &self.resources
    }

    /// Sync every resource in order and persist one report per resource
    /// plus the run summary.
    ///
    /// Never fails: errors are recorded in the reports. A failed log write
    /// is logged and otherwise ignored.
    pub async fn run(&self, kind: SyncKind) -> SyncRun {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let stop = match &self.cancel {
            Some(parent) => EmergencyStop::child_of(parent),
            None => EmergencyStop::new(),
        };
        let on_progress = self.on_progress.as_deref();

        tracing::info!(
            %run_id,
            sync_kind = %kind,
            resources = self.resources.len(),
            "Starting sync run"
        );
        emit(
            on_progress,
            SyncProgress::RunStarted {
                run_id,
                sync_kind: kind,
                resources: self.resources.len(),
            },
        );

        let mut reports = Vec::with_capacity(self.resources.len());
        for definition in &self.resources {
            let report = self.sync_resource(run_id, kind, definition, &stop).await;
            emit(
                on_progress,
                SyncProgress::ResourceFinished {
                    resource: definition.kind,
                    status: report.status,
                    processed: report.records_processed,
                    created: report.records_created,
                    updated: report.records_updated,
                    deleted: report.records_deleted,
                    failed: report.records_failed,
                },
            );
            self.persist(&report).await;
            reports.push(report);
        }

        let summary = SyncRunReport::aggregate(run_id, kind, started_at, &reports);
        self.persist(&summary).await;

        tracing::info!(
            %run_id,
            status = %summary.status,
            processed = summary.records_processed,
            created = summary.records_created,
            updated = summary.records_updated,
            deleted = summary.records_deleted,
            failed = summary.records_failed,
            duration_seconds = summary.duration_seconds,
            "Sync run finished"
        );
        emit(
            on_progress,
            SyncProgress::RunFinished {
                run_id,
                status: summary.status,
                processed: summary.records_processed,
                duration_seconds: summary.duration_seconds,
            },
        );

        SyncRun {
            resources: reports,
            summary,
            quota: self.client.governor().snapshot(),
        }
    }

    async fn sync_resource(
        &self,
        run_id: Uuid,
        sync_kind: SyncKind,
        definition: &ResourceDefinition,
        stop: &EmergencyStop,
    ) -> SyncRunReport {
        let kind = definition.kind;
        let on_progress = self.on_progress.as_deref();
        let report = SyncRunReport::start(run_id, kind.as_str(), sync_kind);

        if stop.is_stopped() {
            let reason = if stop.is_rate_limited() {
                "rate limit exhausted earlier in this run"
            } else {
                "sync was cancelled"
            };
            tracing::info!(resource = %kind, reason, "Skipping resource");
            emit(
                on_progress,
                SyncProgress::ResourceSkipped {
                    resource: kind,
                    reason: reason.to_string(),
                },
            );
            return report.finish(RunStatus::Paused, Some(format!("Skipped: {reason}")));
        }

        let watermark = match sync_kind {
            SyncKind::Full => None,
            SyncKind::Incremental => match self.store.last_watermark(kind).await {
                Ok(watermark) => watermark,
                Err(e) => {
                    tracing::error!(resource = %kind, error = %e, "Failed to read watermark");
                    return report.finish(
                        RunStatus::Error,
                        Some(format!("Failed to read watermark: {e}")),
                    );
                }
            },
        };

        let url = match self
            .client
            .url_for(&definition.query(&self.client, watermark))
        {
            Ok(url) => url,
            Err(e) => return report.finish(RunStatus::Error, Some(e.to_string())),
        };

        match watermark {
            Some(since) => tracing::info!(resource = %kind, %since, "Fetching records modified since watermark"),
            None => tracing::info!(resource = %kind, "Fetching all visible records"),
        }
        emit(
            on_progress,
            SyncProgress::ResourceStarted {
                resource: kind,
                since: watermark,
            },
        );

        let options = PageOptions {
            max_pages: self.options.max_pages,
            filter: definition.filter.clone(),
            stop: Some(stop.token()),
        };
        let mut reconciler = Reconciler::new(self.store.as_ref(), definition, report, on_progress);
        let result = self
            .client
            .for_each_page(url, &options, &mut reconciler)
            .await;
        let report = reconciler.into_report();

        let report = match result {
            Ok(stats) if stats.stop == StopReason::Cancelled => {
                tracing::warn!(resource = %kind, pages = stats.pages, "Resource sync stopped early");
                report.finish(
                    RunStatus::Paused,
                    Some("Stopped before all pages were fetched".to_string()),
                )
            }
            Ok(_) => report.finish(RunStatus::Success, None),
            Err(e) if e.is_rate_limit_exhausted() => {
                stop.trigger();
                tracing::error!(
                    resource = %kind,
                    error = %e,
                    "Rate limit exhausted, stopping remaining resources"
                );
                emit(
                    on_progress,
                    SyncProgress::EmergencyStop {
                        resource: kind,
                        message: e.to_string(),
                    },
                );
                report.finish(RunStatus::RateLimitExceeded, Some(e.to_string()))
            }
            Err(e) => {
                tracing::error!(resource = %kind, error = %e, "Resource sync failed");
                report.finish(RunStatus::Error, Some(short_error_message(&e)))
            }
        };

        tracing::info!(
            resource = %kind,
            status = %report.status,
            fetched = report.records_fetched,
            created = report.records_created,
            updated = report.records_updated,
            deleted = report.records_deleted,
            skipped = report.records_skipped,
            failed = report.records_failed,
            duration_seconds = report.duration_seconds,
            "Resource sync finished"
        );
        report
    }

    async fn persist(&self, report: &SyncRunReport) {
        if let Err(e) = self.store.append_run_log(report).await {
            tracing::error!(
                resource = %report.resource_type,
                error = %e,
                "Failed to write sync log"
            );
        }
    }
}

/// Append the reports of a run that failed before any fetch and return it.
///
/// Log write failures are logged and otherwise ignored, as in a normal run.
pub async fn record_failed_run(
    store: &dyn SyncStore,
    kinds: &[ResourceKind],
    sync_kind: SyncKind,
    message: &str,
    quota: QuotaSnapshot,
) -> SyncRun {
    tracing::error!(sync_kind = %sync_kind, error = message, "Sync run could not start");
    let run = SyncRun::failed(kinds, sync_kind, message, quota);
    for report in run.resources.iter().chain(std::iter::once(&run.summary)) {
        if let Err(e) = store.append_run_log(report).await {
            tracing::error!(
                resource = %report.resource_type,
                error = %e,
                "Failed to write sync log"
            );
        }
    }
    run
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::TimeZone;
    use serde_json::json;

    use super::*;
    use crate::http::MockTransport;
    use crate::listing::{ListingClientConfig, ODataQuery};
    use crate::quota::{LimitConfig, RateGovernor};
    use crate::store::MemoryStore;

    const BASE: &str = "https://api.example.com/v2";

    fn client(transport: &MockTransport) -> Arc<ListingClient> {
        let governor = RateGovernor::new(LimitConfig {
            max_req_per_second: 1_000,
            min_delay_between_requests_ms: 0,
            ..LimitConfig::default()
        });
        Arc::new(
            ListingClient::new_with_transport(
                ListingClientConfig::new(BASE, "secret"),
                governor,
                Arc::new(transport.clone()),
            )
            .expect("client"),
        )
    }

    /// First-page URL the orchestrator builds for `kind`.
    fn first_url(
        client: &ListingClient,
        kind: ResourceKind,
        watermark: Option<chrono::DateTime<Utc>>,
    ) -> String {
        let query: ODataQuery = ResourceDefinition::new(kind).query(client, watermark);
        client.url_for(&query).expect("url")
    }

    fn office(key: &str, visible: bool) -> serde_json::Value {
        json!({
            "OfficeKey": key,
            "MlgCanView": visible,
            "ModificationTimestamp": "2025-03-01T10:00:00Z"
        })
    }

    fn orchestrator(
        client: Arc<ListingClient>,
        store: Arc<MemoryStore>,
        kinds: &[ResourceKind],
    ) -> SyncOrchestrator {
        SyncOrchestrator::builder()
            .client(client)
            .store(store)
            .resources(ResourceDefinition::select(kinds, None))
            .build()
            .expect("orchestrator")
    }

    #[test]
    fn builder_requires_client_store_and_resources() {
        let transport = MockTransport::new();
        let store: Arc<dyn SyncStore> = Arc::new(MemoryStore::new());

        let err = SyncOrchestrator::builder()
            .store(Arc::clone(&store))
            .build()
            .err()
            .expect("no client");
        assert!(matches!(err, SyncError::MissingClient));

        let err = SyncOrchestrator::builder()
            .client(client(&transport))
            .build()
            .err()
            .expect("no store");
        assert!(matches!(err, SyncError::MissingStore));

        let err = SyncOrchestrator::builder()
            .client(client(&transport))
            .store(Arc::clone(&store))
            .resources(Vec::new())
            .build()
            .err()
            .expect("no resources");
        assert!(matches!(err, SyncError::NoResources));

        let built = SyncOrchestrator::builder()
            .client(client(&transport))
            .store(store)
            .build()
            .expect("defaults");
        let kinds: Vec<ResourceKind> = built.resources().iter().map(|d| d.kind).collect();
        assert_eq!(kinds, ResourceKind::LISTING.to_vec());
    }

    #[tokio::test]
    async fn first_run_syncs_visible_records_and_persists_reports() {
        let transport = MockTransport::new();
        let client = client(&transport);
        transport.push_json(
            first_url(&client, ResourceKind::Office, None),
            200,
            &json!({"value": [office("o1", true), office("o2", true), office("o3", false)]}),
        );
        transport.push_json(
            first_url(&client, ResourceKind::Member, None),
            200,
            &json!({"value": [{
                "MemberKey": "m1",
                "MlgCanView": true,
                "ModificationTimestamp": "2025-03-01T11:00:00Z"
            }]}),
        );

        let store = Arc::new(MemoryStore::new());
        let orchestrator = orchestrator(
            client,
            Arc::clone(&store),
            &[ResourceKind::Office, ResourceKind::Member],
        );
        let run = orchestrator.run(SyncKind::Incremental).await;

        assert_eq!(run.exit_status(), RunStatus::Success);
        let offices = run.report_for(ResourceKind::Office).expect("office report");
        assert_eq!(offices.records_fetched, 3);
        assert_eq!(offices.records_processed, 3);
        assert_eq!(offices.records_created, 2);
        assert_eq!(run.summary.records_created, 3);
        assert_eq!(run.summary.resource_type, "All");
        assert_eq!(run.quota.requests_last_hour, 2);

        assert_eq!(store.count(ResourceKind::Office), 2);
        assert_eq!(store.count(ResourceKind::Member), 1);
        assert_eq!(
            store.last_watermark(ResourceKind::Office).await.expect("watermark"),
            Some(Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap())
        );

        let runs = store.runs();
        assert_eq!(runs.len(), 3);
        assert!(runs.iter().all(|r| r.run_id == run.summary.run_id));
        assert_eq!(runs[2].resource_type, "All");
    }

    #[tokio::test]
    async fn incremental_run_queries_from_watermark_and_full_run_ignores_it() {
        let transport = MockTransport::new();
        let client = client(&transport);
        let watermark = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();
        transport.push_json(
            first_url(&client, ResourceKind::Office, Some(watermark)),
            200,
            &json!({"value": []}),
        );
        transport.push_json(
            first_url(&client, ResourceKind::Office, None),
            200,
            &json!({"value": []}),
        );

        let store = Arc::new(MemoryStore::new());
        store.set_watermark(ResourceKind::Office, watermark);
        let orchestrator = orchestrator(client, Arc::clone(&store), &[ResourceKind::Office]);

        let incremental = orchestrator.run(SyncKind::Incremental).await;
        let full = orchestrator.run(SyncKind::Full).await;

        assert_eq!(incremental.exit_status(), RunStatus::Success);
        assert_eq!(full.exit_status(), RunStatus::Success);
        let urls = transport.request_urls();
        assert!(urls[0].contains("ModificationTimestamp+gt+2025-02-01T00%3A00%3A00.000Z"));
        assert!(urls[1].contains("MlgCanView+eq+true"));
        assert_ne!(incremental.summary.run_id, full.summary.run_id);
    }

    #[tokio::test]
    async fn api_error_marks_resource_failed_and_continues() {
        let transport = MockTransport::new();
        let client = client(&transport);
        transport.push_json(
            first_url(&client, ResourceKind::Office, None),
            500,
            &json!({"error": {"message": "internal"}}),
        );
        transport.push_json(
            first_url(&client, ResourceKind::Member, None),
            200,
            &json!({"value": []}),
        );

        let store = Arc::new(MemoryStore::new());
        let run = orchestrator(
            client,
            Arc::clone(&store),
            &[ResourceKind::Office, ResourceKind::Member],
        )
        .run(SyncKind::Incremental)
        .await;

        let offices = run.report_for(ResourceKind::Office).expect("office");
        assert_eq!(offices.status, RunStatus::Error);
        assert!(
            offices
                .error_message
                .as_deref()
                .is_some_and(|m| m.contains("internal"))
        );
        assert_eq!(
            run.report_for(ResourceKind::Member).expect("member").status,
            RunStatus::Success
        );
        assert_eq!(run.exit_status(), RunStatus::Error);
        assert!(
            run.summary
                .error_message
                .as_deref()
                .is_some_and(|m| m.starts_with("Office: "))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_rate_limit_stops_remaining_resources() {
        let transport = MockTransport::new();
        let client = client(&transport);
        let office_url = first_url(&client, ResourceKind::Office, None);
        for _ in 0..6 {
            transport.push_json(
                office_url.clone(),
                429,
                &json!({"error": {"message": "Too many requests"}}),
            );
        }

        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let callback: Arc<ProgressCallback> = Arc::new(Box::new(move |event: SyncProgress| {
            sink.lock().unwrap_or_else(|e| e.into_inner()).push(event);
        }));

        let store = Arc::new(MemoryStore::new());
        let orchestrator = SyncOrchestrator::builder()
            .client(client)
            .store(Arc::clone(&store) as Arc<dyn SyncStore>)
            .resources(ResourceDefinition::select(
                &[ResourceKind::Office, ResourceKind::Member],
                None,
            ))
            .on_progress(callback)
            .build()
            .expect("orchestrator");
        let run = orchestrator.run(SyncKind::Incremental).await;

        assert_eq!(
            run.report_for(ResourceKind::Office).expect("office").status,
            RunStatus::RateLimitExceeded
        );
        let members = run.report_for(ResourceKind::Member).expect("member");
        assert_eq!(members.status, RunStatus::Paused);
        assert_eq!(members.records_fetched, 0);
        assert_eq!(run.exit_status(), RunStatus::RateLimitExceeded);
        assert!(
            run.summary
                .error_message
                .as_deref()
                .is_some_and(|m| m.contains("65 minutes"))
        );
        // Member's collection was never requested.
        assert_eq!(transport.requests().len(), 6);

        let events = events.lock().unwrap_or_else(|e| e.into_inner());
        assert!(events.iter().any(|e| matches!(
            e,
            SyncProgress::EmergencyStop { resource: ResourceKind::Office, .. }
        )));
        assert!(events.iter().any(|e| matches!(
            e,
            SyncProgress::ResourceSkipped { resource: ResourceKind::Member, .. }
        )));
    }

    #[tokio::test(start_paused = true)]
    async fn throttle_on_later_page_keeps_committed_records() {
        let transport = MockTransport::new();
        let client = client(&transport);
        let office_url = first_url(&client, ResourceKind::Office, None);
        let page_two = format!("{BASE}/Office?page=2");
        transport.push_json(
            office_url,
            200,
            &json!({"value": [office("o1", true)], "@odata.nextLink": page_two}),
        );
        for _ in 0..6 {
            transport.push_json(
                page_two.clone(),
                429,
                &json!({"error": {"message": "Too many requests"}}),
            );
        }

        let store = Arc::new(MemoryStore::new());
        let run = orchestrator(
            client,
            Arc::clone(&store),
            &[ResourceKind::Office, ResourceKind::Member],
        )
        .run(SyncKind::Incremental)
        .await;

        let offices = run.report_for(ResourceKind::Office).expect("office");
        assert_eq!(offices.status, RunStatus::RateLimitExceeded);
        assert_eq!(offices.records_created, 1);
        assert!(store.get(ResourceKind::Office, "o1").is_some());
        assert_eq!(
            store
                .last_watermark(ResourceKind::Office)
                .await
                .expect("watermark"),
            Some(Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap())
        );

        let members = run.report_for(ResourceKind::Member).expect("member");
        assert_eq!(members.status, RunStatus::Paused);
        assert_eq!(transport.requests().len(), 7);
        assert!(
            transport
                .request_urls()
                .iter()
                .all(|url| url.contains("/Office"))
        );
    }

    #[tokio::test]
    async fn failed_start_reports_every_resource_as_error() {
        let store = MemoryStore::new();
        let quota = RateGovernor::new(LimitConfig::default()).snapshot();

        let run = record_failed_run(
            &store,
            &[ResourceKind::Office, ResourceKind::Property],
            SyncKind::Incremental,
            "Invalid configuration: listing API token is not set",
            quota,
        )
        .await;

        assert_eq!(run.exit_status(), RunStatus::Error);
        assert_eq!(run.resources.len(), 2);
        for report in &run.resources {
            assert_eq!(report.status, RunStatus::Error);
            assert_eq!(report.records_processed, 0);
            assert!(
                report
                    .error_message
                    .as_deref()
                    .is_some_and(|m| m.contains("token is not set"))
            );
        }
        assert!(
            run.summary
                .error_message
                .as_deref()
                .is_some_and(|m| m.starts_with("Office: "))
        );

        let runs = store.runs();
        assert_eq!(runs.len(), 3);
        assert!(runs.iter().all(|r| r.run_id == run.summary.run_id));
    }

    #[tokio::test]
    async fn operator_cancellation_pauses_every_resource() {
        let transport = MockTransport::new();
        let token = CancellationToken::new();
        token.cancel();

        let store = Arc::new(MemoryStore::new());
        let run = SyncOrchestrator::builder()
            .client(client(&transport))
            .store(Arc::clone(&store) as Arc<dyn SyncStore>)
            .cancel_token(token.clone())
            .build()
            .expect("orchestrator")
            .run(SyncKind::Incremental)
            .await;

        assert!(transport.requests().is_empty());
        assert!(run.resources.iter().all(|r| r.status == RunStatus::Paused));
        assert_eq!(run.exit_status(), RunStatus::RateLimitExceeded);
        assert_eq!(store.runs().len(), 5);
    }

    #[test]
    fn triggering_a_child_stop_leaves_the_parent_running() {
        let parent = CancellationToken::new();
        let stop = EmergencyStop::child_of(&parent);
        stop.trigger();
        assert!(stop.is_stopped());
        assert!(stop.is_rate_limited());
        assert!(!parent.is_cancelled());

        let other = EmergencyStop::child_of(&parent);
        parent.cancel();
        assert!(other.is_stopped());
        assert!(!other.is_rate_limited());
    }

    #[tokio::test]
    async fn max_pages_limits_each_resource() {
        let transport = MockTransport::new();
        let client = client(&transport);
        let first = first_url(&client, ResourceKind::Office, None);
        transport.push_json(
            first,
            200,
            &json!({
                "value": [office("o1", true)],
                "@odata.nextLink": format!("{BASE}/Office?page=2")
            }),
        );

        let store = Arc::new(MemoryStore::new());
        let run = SyncOrchestrator::builder()
            .client(client)
            .store(Arc::clone(&store) as Arc<dyn SyncStore>)
            .resources(ResourceDefinition::select(&[ResourceKind::Office], None))
            .options(SyncOptions { max_pages: Some(1) })
            .build()
            .expect("orchestrator")
            .run(SyncKind::Incremental)
            .await;

        assert_eq!(run.exit_status(), RunStatus::Success);
        assert_eq!(transport.requests().len(), 1);
        assert_eq!(store.count(ResourceKind::Office), 1);
    }
}
