//! Sync run types: kinds, statuses, per-record outcomes and run reports.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::entity::resource_kind::ResourceKind;
use crate::quota::QuotaSnapshot;

/// Failure messages kept per report.
pub const MAX_SAMPLED_FAILURES: usize = 20;

/// Resource name of the run-level report.
pub const AGGREGATE_RESOURCE: &str = "All";

/// How long an operator should wait after the provider's throttle was
/// exhausted: one provider hour window plus buffer.
pub const RATE_LIMIT_COOLDOWN_MINUTES: u64 = 65;

/// Full import or watermark-driven incremental sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncKind {
    /// Ignore stored watermarks; fetch everything visible.
    Full,
    #[default]
    Incremental,
}

impl SyncKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SyncKind::Full => "full",
            SyncKind::Incremental => "incremental",
        }
    }
}

impl fmt::Display for SyncKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(SyncKind::Full),
            "incremental" => Ok(SyncKind::Incremental),
            other => Err(format!("unknown sync kind: {other}")),
        }
    }
}

/// Outcome of a resource run or of a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    /// Stopped before completion; safe to resume.
    Paused,
    /// Throttle retries were exhausted.
    RateLimitExceeded,
    Error,
}

impl RunStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Success => "success",
            RunStatus::Paused => "paused",
            RunStatus::RateLimitExceeded => "rate_limit_exceeded",
            RunStatus::Error => "error",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(RunStatus::Success),
            "paused" => Ok(RunStatus::Paused),
            "rate_limit_exceeded" => Ok(RunStatus::RateLimitExceeded),
            "error" => Ok(RunStatus::Error),
            other => Err(format!("unknown run status: {other}")),
        }
    }
}

/// Why a single record could not be reconciled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{}: {message}", key.as_deref().unwrap_or("<no key>"))]
pub struct RecordError {
    /// Natural key, when the record had one.
    pub key: Option<String>,
    pub message: String,
}

impl RecordError {
    pub fn new(key: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            key: key.map(str::to_string),
            message: message.into(),
        }
    }
}

/// What reconciliation did with one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Created,
    Updated,
    Deleted,
    /// Not visible and never stored.
    Ignored,
    /// Not reconciled, e.g. its parent record is missing.
    Skipped,
    Failed(RecordError),
}

/// Options shared by every resource in a run.
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Stop each resource after this many pages.
    pub max_pages: Option<u32>,
}

/// Report for one resource run, or for a whole run (`resource_type == "All"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncRunReport {
    /// Shared by every report of one orchestrator run.
    pub run_id: Uuid,
    pub resource_type: String,
    pub sync_kind: SyncKind,
    pub status: RunStatus,
    /// Records received from the provider, including filtered ones.
    pub records_fetched: u64,
    /// Records handed to reconciliation.
    pub records_processed: u64,
    pub records_created: u64,
    pub records_updated: u64,
    pub records_deleted: u64,
    pub records_skipped: u64,
    pub records_failed: u64,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_seconds: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Up to [`MAX_SAMPLED_FAILURES`] record failures.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<RecordError>,
}

impl SyncRunReport {
    /// Begin a report now, with zero counts and `Success` status.
    pub fn start(run_id: Uuid, resource_type: impl Into<String>, sync_kind: SyncKind) -> Self {
        let now = Utc::now();
        Self {
            run_id,
            resource_type: resource_type.into(),
            sync_kind,
            status: RunStatus::Success,
            records_fetched: 0,
            records_processed: 0,
            records_created: 0,
            records_updated: 0,
            records_deleted: 0,
            records_skipped: 0,
            records_failed: 0,
            started_at: now,
            completed_at: now,
            duration_seconds: 0.0,
            error_message: None,
            failures: Vec::new(),
        }
    }

    /// Count one reconciled record.
    pub fn record(&mut self, outcome: RecordOutcome) {
        self.records_processed += 1;
        match outcome {
            RecordOutcome::Created => self.records_created += 1,
            RecordOutcome::Updated => self.records_updated += 1,
            RecordOutcome::Deleted => self.records_deleted += 1,
            RecordOutcome::Ignored => {}
            RecordOutcome::Skipped => self.records_skipped += 1,
            RecordOutcome::Failed(error) => {
                self.records_failed += 1;
                if self.failures.len() < MAX_SAMPLED_FAILURES {
                    self.failures.push(error);
                }
            }
        }
    }

    /// Stamp completion time and final status.
    #[must_use]
    pub fn finish(mut self, status: RunStatus, error_message: Option<String>) -> Self {
        self.completed_at = Utc::now();
        self.duration_seconds =
            (self.completed_at - self.started_at).num_milliseconds().max(0) as f64 / 1_000.0;
        self.status = status;
        self.error_message = error_message;
        self
    }

    /// Build the run-level report from per-resource reports.
    ///
    /// Any paused or rate-limited resource makes the run
    /// `rate_limit_exceeded`; otherwise any error makes it `error`.
    #[must_use]
    pub fn aggregate(
        run_id: Uuid,
        sync_kind: SyncKind,
        started_at: DateTime<Utc>,
        reports: &[SyncRunReport],
    ) -> Self {
        let mut summary = Self::start(run_id, AGGREGATE_RESOURCE, sync_kind);
        summary.started_at = started_at;

        for report in reports {
            summary.records_fetched += report.records_fetched;
            summary.records_processed += report.records_processed;
            summary.records_created += report.records_created;
            summary.records_updated += report.records_updated;
            summary.records_deleted += report.records_deleted;
            summary.records_skipped += report.records_skipped;
            summary.records_failed += report.records_failed;
            let room = MAX_SAMPLED_FAILURES.saturating_sub(summary.failures.len());
            summary
                .failures
                .extend(report.failures.iter().take(room).cloned());
        }

        let has = |status: RunStatus| reports.iter().any(|r| r.status == status);
        let (status, message) = if has(RunStatus::RateLimitExceeded) {
            (
                RunStatus::RateLimitExceeded,
                Some(format!(
                    "Rate limit exceeded. Wait {} minutes before retrying; progress is saved.",
                    RATE_LIMIT_COOLDOWN_MINUTES
                )),
            )
        } else if has(RunStatus::Paused) {
            (
                RunStatus::RateLimitExceeded,
                Some("Sync stopped before completion; progress is saved.".to_string()),
            )
        } else if has(RunStatus::Error) {
            let errors: Vec<String> = reports
                .iter()
                .filter(|r| r.status == RunStatus::Error)
                .map(|r| {
                    format!(
                        "{}: {}",
                        r.resource_type,
                        r.error_message.as_deref().unwrap_or("unknown error")
                    )
                })
                .collect();
            (RunStatus::Error, Some(errors.join("; ")))
        } else {
            (RunStatus::Success, None)
        };

        summary.finish(status, message)
    }
}

/// Everything a run produced.
#[derive(Debug, Clone, Serialize)]
pub struct SyncRun {
    /// One report per resource, in sync order.
    pub resources: Vec<SyncRunReport>,
    pub summary: SyncRunReport,
    /// Governor usage at the end of the run.
    pub quota: QuotaSnapshot,
}

impl SyncRun {
    /// A run that could not start, e.g. because the client configuration is
    /// invalid: every resource in `kinds` reports `error` with no records.
    #[must_use]
    pub fn failed(
        kinds: &[ResourceKind],
        sync_kind: SyncKind,
        message: &str,
        quota: QuotaSnapshot,
    ) -> Self {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let resources: Vec<SyncRunReport> = kinds
            .iter()
            .map(|kind| {
                SyncRunReport::start(run_id, kind.as_str(), sync_kind)
                    .finish(RunStatus::Error, Some(message.to_string()))
            })
            .collect();
        let summary = if resources.is_empty() {
            SyncRunReport::start(run_id, AGGREGATE_RESOURCE, sync_kind)
                .finish(RunStatus::Error, Some(message.to_string()))
        } else {
            SyncRunReport::aggregate(run_id, sync_kind, started_at, &resources)
        };
        Self {
            resources,
            summary,
            quota,
        }
    }

    #[must_use]
    pub fn exit_status(&self) -> RunStatus {
        self.summary.status
    }

    /// Report for `kind`, if it was part of the run.
    #[must_use]
    pub fn report_for(&self, kind: ResourceKind) -> Option<&SyncRunReport> {
        self.resources
            .iter()
            .find(|r| r.resource_type == kind.as_str())
    }
}
