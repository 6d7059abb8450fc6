use mlsync::db;
use mlsync::store::DbStore;
use mlsync::sync::SyncRunReport;
use serde::Serialize;

use crate::commands::limits::{OutputFormat, print_json};

/// One run report as a table row.
#[derive(Debug, Clone, Serialize, tabled::Tabled)]
pub(crate) struct ReportDisplay {
    #[tabled(rename = "Started")]
    pub started: String,
    #[tabled(rename = "Resource")]
    pub resource: String,
    #[tabled(rename = "Kind")]
    pub kind: String,
    #[tabled(rename = "Status")]
    pub status: String,
    #[tabled(rename = "Fetched")]
    pub fetched: u64,
    #[tabled(rename = "Created")]
    pub created: u64,
    #[tabled(rename = "Updated")]
    pub updated: u64,
    #[tabled(rename = "Deleted")]
    pub deleted: u64,
    #[tabled(rename = "Skipped")]
    pub skipped: u64,
    #[tabled(rename = "Failed")]
    pub failed: u64,
    #[tabled(rename = "Duration")]
    pub duration: String,
}

impl From<&SyncRunReport> for ReportDisplay {
    fn from(report: &SyncRunReport) -> Self {
        Self {
            started: report.started_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            resource: report.resource_type.clone(),
            kind: report.sync_kind.to_string(),
            status: report.status.to_string(),
            fetched: report.records_fetched,
            created: report.records_created,
            updated: report.records_updated,
            deleted: report.records_deleted,
            skipped: report.records_skipped,
            failed: report.records_failed,
            duration: format!("{:.1}s", report.duration_seconds),
        }
    }
}

/// Print reports as a rounded table.
pub(crate) fn print_reports<'a>(reports: impl IntoIterator<Item = &'a SyncRunReport>) {
    let rows: Vec<ReportDisplay> = reports.into_iter().map(ReportDisplay::from).collect();
    let mut table = tabled::Table::new(rows);
    table.with(tabled::settings::Style::rounded());
    println!("{}", table);
}

/// Handle the runs command.
pub(crate) async fn handle_runs(
    limit: u64,
    output: OutputFormat,
    database_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = DbStore::new(db::connect(database_url).await?);
    let runs = store.recent_runs(limit).await?;

    match output {
        OutputFormat::Table if runs.is_empty() => println!("No sync runs recorded yet."),
        OutputFormat::Table => {
            print_reports(&runs);
            for run in runs.iter().filter(|r| r.error_message.is_some()) {
                if let Some(message) = &run.error_message {
                    println!("{} {}: {}", run.run_id, run.resource_type, message);
                }
            }
        }
        OutputFormat::Json => print_json(&runs)?,
    }

    Ok(())
}
