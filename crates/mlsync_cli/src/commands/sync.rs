use std::sync::Arc;

use mlsync::db;
use mlsync::entity::resource_kind::ResourceKind;
use mlsync::listing::{ListingClient, short_error_message};
use mlsync::store::{DbStore, SyncStore};
use mlsync::sync::{
    ResourceDefinition, RunStatus, SyncKind, SyncOptions, SyncOrchestrator, SyncRun,
    record_failed_run,
};
use mlsync::RateGovernor;
use tokio_util::sync::CancellationToken;

use crate::commands::dry_run::DryRunStore;
use crate::commands::limits::{OutputFormat, print_json};
use crate::commands::runs::print_reports;
use crate::config::Config;
use crate::progress::ProgressReporter;

/// Exit code when the run stopped on the provider's rate limit (EX_TEMPFAIL).
pub(crate) const EXIT_RATE_LIMITED: i32 = 75;

/// Exit code for any other failed run.
pub(crate) const EXIT_FAILURE: i32 = 1;

/// Options shared by `sync` and `import`.
#[derive(Debug, Clone, clap::Args)]
pub(crate) struct SyncArgs {
    /// Resources to sync (default: office, member, property, openhouse)
    #[arg(short, long, value_delimiter = ',', value_parser = parse_listing_kind)]
    pub resources: Vec<ResourceKind>,

    /// Stop each resource after this many pages (default from config)
    #[arg(short = 'p', long)]
    pub max_pages: Option<u32>,

    /// Dry run - fetch and classify records without writing anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub output: OutputFormat,
}

fn parse_listing_kind(raw: &str) -> Result<ResourceKind, String> {
    let kind: ResourceKind = raw.parse()?;
    if ResourceKind::LISTING.contains(&kind) {
        Ok(kind)
    } else {
        Err(format!(
            "{} is not a listing resource; use `mlsync catalog import`",
            kind
        ))
    }
}

/// Map a run status to the process exit code.
pub(crate) fn exit_code(status: RunStatus) -> i32 {
    match status {
        RunStatus::Success => 0,
        RunStatus::RateLimitExceeded | RunStatus::Paused => EXIT_RATE_LIMITED,
        RunStatus::Error => EXIT_FAILURE,
    }
}

/// Open the store a run writes to.
pub(crate) async fn open_store(
    database_url: &str,
    dry_run: bool,
) -> Result<Arc<dyn SyncStore>, Box<dyn std::error::Error>> {
    let store = DbStore::new(db::connect(database_url).await?);
    if dry_run {
        Ok(Arc::new(DryRunStore::new(store)))
    } else {
        Ok(Arc::new(store))
    }
}

/// Run an incremental sync or a full import of the listing resources.
///
/// Returns the run's exit status; the caller maps it to an exit code.
pub(crate) async fn handle_sync(
    kind: SyncKind,
    args: SyncArgs,
    config: &Config,
    database_url: &str,
    cancel: CancellationToken,
) -> Result<RunStatus, Box<dyn std::error::Error>> {
    let reporter = Arc::new(ProgressReporter::new(args.output.is_json()));
    let callback = reporter.as_callback();

    let store = open_store(database_url, args.dry_run).await?;

    let kinds = if args.resources.is_empty() {
        ResourceKind::LISTING.to_vec()
    } else {
        args.resources
    };

    let governor = RateGovernor::new(config.limits.clone());
    let client = match ListingClient::new(config.listing_client(), governor.clone()) {
        Ok(client) => client.with_progress(Arc::clone(&callback)),
        Err(e) => {
            let run = record_failed_run(
                &*store,
                &kinds,
                kind,
                &short_error_message(&e),
                governor.snapshot(),
            )
            .await;
            reporter.finish();
            print_output(&run, args.output, args.dry_run)?;
            return Ok(run.exit_status());
        }
    };

    let resources = ResourceDefinition::select(&kinds, config.sync.location.clone());

    let orchestrator = SyncOrchestrator::builder()
        .client(Arc::new(client))
        .store(store)
        .resources(resources)
        .options(SyncOptions {
            max_pages: args.max_pages.or(config.sync.max_pages),
        })
        .on_progress(callback)
        .cancel_token(cancel)
        .build()?;

    let run = orchestrator.run(kind).await;
    reporter.finish();

    print_output(&run, args.output, args.dry_run)?;
    Ok(run.exit_status())
}

fn print_output(
    run: &SyncRun,
    output: OutputFormat,
    dry_run: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    match output {
        OutputFormat::Table => print_run(run, dry_run),
        OutputFormat::Json => print_json(run)?,
    }
    Ok(())
}

fn print_run(run: &SyncRun, dry_run: bool) {
    print_reports(run.resources.iter().chain(std::iter::once(&run.summary)));

    if dry_run {
        println!("Dry run: nothing was written.");
    }

    for report in &run.resources {
        for failure in &report.failures {
            println!(
                "  {} {}: {}",
                report.resource_type,
                failure.key.as_deref().unwrap_or("<no key>"),
                failure.message
            );
        }
    }

    if let Some(message) = &run.summary.error_message {
        println!("{}", message);
    }

    let quota = &run.quota;
    println!(
        "Quota: {} requests this hour ({:.1}%), {:.1} MB this hour, {} ({} requests total)",
        quota.requests_last_hour,
        quota.percentages.hour_requests,
        quota.mb_last_hour,
        quota.health,
        quota.total_requests
    );
}
