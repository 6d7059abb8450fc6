use std::sync::Arc;

use mlsync::catalog::{BatchOptions, CatalogClient};
use mlsync::sync::{CatalogImportOptions, RunStatus, import_catalog};
use tokio_util::sync::CancellationToken;

use crate::commands::limits::{OutputFormat, print_json};
use crate::commands::runs::print_reports;
use crate::commands::sync::open_store;
use crate::config::Config;
use crate::progress::ProgressReporter;

#[derive(clap::Subcommand)]
pub(crate) enum CatalogAction {
    /// Import datasets from the statistical catalog
    Import(CatalogImportArgs),
}

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct CatalogImportArgs {
    /// Datasets per batch (default from config or 50)
    #[arg(short, long)]
    pub batch_size: Option<usize>,

    /// Stop after this many datasets
    #[arg(short, long)]
    pub max_datasets: Option<usize>,

    /// Skip this many datasets after filtering
    #[arg(short, long, default_value_t = 0)]
    pub start_index: usize,

    /// Only import these vintages (repeatable)
    #[arg(short, long)]
    pub vintage: Vec<i64>,

    /// Include datasets without a data endpoint
    #[arg(long)]
    pub include_unavailable: bool,

    /// Fetch each dataset's linked metadata documents (overrides config)
    #[arg(long)]
    pub with_metadata: bool,

    /// Dry run - fetch and classify datasets without writing anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub output: OutputFormat,
}

impl CatalogImportArgs {
    fn import_options(&self, config: &Config, cancel: CancellationToken) -> CatalogImportOptions {
        CatalogImportOptions {
            batch: BatchOptions {
                batch_size: self.batch_size.unwrap_or(config.catalog.batch_size).max(1),
                max_datasets: self.max_datasets,
                start_index: self.start_index,
                only_available: !self.include_unavailable,
                vintages: self.vintage.clone(),
                stop: Some(cancel),
            },
            with_metadata: self.with_metadata || config.catalog.metadata,
            metadata_concurrency: config.catalog.concurrency.max(1),
            ..CatalogImportOptions::default()
        }
    }
}

/// Handle catalog subcommands.
pub(crate) async fn handle_catalog(
    action: CatalogAction,
    config: &Config,
    database_url: &str,
    cancel: CancellationToken,
) -> Result<RunStatus, Box<dyn std::error::Error>> {
    match action {
        CatalogAction::Import(args) => {
            let options = args.import_options(config, cancel);
            let reporter = Arc::new(ProgressReporter::new(args.output.is_json()));
            let callback = reporter.as_callback();

            let client = Arc::new(CatalogClient::new(config.catalog_client())?);
            let store = open_store(database_url, args.dry_run).await?;

            let report = import_catalog(client, &*store, &options, Some(&*callback)).await;
            reporter.finish();

            match args.output {
                OutputFormat::Table => {
                    print_reports(std::iter::once(&report));
                    if args.dry_run {
                        println!("Dry run: nothing was written.");
                    }
                    for failure in &report.failures {
                        println!(
                            "  {}: {}",
                            failure.key.as_deref().unwrap_or("<no identifier>"),
                            failure.message
                        );
                    }
                    if let Some(message) = &report.error_message {
                        println!("{}", message);
                    }
                }
                OutputFormat::Json => print_json(&report)?,
            }

            Ok(report.status)
        }
    }
}
