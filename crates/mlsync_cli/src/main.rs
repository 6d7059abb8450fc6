//! mlsync CLI - quota-governed listing and catalog sync.

mod commands;
mod config;
mod progress;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use console::Term;
use mlsync::sync::{RunStatus, SyncKind};
use tracing_subscriber::EnvFilter;

use crate::commands::catalog::CatalogAction;
use crate::commands::limits::OutputFormat;
use crate::commands::migrate::MigrateAction;
use crate::commands::sync::SyncArgs;

#[derive(Parser)]
#[command(name = "mlsync")]
#[command(version)]
#[command(about = "Quota-governed listing and catalog sync")]
#[command(
    long_about = "mlsync mirrors a listing provider's offices, members, properties and open \
houses into a local database without breaching the provider's request and bandwidth \
limits. It can also import the statistical dataset catalog into the same store."
)]
#[command(after_long_help = r#"EXAMPLES
    Sync everything modified since the last run:
        $ mlsync sync

    Re-import properties and open houses from scratch:
        $ mlsync import --resources property,openhouse

    See what a sync would change without writing:
        $ mlsync sync --dry-run --max-pages 2

    Import 2020 datasets from the catalog with their metadata:
        $ mlsync catalog import --vintage 2020 --with-metadata

    Show recent runs:
        $ mlsync runs --limit 10

CONFIGURATION
    mlsync reads configuration from:
      1. ~/.config/mlsync/config.toml (or $XDG_CONFIG_HOME/mlsync/config.toml)
      2. ./mlsync.toml
      3. Environment variables (MLSYNC_* prefix, e.g., MLSYNC_PROVIDER_TOKEN)
      4. .env file in current directory

ENVIRONMENT VARIABLES
    MLSYNC_DATABASE_URL     Database connection string (default: ~/.local/state/mlsync/mlsync.db)
    MLSYNC_PROVIDER_URL     Listing provider API root
    MLSYNC_PROVIDER_TOKEN   Listing provider bearer token
    MLSYNC_CATALOG_URL      Statistical catalog URL

EXIT STATUS
    0   every resource synced
    1   a resource failed
    75  stopped on the provider's rate limit, or interrupted; safe to resume
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch records modified since each resource's watermark
    Sync(SyncArgs),
    /// Fetch every visible record, ignoring watermarks
    Import(SyncArgs),
    /// Statistical catalog operations
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
    /// Compare the configured request budget with the provider's thresholds
    Limits {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Show recent sync runs
    Runs {
        /// Number of run reports to show
        #[arg(short, long, default_value_t = 20)]
        limit: u64,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
    /// Generate man page(s)
    Man {
        /// Output directory for man pages (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Log to stderr. On a terminal only warnings show by default so spinners
/// stay readable.
fn init_tracing() {
    let default_filter = if Term::stderr().is_term() {
        "mlsync=warn,mlsync_cli=warn"
    } else {
        "mlsync=info,mlsync_cli=info"
    };
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new(default_filter),
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Create the parent directory of a SQLite database file.
fn ensure_sqlite_dir(database_url: &str) -> std::io::Result<()> {
    let Some(db_path) = database_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    // Strip query parameters (e.g., ?mode=rwc) before path operations
    let db_path = db_path.split('?').next().unwrap_or(db_path);
    let db_path = std::path::Path::new(db_path);

    if db_path.is_relative() && !db_path.as_os_str().is_empty() {
        tracing::warn!(
            "Database path '{}' is relative - behavior depends on current directory. \
             Consider using an absolute path.",
            db_path.display()
        );
    }

    if let Some(parent) = db_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    // Commands that need neither configuration nor a database
    match &cli.command {
        Commands::Completions { shell } => return commands::meta::handle_completions(*shell),
        Commands::Man { output } => return commands::meta::handle_man(output.clone()),
        _ => {}
    }

    let config = config::Config::load();

    if let Commands::Limits { output } = &cli.command {
        return commands::limits::handle_limits(*output, &config);
    }

    let database_url = config
        .database_url()
        .ok_or("Could not determine a state directory; set MLSYNC_DATABASE_URL")?;
    ensure_sqlite_dir(&database_url)?;

    let cancel = shutdown::setup_shutdown_handler();

    let status = match cli.command {
        Commands::Sync(args) => {
            commands::sync::handle_sync(SyncKind::Incremental, args, &config, &database_url, cancel)
                .await?
        }
        Commands::Import(args) => {
            commands::sync::handle_sync(SyncKind::Full, args, &config, &database_url, cancel).await?
        }
        Commands::Catalog { action } => {
            commands::catalog::handle_catalog(action, &config, &database_url, cancel).await?
        }
        Commands::Runs { limit, output } => {
            commands::runs::handle_runs(limit, output, &database_url).await?;
            RunStatus::Success
        }
        Commands::Migrate { action } => {
            commands::migrate::handle_migrate(action, &database_url).await?;
            RunStatus::Success
        }
        Commands::Limits { .. } | Commands::Completions { .. } | Commands::Man { .. } => {
            RunStatus::Success
        }
    };

    let code = commands::sync::exit_code(status);
    if code != 0 {
        std::process::exit(code);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_and_import_share_arguments() {
        let cli = Cli::try_parse_from(["mlsync", "import", "-r", "office,property", "-p", "3", "-n"])
            .expect("import should parse");
        let Commands::Import(args) = cli.command else {
            panic!("expected import");
        };
        assert_eq!(args.resources.len(), 2);
        assert_eq!(args.max_pages, Some(3));
        assert!(args.dry_run);
    }

    #[test]
    fn sync_rejects_catalog_resource() {
        assert!(Cli::try_parse_from(["mlsync", "sync", "--resources", "dataset"]).is_err());
    }

    #[test]
    fn runs_defaults() {
        let cli = Cli::try_parse_from(["mlsync", "runs"]).expect("runs should parse");
        let Commands::Runs { limit, output } = cli.command else {
            panic!("expected runs");
        };
        assert_eq!(limit, 20);
        assert!(!output.is_json());
    }

    #[test]
    fn non_sqlite_urls_need_no_directory() {
        ensure_sqlite_dir("postgres://localhost/mlsync").expect("nothing to create");
    }
}
