//! Configuration file support for mlsync.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (prefixed with `MLSYNC_`, e.g., `MLSYNC_PROVIDER_TOKEN`)
//! 3. Config file (~/.config/mlsync/config.toml or ./mlsync.toml)
//! 4. Built-in defaults
//!
//! The database URL defaults to `sqlite://~/.local/state/mlsync/mlsync.db` on Linux
//! (using the XDG state directory) if not explicitly configured.
//!
//! Example config file:
//! ```toml
//! [database]
//! url = "sqlite://~/.local/state/mlsync/mlsync.db"  # optional, this is the default
//!
//! [provider]
//! url = "https://api.mlsgrid.com/v2"
//! token = "..."  # or use MLSYNC_PROVIDER_TOKEN env var
//! page_size = 200
//!
//! [limits]
//! max_req_per_second = 2
//! max_req_per_hour = 5000
//! max_mb_per_hour = 2000
//! min_delay_between_requests_ms = 500
//!
//! [sync]
//! max_pages = 10
//! location = { state_or_province = "IL", county_or_parish = "Cook" }
//!
//! [catalog]
//! url = "https://api.census.gov/data.json"
//! batch_size = 50
//! ```

use std::path::PathBuf;
use std::time::Duration;

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use directories::ProjectDirs;
use mlsync::catalog::{CatalogClientConfig, DEFAULT_BATCH_SIZE, DEFAULT_CATALOG_URL, METADATA_TIMEOUT};
use mlsync::http::DEFAULT_REQUEST_TIMEOUT;
use mlsync::listing::{DEFAULT_BASE_URL, DEFAULT_PAGE_SIZE, ListingClientConfig};
use mlsync::quota::{LimitConfig, pacing};
use mlsync::sync::{DEFAULT_METADATA_CONCURRENCY, LocationFilter};
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    /// Listing provider connection.
    pub provider: ProviderConfig,
    /// Local request and bandwidth budget.
    pub limits: LimitConfig,
    /// Default sync options.
    pub sync: SyncConfig,
    pub catalog: CatalogConfig,
}

/// Database configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database connection URL.
    /// Defaults to `sqlite://~/.local/state/mlsync/mlsync.db` if not specified.
    pub url: Option<String>,
}

/// Listing provider configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// API root, e.g. "https://api.mlsgrid.com/v2".
    pub url: String,
    /// Bearer token.
    /// Can also be set via MLSYNC_PROVIDER_TOKEN environment variable.
    pub token: Option<String>,
    pub page_size: u32,
    /// Per-request timeout in seconds.
    pub timeout: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_BASE_URL.to_string(),
            token: None,
            page_size: DEFAULT_PAGE_SIZE,
            timeout: DEFAULT_REQUEST_TIMEOUT.as_secs(),
        }
    }
}

/// Default sync options.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Stop each resource after this many pages.
    pub max_pages: Option<u32>,
    /// Only store properties in this area.
    pub location: Option<LocationFilter>,
}

/// Statistical catalog configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub url: String,
    /// Requests per second across catalog and metadata fetches.
    pub rps: u32,
    pub batch_size: usize,
    /// Fetch linked metadata documents for each dataset.
    pub metadata: bool,
    /// Datasets whose metadata is fetched at once.
    pub concurrency: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_CATALOG_URL.to_string(),
            rps: pacing::CATALOG_DEFAULT_RPS,
            batch_size: DEFAULT_BATCH_SIZE,
            metadata: false,
            concurrency: DEFAULT_METADATA_CONCURRENCY,
        }
    }
}

impl Config {
    /// Load configuration using the config crate's layered approach.
    ///
    /// Sources are loaded in order (later sources override earlier):
    /// 1. Built-in defaults
    /// 2. XDG config file (~/.config/mlsync/config.toml)
    /// 3. Local config file (./mlsync.toml)
    /// 4. Environment variables with MLSYNC_ prefix
    pub fn load() -> Self {
        let mut builder = ConfigBuilder::builder();

        if let Some(proj_dirs) = ProjectDirs::from("", "", "mlsync") {
            let xdg_config = proj_dirs.config_dir().join("config.toml");
            if xdg_config.exists() {
                tracing::debug!("Loading config from {:?}", xdg_config);
                builder = builder.add_source(
                    File::from(xdg_config)
                        .format(FileFormat::Toml)
                        .required(false),
                );
            }
        }

        // Local config file (higher priority than XDG)
        let local_config = PathBuf::from("mlsync.toml");
        if local_config.exists() {
            tracing::debug!("Loading config from ./mlsync.toml");
            builder = builder.add_source(
                File::from(local_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        // e.g., MLSYNC_PROVIDER_TOKEN -> provider.token
        builder = builder.add_source(
            Environment::with_prefix("MLSYNC")
                .separator("_")
                .try_parsing(true),
        );

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<Config>() {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to deserialize config: {}", e);
                    Config::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to build config: {}", e);
                Config::default()
            }
        }
    }

    /// Get the database URL, falling back to the default state directory path.
    ///
    /// The `mode=rwc` parameter creates the SQLite file if it doesn't exist.
    pub fn database_url(&self) -> Option<String> {
        self.database.url.clone().or_else(|| {
            Self::default_state_dir().map(|state_dir| {
                let db_path = state_dir.join("mlsync.db");
                format!("sqlite://{}?mode=rwc", db_path.display())
            })
        })
    }

    /// Listing client settings. The token may be empty; the client rejects
    /// that before sending anything.
    pub fn listing_client(&self) -> ListingClientConfig {
        ListingClientConfig {
            base_url: self.provider.url.clone(),
            token: self.provider.token.clone().unwrap_or_default(),
            page_size: self.provider.page_size,
            timeout: Duration::from_secs(self.provider.timeout),
        }
    }

    pub fn catalog_client(&self) -> CatalogClientConfig {
        CatalogClientConfig {
            catalog_url: self.catalog.url.clone(),
            requests_per_second: self.catalog.rps,
            metadata_timeout: METADATA_TIMEOUT,
        }
    }

    /// Get the default state directory path.
    ///
    /// On Linux, this is `$XDG_STATE_HOME/mlsync` or `~/.local/state/mlsync`.
    /// On macOS/Windows, falls back to the data directory.
    pub fn default_state_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "mlsync").map(|dirs| {
            dirs.state_dir()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| dirs.data_dir().to_path_buf())
        })
    }
}
