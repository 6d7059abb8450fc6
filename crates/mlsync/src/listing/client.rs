//! Listing API client creation and request handling.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::entity::resource_kind::ResourceKind;
use crate::http::reqwest_transport::ReqwestTransport;
use crate::http::{DEFAULT_REQUEST_TIMEOUT, HttpRequest, HttpTransport};
use crate::quota::RateGovernor;
use crate::sync::{ProgressCallback, SyncProgress, emit};

use super::error::{ListingError, Result};
use super::query::ODataQuery;
use super::throttle::{self, MAX_THROTTLE_RETRIES, THROTTLE_STATUS};
use super::types::{ODataPage, Record};

/// Default listing provider API root.
pub const DEFAULT_BASE_URL: &str = "https://api.mlsgrid.com/v2";

/// Records requested per page.
pub const DEFAULT_PAGE_SIZE: u32 = 200;

/// Largest page the provider accepts.
pub const MAX_PAGE_SIZE: u32 = 1_000;

/// Log a usage snapshot every this many requests.
pub const STATS_LOG_INTERVAL: u64 = 100;

/// Check the warning thresholds every this many requests.
pub const WARNING_CHECK_INTERVAL: u64 = 50;

/// Connection settings for the listing provider.
#[derive(Debug, Clone)]
pub struct ListingClientConfig {
    pub base_url: String,
    pub token: String,
    pub page_size: u32,
    pub timeout: Duration,
}

impl Default for ListingClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: String::new(),
            page_size: DEFAULT_PAGE_SIZE,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl ListingClientConfig {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: token.into(),
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<()> {
        if self.token.trim().is_empty() {
            return Err(ListingError::config("listing API token is not set"));
        }
        if self.base_url.trim().is_empty() {
            return Err(ListingError::config("listing API base URL is not set"));
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(ListingError::config(format!(
                "page size must be between 1 and {}, got {}",
                MAX_PAGE_SIZE, self.page_size
            )));
        }
        Ok(())
    }
}

/// Client for the listing provider's OData API.
///
/// Every request goes through the shared [`RateGovernor`]; throttle
/// responses pause the governor for all of its users and are retried up to
/// [`MAX_THROTTLE_RETRIES`] times.
pub struct ListingClient {
    config: ListingClientConfig,
    transport: Arc<dyn HttpTransport>,
    governor: RateGovernor,
    request_count: AtomicU64,
    on_progress: Option<Arc<ProgressCallback>>,
}

impl ListingClient {
    /// Create a client using the real HTTP transport.
    pub fn new(config: ListingClientConfig, governor: RateGovernor) -> Result<Self> {
        config.validate()?;
        let transport = ReqwestTransport::with_timeout(config.timeout)?;
        Self::new_with_transport(config, governor, Arc::new(transport))
    }

    /// Create a client with a caller-supplied transport.
    pub fn new_with_transport(
        config: ListingClientConfig,
        governor: RateGovernor,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            transport,
            governor,
            request_count: AtomicU64::new(0),
            on_progress: None,
        })
    }

    /// Report throttle events through `callback`.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<ProgressCallback>) -> Self {
        self.on_progress = Some(callback);
        self
    }

    pub fn config(&self) -> &ListingClientConfig {
        &self.config
    }

    pub fn governor(&self) -> &RateGovernor {
        &self.governor
    }

    /// Requests completed successfully by this client.
    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    /// First-page query for `kind` with its default expansion and page size.
    pub fn query_for(&self, kind: ResourceKind) -> ODataQuery {
        let query = ODataQuery::new(kind.endpoint()).top(self.config.page_size);
        match kind.default_expand() {
            Some(expand) => query.expand(expand),
            None => query,
        }
    }

    pub fn url_for(&self, query: &ODataQuery) -> Result<String> {
        query.to_url(&self.config.base_url)
    }

    /// Fetch one page from an absolute URL (a rendered query or a next link).
    pub async fn fetch_page(&self, url: &str) -> Result<ODataPage> {
        self.get_json(url).await
    }

    /// Look up a single record by natural key.
    pub async fn get_record(&self, kind: ResourceKind, key: &str) -> Result<Option<Record>> {
        let filter = format!("{} eq '{}'", kind.key_field(), key.replace('\'', "''"));
        let mut query = self.query_for(kind).filter(filter);
        query.top = Some(1);
        let page = self.fetch_page(&self.url_for(&query)?).await?;
        Ok(page.value.into_iter().next())
    }

    /// GET `url` and decode the JSON body, handling throttle retries.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let mut retries: u32 = 0;

        loop {
            self.governor.await_budget().await;

            let request = HttpRequest::get(url)
                .header("Authorization", format!("Bearer {}", self.config.token))
                .header("Accept", "application/json");
            let response = self.transport.send(request).await?;

            if response.status == THROTTLE_STATUS {
                let message = throttle::extract_message(&response.text_lossy());
                if retries >= MAX_THROTTLE_RETRIES {
                    tracing::error!(
                        attempts = retries,
                        message = %message,
                        "Provider throttle persisted through every retry"
                    );
                    return Err(ListingError::RateLimitExhausted {
                        attempts: retries,
                        message,
                    });
                }

                let kind = throttle::classify(&message);
                let wait = throttle::wait_for(kind, retries);
                retries += 1;

                tracing::warn!(
                    kind = %kind,
                    attempt = retries,
                    wait_secs = wait.as_secs(),
                    message = %message,
                    "Provider throttled request, pausing"
                );
                emit(
                    self.on_progress.as_deref(),
                    SyncProgress::Throttled {
                        kind: kind.to_string(),
                        wait_secs: wait.as_secs(),
                        attempt: retries,
                    },
                );

                // The next await_budget sleeps through this pause.
                self.governor.pause().pause_for(wait);
                continue;
            }

            if !response.is_success() {
                return Err(ListingError::Api {
                    status: response.status,
                    message: throttle::extract_message(&response.text_lossy()),
                });
            }

            self.governor.record_request(response.byte_size());
            self.after_request();

            return Ok(serde_json::from_slice(&response.body)?);
        }
    }

    fn after_request(&self) {
        let count = self.request_count.fetch_add(1, Ordering::Relaxed) + 1;
        if count % STATS_LOG_INTERVAL == 0 {
            self.governor.log_snapshot();
        }
        if count % WARNING_CHECK_INTERVAL == 0 {
            self.governor.warn_if_near_limits();
        }
    }
}
