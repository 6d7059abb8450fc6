//! Statistical catalog client.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::http::reqwest_transport::ReqwestTransport;
use crate::http::{HttpRequest, HttpTransport};
use crate::quota::{ApiRateLimiter, pacing};

use super::error::{CatalogError, Result};
use super::types::{CatalogDataset, CatalogMetadata, CatalogResponse};

/// Public catalog of every published dataset.
pub const DEFAULT_CATALOG_URL: &str = "https://api.census.gov/data.json";

/// The full catalog is large; give it longer than a metadata document.
pub const CATALOG_TIMEOUT: Duration = Duration::from_secs(60);

pub const METADATA_TIMEOUT: Duration = Duration::from_secs(30);

pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Pause between dataset batches.
pub const BATCH_PAUSE: Duration = Duration::from_secs(1);

/// Links under this path identify a dataset rather than a metadata document.
const DATASET_ID_PATH: &str = "/data/id/";

#[derive(Debug, Clone)]
pub struct CatalogClientConfig {
    pub catalog_url: String,
    pub requests_per_second: u32,
    pub metadata_timeout: Duration,
}

impl Default for CatalogClientConfig {
    fn default() -> Self {
        Self {
            catalog_url: DEFAULT_CATALOG_URL.to_string(),
            requests_per_second: pacing::CATALOG_DEFAULT_RPS,
            metadata_timeout: METADATA_TIMEOUT,
        }
    }
}

/// Selection and batching of catalog datasets.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub batch_size: usize,
    pub max_datasets: Option<usize>,
    /// Datasets before this index (after filtering) are skipped.
    pub start_index: usize,
    pub only_available: bool,
    /// Keep only these vintages. Empty keeps all.
    pub vintages: Vec<i64>,
    /// Checked before every batch.
    pub stop: Option<CancellationToken>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_datasets: None,
            start_index: 0,
            only_available: true,
            vintages: Vec::new(),
            stop: None,
        }
    }
}

impl BatchOptions {
    /// Apply the availability and vintage filters, then the start index and
    /// the dataset cap, in that order.
    #[must_use]
    pub fn select(&self, datasets: Vec<CatalogDataset>) -> Vec<CatalogDataset> {
        let selected = datasets
            .into_iter()
            .filter(|d| !self.only_available || d.available())
            .filter(|d| {
                self.vintages.is_empty() || d.vintage.is_some_and(|v| self.vintages.contains(&v))
            })
            .skip(self.start_index);

        match self.max_datasets {
            Some(max) => selected.take(max).collect(),
            None => selected.collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchInfo {
    /// 1-indexed.
    pub number: usize,
    pub total: usize,
}

/// Receives each batch of selected datasets.
#[async_trait]
pub trait DatasetSink: Send {
    async fn on_batch(&mut self, info: BatchInfo, datasets: Vec<CatalogDataset>);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchStats {
    /// Datasets in the catalog before selection.
    pub catalog_size: usize,
    pub selected: usize,
    pub batches: usize,
    pub delivered: usize,
    pub cancelled: bool,
}

/// Client for the statistical catalog API.
pub struct CatalogClient {
    config: CatalogClientConfig,
    transport: Arc<dyn HttpTransport>,
    limiter: ApiRateLimiter,
    request_count: AtomicU64,
}

impl CatalogClient {
    pub fn new(config: CatalogClientConfig) -> Result<Self> {
        let transport = ReqwestTransport::with_timeout(CATALOG_TIMEOUT)?;
        Ok(Self::new_with_transport(config, Arc::new(transport)))
    }

    pub fn new_with_transport(config: CatalogClientConfig, transport: Arc<dyn HttpTransport>) -> Self {
        let limiter = ApiRateLimiter::new(config.requests_per_second);
        Self {
            config,
            transport,
            limiter,
            request_count: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &CatalogClientConfig {
        &self.config
    }

    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Fetch every dataset listed in the catalog.
    pub async fn fetch_catalog(&self) -> Result<Vec<CatalogDataset>> {
        tracing::info!(url = %self.config.catalog_url, "Fetching dataset catalog");

        self.limiter.wait().await;
        let request = HttpRequest::get(&self.config.catalog_url).header("Accept", "application/json");
        let response = self.transport.send(request).await?;
        self.request_count.fetch_add(1, Ordering::Relaxed);

        if !response.is_success() {
            return Err(CatalogError::Api {
                status: response.status,
                message: response.text_lossy().trim().to_string(),
            });
        }

        let catalog: CatalogResponse = serde_json::from_slice(&response.body)?;
        tracing::info!(datasets = catalog.dataset.len(), "Fetched dataset catalog");
        Ok(catalog.dataset)
    }

    /// Fetch the catalog and hand the selected datasets to `sink` in
    /// batches of `options.batch_size`.
    pub async fn for_each_batch<S>(&self, options: &BatchOptions, sink: &mut S) -> Result<BatchStats>
    where
        S: DatasetSink + ?Sized,
    {
        let datasets = self.fetch_catalog().await?;
        let catalog_size = datasets.len();
        let selected = options.select(datasets);

        let batch_size = options.batch_size.max(1);
        let total = selected.len().div_ceil(batch_size);
        let mut stats = BatchStats {
            catalog_size,
            selected: selected.len(),
            ..BatchStats::default()
        };

        tracing::info!(
            catalog_size,
            selected = stats.selected,
            batches = total,
            "Processing catalog datasets"
        );

        let mut remaining = selected.into_iter().peekable();
        while remaining.peek().is_some() {
            if let Some(stop) = &options.stop
                && stop.is_cancelled()
            {
                tracing::info!(batches = stats.batches, "Stop requested, not starting next batch");
                stats.cancelled = true;
                return Ok(stats);
            }

            let batch: Vec<CatalogDataset> = remaining.by_ref().take(batch_size).collect();
            stats.batches += 1;
            stats.delivered += batch.len();

            tracing::debug!(batch = stats.batches, total, size = batch.len(), "Dataset batch");
            sink.on_batch(
                BatchInfo {
                    number: stats.batches,
                    total,
                },
                batch,
            )
            .await;

            if remaining.peek().is_some() {
                tokio::time::sleep(BATCH_PAUSE).await;
            }
        }

        Ok(stats)
    }

    /// Fetch the six linked metadata documents of `dataset` concurrently.
    pub async fn fetch_metadata(&self, dataset: &CatalogDataset) -> CatalogMetadata {
        let (geography, variables, tags, examples, groups, sorts) = tokio::join!(
            self.fetch_link(dataset.geography_link.as_deref(), "geography"),
            self.fetch_link(dataset.variables_link.as_deref(), "variables"),
            self.fetch_link(dataset.tags_link.as_deref(), "tags"),
            self.fetch_link(dataset.examples_link.as_deref(), "examples"),
            self.fetch_link(dataset.groups_link.as_deref(), "groups"),
            self.fetch_link(dataset.sorts_link.as_deref(), "sorts"),
        );

        let metadata = CatalogMetadata {
            geography,
            variables,
            tags,
            examples,
            groups,
            sorts,
        };
        tracing::debug!(
            dataset = %dataset.identifier,
            fetched = metadata.fetched_count(),
            "Fetched {}/6 metadata documents",
            metadata.fetched_count()
        );
        metadata
    }

    async fn fetch_link(&self, link: Option<&str>, part: &str) -> Option<Value> {
        let url = link.filter(|l| !l.is_empty() && !l.contains(DATASET_ID_PATH))?;
        self.fetch_json(url, part).await
    }

    /// GET a JSON document. Failures are logged and yield `None`.
    pub async fn fetch_json(&self, url: &str, part: &str) -> Option<Value> {
        self.limiter.wait().await;

        let request = HttpRequest::get(url).header("Accept", "application/json");
        let response =
            match tokio::time::timeout(self.config.metadata_timeout, self.transport.send(request)).await {
                Ok(Ok(response)) => response,
                Ok(Err(e)) => {
                    tracing::warn!(part, url, error = %e, "Metadata fetch failed");
                    return None;
                }
                Err(_) => {
                    tracing::warn!(part, url, "Metadata fetch timed out");
                    return None;
                }
            };
        self.request_count.fetch_add(1, Ordering::Relaxed);

        if !response.is_success() {
            tracing::warn!(part, url, status = response.status, "Metadata fetch returned error status");
            return None;
        }

        match serde_json::from_slice(&response.body) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(part, url, error = %e, "Metadata document is not JSON");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tokio::time::Instant;

    use super::*;
    use crate::http::MockTransport;

    const CATALOG: &str = "https://catalog.example.com/data.json";

    fn client(transport: &MockTransport) -> CatalogClient {
        CatalogClient::new_with_transport(
            CatalogClientConfig {
                catalog_url: CATALOG.to_string(),
                requests_per_second: 1_000,
                ..CatalogClientConfig::default()
            },
            Arc::new(transport.clone()),
        )
    }

    fn dataset(id: &str, vintage: i64, available: bool) -> Value {
        json!({
            "identifier": id,
            "title": format!("Dataset {id}"),
            "c_vintage": vintage,
            "c_isAvailable": available
        })
    }

    fn datasets(values: Vec<Value>) -> Vec<CatalogDataset> {
        values
            .into_iter()
            .map(|v| serde_json::from_value(v).expect("dataset"))
            .collect()
    }

    #[derive(Default)]
    struct Batches {
        infos: Vec<BatchInfo>,
        ids: Vec<String>,
        cancel_after: Option<(usize, CancellationToken)>,
    }

    #[async_trait]
    impl DatasetSink for Batches {
        async fn on_batch(&mut self, info: BatchInfo, datasets: Vec<CatalogDataset>) {
            self.infos.push(info);
            self.ids.extend(datasets.into_iter().map(|d| d.identifier));
            if let Some((after, token)) = &self.cancel_after
                && info.number == *after
            {
                token.cancel();
            }
        }
    }

    #[test]
    fn select_filters_then_slices() {
        let all = datasets(vec![
            dataset("a", 2020, true),
            dataset("b", 2021, false),
            dataset("c", 2021, true),
            dataset("d", 2022, true),
            dataset("e", 2021, true),
        ]);

        let ids = |selected: Vec<CatalogDataset>| -> Vec<String> {
            selected.into_iter().map(|d| d.identifier).collect()
        };

        assert_eq!(ids(BatchOptions::default().select(all.clone())), vec!["a", "c", "d", "e"]);

        let options = BatchOptions {
            only_available: false,
            vintages: vec![2021],
            ..BatchOptions::default()
        };
        assert_eq!(ids(options.select(all.clone())), vec!["b", "c", "e"]);

        let options = BatchOptions {
            start_index: 1,
            max_datasets: Some(2),
            ..BatchOptions::default()
        };
        assert_eq!(ids(options.select(all)), vec!["c", "d"]);
    }

    #[tokio::test(start_paused = true)]
    async fn batches_are_delivered_with_a_pause_between_them() {
        let transport = MockTransport::new();
        let values: Vec<Value> = (0..5).map(|i| dataset(&format!("d{i}"), 2020, true)).collect();
        transport.push_json(CATALOG, 200, &json!({ "dataset": values }));

        let options = BatchOptions {
            batch_size: 2,
            ..BatchOptions::default()
        };
        let mut sink = Batches::default();
        let start = Instant::now();
        let stats = client(&transport)
            .for_each_batch(&options, &mut sink)
            .await
            .expect("batches");

        assert_eq!(stats.batches, 3);
        assert_eq!(stats.delivered, 5);
        assert!(!stats.cancelled);
        assert_eq!(
            sink.infos,
            vec![
                BatchInfo { number: 1, total: 3 },
                BatchInfo { number: 2, total: 3 },
                BatchInfo { number: 3, total: 3 },
            ]
        );
        assert_eq!(sink.ids, vec!["d0", "d1", "d2", "d3", "d4"]);
        // Two pauses, none after the last batch.
        assert!(start.elapsed() >= BATCH_PAUSE * 2);
        assert!(start.elapsed() < BATCH_PAUSE * 3);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_between_batches() {
        let transport = MockTransport::new();
        let values: Vec<Value> = (0..6).map(|i| dataset(&format!("d{i}"), 2020, true)).collect();
        transport.push_json(CATALOG, 200, &json!({ "dataset": values }));

        let token = CancellationToken::new();
        let options = BatchOptions {
            batch_size: 2,
            stop: Some(token.clone()),
            ..BatchOptions::default()
        };
        let mut sink = Batches {
            cancel_after: Some((1, token)),
            ..Batches::default()
        };
        let stats = client(&transport)
            .for_each_batch(&options, &mut sink)
            .await
            .expect("batches");

        assert!(stats.cancelled);
        assert_eq!(stats.batches, 1);
        assert_eq!(sink.ids, vec!["d0", "d1"]);
    }

    #[tokio::test]
    async fn catalog_error_status_is_an_api_error() {
        let transport = MockTransport::new();
        transport.push_json(CATALOG, 503, &json!({"error": "unavailable"}));

        let err = client(&transport).fetch_catalog().await.expect_err("fail");
        assert!(matches!(err, CatalogError::Api { status: 503, .. }));
    }

    #[tokio::test]
    async fn metadata_failures_yield_none_for_that_part() {
        let transport = MockTransport::new();
        let ds: CatalogDataset = serde_json::from_value(json!({
            "identifier": "https://catalog.example.com/data/id/X",
            "c_variablesLink": "https://catalog.example.com/2020/x/variables.json",
            "c_tagsLink": "https://catalog.example.com/2020/x/tags.json",
            "c_groupsLink": "https://catalog.example.com/2020/x/groups.json",
            "c_examplesLink": "https://catalog.example.com/data/id/X",
        }))
        .expect("dataset");

        transport.push_json(
            "https://catalog.example.com/2020/x/variables.json",
            200,
            &json!({"variables": {"NAME": {}}}),
        );
        transport.push_json("https://catalog.example.com/2020/x/tags.json", 404, &json!({}));
        transport.push_failure("https://catalog.example.com/2020/x/groups.json", "reset");

        let metadata = client(&transport).fetch_metadata(&ds).await;
        assert_eq!(metadata.variables, Some(json!({"variables": {"NAME": {}}})));
        assert_eq!(metadata.tags, None);
        assert_eq!(metadata.groups, None);
        assert_eq!(metadata.examples, None);
        assert_eq!(metadata.fetched_count(), 1);

        // The dataset-id link and the missing links are never requested.
        let mut urls = transport.request_urls();
        urls.sort();
        assert_eq!(
            urls,
            vec![
                "https://catalog.example.com/2020/x/groups.json",
                "https://catalog.example.com/2020/x/tags.json",
                "https://catalog.example.com/2020/x/variables.json",
            ]
        );
    }
}
