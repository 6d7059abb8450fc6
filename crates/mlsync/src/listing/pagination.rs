//! Batch-callback iteration over linked result pages.
//!
//! Pages are fetched strictly one after another: the next page is requested
//! only after the sink has finished with the current one, so callers never
//! hold a whole collection in memory and rate accounting stays sequential.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::client::ListingClient;
use super::error::Result;
use super::types::Record;

/// Predicate deciding which fetched records reach the sink.
pub type RecordFilter = Arc<dyn Fn(&Record) -> bool + Send + Sync>;

/// Options for [`ListingClient::for_each_page`].
#[derive(Clone, Default)]
pub struct PageOptions {
    /// Stop after this many pages.
    pub max_pages: Option<u32>,
    /// Records failing the filter are counted as fetched but not delivered.
    pub filter: Option<RecordFilter>,
    /// Checked before every page fetch.
    pub stop: Option<CancellationToken>,
}

impl std::fmt::Debug for PageOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageOptions")
            .field("max_pages", &self.max_pages)
            .field("filter", &self.filter.is_some())
            .field("stop", &self.stop)
            .finish()
    }
}

/// Position and size of a delivered page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageInfo {
    /// 1-indexed page number.
    pub number: u32,
    /// Records on the page before filtering.
    pub fetched: usize,
    pub has_next: bool,
}

/// Receives each page of records.
#[async_trait]
pub trait PageSink: Send {
    async fn on_page(&mut self, info: PageInfo, records: Vec<Record>);
}

/// Why the page loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopReason {
    /// The provider returned no next link.
    #[default]
    Exhausted,
    /// `max_pages` pages were fetched and more remained.
    MaxPages,
    /// The stop token was cancelled before the next fetch.
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageStats {
    pub pages: u32,
    pub fetched: usize,
    pub delivered: usize,
    pub stop: StopReason,
}

/// Collects every delivered record.
#[derive(Debug, Default)]
pub struct CollectSink {
    pub records: Vec<Record>,
}

#[async_trait]
impl PageSink for CollectSink {
    async fn on_page(&mut self, _info: PageInfo, records: Vec<Record>) {
        self.records.extend(records);
    }
}

impl ListingClient {
    /// Walk a collection starting at `first_url`, handing each page to
    /// `sink` before following the provider's next link.
    ///
    /// A cancelled stop token ends the loop before the next fetch; a page
    /// already handed to the sink is always finished first.
    pub async fn for_each_page<S>(
        &self,
        first_url: String,
        options: &PageOptions,
        sink: &mut S,
    ) -> Result<PageStats>
    where
        S: PageSink + ?Sized,
    {
        let mut stats = PageStats::default();
        let mut next = Some(first_url);

        while let Some(url) = next.take() {
            if let Some(stop) = &options.stop
                && stop.is_cancelled()
            {
                tracing::info!(pages = stats.pages, "Stop requested, not fetching next page");
                stats.stop = StopReason::Cancelled;
                return Ok(stats);
            }

            if let Some(max) = options.max_pages
                && stats.pages >= max
            {
                tracing::info!(max_pages = max, "Reached page limit");
                stats.stop = StopReason::MaxPages;
                return Ok(stats);
            }

            let page = self.fetch_page(&url).await?;
            stats.pages += 1;

            let fetched = page.value.len();
            let records: Vec<Record> = match &options.filter {
                Some(filter) => page.value.into_iter().filter(|r| filter(r)).collect(),
                None => page.value,
            };
            let has_next = page.next_link.as_deref().is_some_and(|l| !l.is_empty());

            stats.fetched += fetched;
            stats.delivered += records.len();

            tracing::debug!(
                page = stats.pages,
                fetched,
                delivered = records.len(),
                has_next,
                "Fetched page"
            );

            sink.on_page(
                PageInfo {
                    number: stats.pages,
                    fetched,
                    has_next,
                },
                records,
            )
            .await;

            next = page.next_link.filter(|l| !l.is_empty());
        }

        stats.stop = StopReason::Exhausted;
        Ok(stats)
    }

    /// Collect up to `max_pages` pages into memory.
    ///
    /// Only for small result sets; syncs use [`for_each_page`](Self::for_each_page).
    pub async fn fetch_all(&self, first_url: String, max_pages: Option<u32>) -> Result<Vec<Record>> {
        let mut sink = CollectSink::default();
        let options = PageOptions {
            max_pages,
            ..PageOptions::default()
        };
        self.for_each_page(first_url, &options, &mut sink).await?;
        Ok(sink.records)
    }
}
