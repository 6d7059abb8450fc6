//! Client for the listing provider's paginated OData API.
//!
//! # Module Structure
//!
//! - [`error`] - Error types and helpers
//! - [`throttle`] - Classification and waits for provider throttle responses
//! - [`query`] - OData query construction and sync filters
//! - [`types`] - Wire types: [`Record`], [`ODataPage`]
//! - `client` - [`ListingClient`]: governed, retrying requests
//! - `pagination` - [`ListingClient::for_each_page`] and [`PageSink`]
//!
//! # Example
//!
//! ```ignore
//! use mlsync::listing::{ListingClient, ListingClientConfig, PageOptions};
//! use mlsync::quota::{LimitConfig, RateGovernor};
//!
//! let governor = RateGovernor::new(LimitConfig::default());
//! let client = ListingClient::new(ListingClientConfig::new(base_url, token), governor)?;
//! let url = client.url_for(&client.query_for(ResourceKind::Office))?;
//! let stats = client.for_each_page(url, &PageOptions::default(), &mut sink).await?;
//! ```

mod client;
pub mod error;
mod pagination;
pub mod query;
pub mod throttle;
pub mod types;

pub use client::{
    DEFAULT_BASE_URL, DEFAULT_PAGE_SIZE, ListingClient, ListingClientConfig, MAX_PAGE_SIZE,
};
pub use error::{ListingError, Result, short_error_message};
pub use pagination::{
    CollectSink, PageInfo, PageOptions, PageSink, PageStats, RecordFilter, StopReason,
};
pub use query::{ODataQuery, VISIBLE_FILTER, modified_since_filter};
pub use throttle::{MAX_THROTTLE_RETRIES, ThrottleKind};
pub use types::{ODataPage, Record};
