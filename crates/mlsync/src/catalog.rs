//! Client for the public statistical catalog.
//!
//! The catalog is a single JSON document listing every dataset; each entry
//! links to up to six metadata documents. Datasets are reconciled through
//! the same [`SyncStore`](crate::store::SyncStore) contract as listing
//! records, under [`ResourceKind::Dataset`](crate::entity::resource_kind::ResourceKind).

mod client;
pub mod error;
pub mod types;

pub use client::{
    BATCH_PAUSE, BatchInfo, BatchOptions, BatchStats, CATALOG_TIMEOUT, CatalogClient,
    CatalogClientConfig, DEFAULT_BATCH_SIZE, DEFAULT_CATALOG_URL, DatasetSink, METADATA_TIMEOUT,
};
pub use error::{CatalogError, Result};
pub use types::{CatalogDataset, CatalogMetadata, CatalogResponse};
