//! mlsync - quota-governed replication of a listing feed into a local store.
//!
//! Listing records (offices, members, properties, open houses) are pulled
//! page by page from the provider's OData API under a rolling request and
//! bandwidth budget, then reconciled into a [`store::SyncStore`]. The public
//! statistical catalog is imported through the same store.
//!
//! # Features
//!
//! - `sqlite` - SQLite driver for [`store::DbStore`] (default).
//! - `migrate` - Enables database migration support. When enabled, you can use
//!   [`connect_and_migrate`] to automatically run migrations on connection.
//!
//! # Example
//!
//! ```ignore
//! use mlsync::store::{DbStore, SyncStore};
//! use mlsync::{ResourceKind, connect_and_migrate};
//!
//! let db = connect_and_migrate("sqlite://mlsync.db?mode=rwc").await?;
//! let store = DbStore::new(db);
//!
//! // Last synced modification time for properties
//! let since = store.last_watermark(ResourceKind::Property).await?;
//! ```

pub mod catalog;
pub mod db;
pub mod entity;
pub mod http;
pub mod listing;
pub mod quota;
pub mod retry;
pub mod store;
pub mod sync;

#[cfg(feature = "migrate")]
pub mod migration;

pub use db::connect;
#[cfg(feature = "migrate")]
pub use db::connect_and_migrate;
pub use entity::prelude::*;
pub use quota::{ApiRateLimiter, LimitConfig, QuotaSnapshot, RateGovernor};
