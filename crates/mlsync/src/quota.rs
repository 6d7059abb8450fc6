//! Outbound traffic governance.
//!
//! The listing provider enforces five independent windows (requests per
//! second, hour and day; bytes per hour and day) and suspends accounts that
//! cross them. [`RateGovernor`] keeps a rolling history of completed
//! requests and sleeps callers until every window has room again.
//! [`PauseState`] carries the provider's own throttle signal to every
//! client sharing the governor.
//!
//! # Example
//!
//! ```ignore
//! use mlsync::quota::{LimitConfig, RateGovernor};
//!
//! let governor = RateGovernor::new(LimitConfig::default());
//! governor.await_budget().await;
//! let response = send().await?;
//! governor.record_request(response.body.len() as u64);
//! ```

mod budget;
mod limits;
mod pacer;
mod pause;
mod snapshot;

pub use budget::{HOURLY_BYTES_BUFFER, HOURLY_REQUEST_BUFFER, RateGovernor, RateWindowSample};
pub use limits::{BYTES_PER_GB, BYTES_PER_MB, LimitConfig, LimitDimension, provider_limits};
pub use pacer::{ApiRateLimiter, pacing};
pub use pause::PauseState;
pub use snapshot::{
    CRITICAL_THRESHOLD_PERCENT, HealthStatus, QuotaSnapshot, UsagePercentages, UsageWarnings,
    WARNING_THRESHOLD_PERCENT,
};
