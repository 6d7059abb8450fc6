use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Bytes in one megabyte as the provider counts them.
pub const BYTES_PER_MB: u64 = 1024 * 1024;
/// Bytes in one gigabyte as the provider counts them.
pub const BYTES_PER_GB: u64 = 1024 * BYTES_PER_MB;

/// Thresholds published by the listing provider.
///
/// Crossing a warning threshold gets the account flagged; crossing a
/// suspension threshold gets it suspended without notice.
pub mod provider_limits {
    pub const WARNING_REQ_PER_SECOND: u32 = 4;
    pub const WARNING_REQ_PER_HOUR: u32 = 7_200;
    pub const WARNING_REQ_PER_24H: u32 = 40_000;
    pub const WARNING_MB_PER_HOUR: u64 = 3_072;
    pub const WARNING_GB_PER_24H: u64 = 40;

    pub const SUSPENSION_REQ_PER_SECOND: u32 = 6;
    pub const SUSPENSION_REQ_PER_HOUR: u32 = 18_000;
    pub const SUSPENSION_REQ_PER_24H: u32 = 60_000;
    pub const SUSPENSION_MB_PER_HOUR: u64 = 4_096;
    pub const SUSPENSION_GB_PER_24H: u64 = 60;
}

/// Limits enforced locally by [`RateGovernor`](super::RateGovernor).
///
/// The defaults sit well under the provider's warning thresholds so that a
/// burst of retries or a clock hiccup never pushes the account into
/// warning territory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitConfig {
    pub max_req_per_second: u32,
    pub max_req_per_hour: u32,
    pub max_req_per_24h: u32,
    pub max_mb_per_hour: u64,
    pub max_gb_per_24h: u64,
    /// Fixed gap enforced between consecutive requests, in milliseconds.
    pub min_delay_between_requests_ms: u64,
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            max_req_per_second: 2,
            max_req_per_hour: 5_000,
            max_req_per_24h: 30_000,
            max_mb_per_hour: 2_000,
            max_gb_per_24h: 30,
            min_delay_between_requests_ms: 500,
        }
    }
}

impl LimitConfig {
    #[must_use]
    pub fn min_delay(&self) -> Duration {
        Duration::from_millis(self.min_delay_between_requests_ms)
    }

    #[must_use]
    pub fn max_bytes_per_hour(&self) -> u64 {
        self.max_mb_per_hour.saturating_mul(BYTES_PER_MB)
    }

    #[must_use]
    pub fn max_bytes_per_24h(&self) -> u64 {
        self.max_gb_per_24h.saturating_mul(BYTES_PER_GB)
    }

    /// Return the first configured limit that exceeds the provider's warning
    /// threshold, if any.
    #[must_use]
    pub fn exceeds_provider_warning(&self) -> Option<LimitDimension> {
        use provider_limits::*;

        if self.max_req_per_24h > WARNING_REQ_PER_24H {
            Some(LimitDimension::DayRequests)
        } else if self.max_gb_per_24h > WARNING_GB_PER_24H {
            Some(LimitDimension::DayBytes)
        } else if self.max_req_per_hour > WARNING_REQ_PER_HOUR {
            Some(LimitDimension::HourRequests)
        } else if self.max_mb_per_hour > WARNING_MB_PER_HOUR {
            Some(LimitDimension::HourBytes)
        } else if self.max_req_per_second > WARNING_REQ_PER_SECOND {
            Some(LimitDimension::SecondRequests)
        } else {
            None
        }
    }
}

/// One windowed limit tracked by the governor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitDimension {
    DayRequests,
    DayBytes,
    HourRequests,
    HourBytes,
    SecondRequests,
}

impl LimitDimension {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LimitDimension::DayRequests => "requests/24h",
            LimitDimension::DayBytes => "bytes/24h",
            LimitDimension::HourRequests => "requests/hour",
            LimitDimension::HourBytes => "bytes/hour",
            LimitDimension::SecondRequests => "requests/second",
        }
    }
}

impl fmt::Display for LimitDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
