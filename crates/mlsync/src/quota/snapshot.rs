use std::fmt;

use serde::Serialize;
use tokio::time::{Duration, Instant};

use super::budget::{DAY, HOUR, Ledger, MINUTE, SECOND};
use super::limits::{BYTES_PER_GB, BYTES_PER_MB, LimitConfig};

/// Usage above this percentage produces a warning.
pub const WARNING_THRESHOLD_PERCENT: f64 = 80.0;
/// Usage above this percentage is reported as critical.
pub const CRITICAL_THRESHOLD_PERCENT: f64 = 90.0;

/// Overall health derived from hourly usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Warning,
    Critical,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Warning => "warning",
            HealthStatus::Critical => "critical",
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct UsagePercentages {
    pub hour_requests: f64,
    pub day_requests: f64,
    pub hour_bandwidth: f64,
    pub day_bandwidth: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UsageWarnings {
    pub hour_requests: bool,
    pub day_requests: bool,
    pub hour_bandwidth: bool,
    pub day_bandwidth: bool,
}

/// Point-in-time view of the governor's windows, for dashboards and logs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuotaSnapshot {
    pub requests_last_second: u64,
    pub requests_last_minute: u64,
    pub requests_last_hour: u64,
    pub requests_last_24h: u64,
    pub mb_last_hour: f64,
    pub gb_last_24h: f64,
    pub total_requests: u64,
    pub total_gb: f64,
    pub limits: LimitConfig,
    pub percentages: UsagePercentages,
    pub warnings: UsageWarnings,
    pub warning_messages: Vec<String>,
    pub health: HealthStatus,
    /// Seconds left on an active throttle pause.
    pub paused_for_secs: Option<u64>,
}

fn percent(used: f64, limit: f64) -> f64 {
    if limit <= 0.0 {
        return 0.0;
    }
    used * 100.0 / limit
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

impl QuotaSnapshot {
    pub(crate) fn from_ledger(
        ledger: &Ledger,
        now: Instant,
        limits: &LimitConfig,
        paused_for: Option<Duration>,
    ) -> Self {
        let requests_last_hour = ledger.count(now, HOUR);
        let requests_last_24h = ledger.count(now, DAY);
        let mb_last_hour = ledger.bytes(now, HOUR) as f64 / BYTES_PER_MB as f64;
        let gb_last_24h = ledger.bytes(now, DAY) as f64 / BYTES_PER_GB as f64;

        let percentages = UsagePercentages {
            hour_requests: percent(requests_last_hour as f64, f64::from(limits.max_req_per_hour)),
            day_requests: percent(requests_last_24h as f64, f64::from(limits.max_req_per_24h)),
            hour_bandwidth: percent(mb_last_hour, limits.max_mb_per_hour as f64),
            day_bandwidth: percent(gb_last_24h, limits.max_gb_per_24h as f64),
        };

        let warnings = UsageWarnings {
            hour_requests: percentages.hour_requests > WARNING_THRESHOLD_PERCENT,
            day_requests: percentages.day_requests > WARNING_THRESHOLD_PERCENT,
            hour_bandwidth: percentages.hour_bandwidth > WARNING_THRESHOLD_PERCENT,
            day_bandwidth: percentages.day_bandwidth > WARNING_THRESHOLD_PERCENT,
        };

        let mut warning_messages = Vec::new();
        if warnings.hour_requests {
            warning_messages.push(format!(
                "Hourly request usage at {:.1}% ({}/{})",
                percentages.hour_requests, requests_last_hour, limits.max_req_per_hour
            ));
        }
        if warnings.day_requests {
            warning_messages.push(format!(
                "Daily request usage at {:.1}% ({}/{})",
                percentages.day_requests, requests_last_24h, limits.max_req_per_24h
            ));
        }
        if warnings.hour_bandwidth {
            warning_messages.push(format!(
                "Hourly bandwidth usage at {:.1}% ({:.2} MB/{} MB)",
                percentages.hour_bandwidth, mb_last_hour, limits.max_mb_per_hour
            ));
        }
        if warnings.day_bandwidth {
            warning_messages.push(format!(
                "Daily bandwidth usage at {:.1}% ({:.2} GB/{} GB)",
                percentages.day_bandwidth, gb_last_24h, limits.max_gb_per_24h
            ));
        }

        let hourly_peak = percentages.hour_requests.max(percentages.hour_bandwidth);
        let health = if hourly_peak > CRITICAL_THRESHOLD_PERCENT {
            HealthStatus::Critical
        } else if hourly_peak > WARNING_THRESHOLD_PERCENT {
            HealthStatus::Warning
        } else {
            HealthStatus::Healthy
        };

        Self {
            requests_last_second: ledger.count(now, SECOND),
            requests_last_minute: ledger.count(now, MINUTE),
            requests_last_hour,
            requests_last_24h,
            mb_last_hour: round2(mb_last_hour),
            gb_last_24h: round2(gb_last_24h),
            total_requests: ledger.total_requests(),
            total_gb: round2(ledger.total_bytes() as f64 / BYTES_PER_GB as f64),
            limits: limits.clone(),
            percentages: UsagePercentages {
                hour_requests: round2(percentages.hour_requests),
                day_requests: round2(percentages.day_requests),
                hour_bandwidth: round2(percentages.hour_bandwidth),
                day_bandwidth: round2(percentages.day_bandwidth),
            },
            warnings,
            warning_messages,
            health,
            paused_for_secs: paused_for.map(|d| d.as_secs()),
        }
    }
}
