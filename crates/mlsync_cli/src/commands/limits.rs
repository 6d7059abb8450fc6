use clap::ValueEnum;
use mlsync::quota::{LimitConfig, QuotaSnapshot, RateGovernor, provider_limits};
use serde::Serialize;

use crate::config::Config;

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Display as a formatted table (default)
    #[default]
    Table,
    /// Display as JSON
    Json,
}

impl OutputFormat {
    pub(crate) fn is_json(self) -> bool {
        matches!(self, OutputFormat::Json)
    }
}

/// Print a serializable value as pretty JSON.
pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// One governed dimension next to the provider's published thresholds.
#[derive(Debug, Clone, Serialize, tabled::Tabled)]
pub(crate) struct LimitDisplay {
    #[tabled(rename = "Window")]
    pub window: String,
    #[tabled(rename = "Configured")]
    pub configured: u64,
    #[tabled(rename = "Used")]
    pub used: String,
    #[tabled(rename = "Provider warning")]
    pub warning: u64,
    #[tabled(rename = "Provider suspension")]
    pub suspension: u64,
    #[tabled(rename = "Headroom")]
    pub headroom: String,
}

impl LimitDisplay {
    fn new(window: &str, configured: u64, used: String, warning: u64, suspension: u64) -> Self {
        let headroom = if configured > warning {
            "over warning".to_string()
        } else {
            format!("{:.0}% of warning", configured as f64 * 100.0 / warning.max(1) as f64)
        };
        Self {
            window: window.to_string(),
            configured,
            used,
            warning,
            suspension,
            headroom,
        }
    }
}

/// Every governed window, in order of increasing duration.
pub(crate) fn limits_to_display(limits: &LimitConfig, snapshot: &QuotaSnapshot) -> Vec<LimitDisplay> {
    use provider_limits::*;

    vec![
        LimitDisplay::new(
            "requests/second",
            u64::from(limits.max_req_per_second),
            snapshot.requests_last_second.to_string(),
            u64::from(WARNING_REQ_PER_SECOND),
            u64::from(SUSPENSION_REQ_PER_SECOND),
        ),
        LimitDisplay::new(
            "requests/hour",
            u64::from(limits.max_req_per_hour),
            snapshot.requests_last_hour.to_string(),
            u64::from(WARNING_REQ_PER_HOUR),
            u64::from(SUSPENSION_REQ_PER_HOUR),
        ),
        LimitDisplay::new(
            "requests/24h",
            u64::from(limits.max_req_per_24h),
            snapshot.requests_last_24h.to_string(),
            u64::from(WARNING_REQ_PER_24H),
            u64::from(SUSPENSION_REQ_PER_24H),
        ),
        LimitDisplay::new(
            "MB/hour",
            limits.max_mb_per_hour,
            format!("{:.2}", snapshot.mb_last_hour),
            WARNING_MB_PER_HOUR,
            SUSPENSION_MB_PER_HOUR,
        ),
        LimitDisplay::new(
            "GB/24h",
            limits.max_gb_per_24h,
            format!("{:.2}", snapshot.gb_last_24h),
            WARNING_GB_PER_24H,
            SUSPENSION_GB_PER_24H,
        ),
    ]
}

/// Handle the limits command.
///
/// Usage counters are per process, so outside a sync they read zero; the
/// useful part is how the configured budget compares with the provider.
pub(crate) fn handle_limits(
    output: OutputFormat,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let snapshot = RateGovernor::new(config.limits.clone()).snapshot();

    match output {
        OutputFormat::Table => {
            let mut table = tabled::Table::new(limits_to_display(&config.limits, &snapshot));
            table.with(tabled::settings::Style::rounded());
            println!("{}", table);
            println!(
                "Minimum delay between requests: {} ms",
                config.limits.min_delay_between_requests_ms
            );
            if let Some(dimension) = config.limits.exceeds_provider_warning() {
                println!("Warning: configured {} limit exceeds the provider's warning threshold", dimension);
            }
        }
        OutputFormat::Json => print_json(&snapshot)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_format_default_is_table() {
        assert!(matches!(OutputFormat::default(), OutputFormat::Table));
        assert!(OutputFormat::Json.is_json());
    }

    #[tokio::test]
    async fn default_limits_stay_under_every_warning() {
        let limits = LimitConfig::default();
        let snapshot = RateGovernor::new(limits.clone()).snapshot();
        let rows = limits_to_display(&limits, &snapshot);

        assert_eq!(rows.len(), 5);
        assert!(rows.iter().all(|r| r.configured <= r.warning));
        assert!(rows.iter().all(|r| r.used == "0" || r.used == "0.00"));
    }

    #[test]
    fn limit_over_warning_is_flagged() {
        let row = LimitDisplay::new("requests/hour", 8_000, "0".to_string(), 7_200, 18_000);
        assert_eq!(row.headroom, "over warning");

        let row = LimitDisplay::new("requests/hour", 3_600, "0".to_string(), 7_200, 18_000);
        assert_eq!(row.headroom, "50% of warning");
    }
}
