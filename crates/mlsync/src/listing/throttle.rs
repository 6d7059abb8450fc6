//! Classification of provider throttle responses.
//!
//! The provider signals throttling with HTTP 429 and a free-text message.
//! Which limit was hit is inferred from the wording, on a best-effort
//! basis: anything that does not match falls back to exponential backoff.

use std::time::Duration;

use backon::BackoffBuilder;
use serde_json::Value;

use crate::retry::RetryConfig;

/// HTTP status the provider uses for throttling.
pub const THROTTLE_STATUS: u16 = 429;

/// Retries allowed for one request before giving up.
pub const MAX_THROTTLE_RETRIES: u32 = 5;

/// Provider hour window plus buffer, waited out after a classified throttle.
pub const WINDOW_RESET_WAIT: Duration = Duration::from_secs(65 * 60);

/// First delay of the unclassified backoff schedule.
pub const UNCLASSIFIED_MIN_DELAY: Duration = Duration::from_secs(60);

/// Cap of the unclassified backoff schedule.
pub const UNCLASSIFIED_MAX_DELAY: Duration = Duration::from_secs(60 * 60);

/// Which limit the provider most likely enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleKind {
    Bandwidth,
    RequestCount,
    Unclassified,
}

impl ThrottleKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ThrottleKind::Bandwidth => "bandwidth",
            ThrottleKind::RequestCount => "request_count",
            ThrottleKind::Unclassified => "unclassified",
        }
    }
}

impl std::fmt::Display for ThrottleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pull the human-readable message out of a throttle body.
///
/// Looks at `error.details[0].message`, then `error.message`, then falls
/// back to the raw text.
#[must_use]
pub fn extract_message(body: &str) -> String {
    let Ok(json) = serde_json::from_str::<Value>(body) else {
        return body.trim().to_string();
    };

    let error = json.get("error");
    let detail = error
        .and_then(|e| e.get("details"))
        .and_then(|d| d.get(0))
        .and_then(|d| d.get("message"))
        .and_then(Value::as_str);
    let message = error.and_then(|e| e.get("message")).and_then(Value::as_str);

    detail
        .or(message)
        .map(str::to_string)
        .unwrap_or_else(|| body.trim().to_string())
}

/// Classify a throttle message by its wording.
#[must_use]
pub fn classify(message: &str) -> ThrottleKind {
    if message.contains("MB") || message.contains("GB") || message.contains("downloaded") {
        ThrottleKind::Bandwidth
    } else if message.contains("requests") {
        ThrottleKind::RequestCount
    } else {
        ThrottleKind::Unclassified
    }
}

fn unclassified_schedule() -> RetryConfig {
    RetryConfig::new(
        UNCLASSIFIED_MIN_DELAY,
        UNCLASSIFIED_MAX_DELAY,
        MAX_THROTTLE_RETRIES as usize,
    )
    .with_jitter(false)
}

/// How long to wait before retry number `retry` (zero-based).
#[must_use]
pub fn wait_for(kind: ThrottleKind, retry: u32) -> Duration {
    match kind {
        ThrottleKind::Bandwidth | ThrottleKind::RequestCount => WINDOW_RESET_WAIT,
        ThrottleKind::Unclassified => unclassified_schedule()
            .into_backoff()
            .build()
            .nth(retry as usize)
            .unwrap_or(UNCLASSIFIED_MAX_DELAY),
    }
}
