//! Error types for listing API operations.

use thiserror::Error;

use crate::http::HttpError;

/// Errors that can occur when talking to the listing provider.
#[derive(Debug, Error)]
pub enum ListingError {
    /// Transport failure (timeout, connection reset, DNS).
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    /// Response body was not the JSON we expected.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Provider answered with a non-2xx, non-throttle status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The provider kept throttling after every retry was used.
    ///
    /// This is the only error that trips the emergency stop.
    #[error("Rate limit exceeded after {attempts} retries: {message}")]
    RateLimitExhausted { attempts: u32, message: String },

    /// Invalid configuration (missing token, malformed URL).
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl ListingError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    #[must_use]
    pub fn is_rate_limit_exhausted(&self) -> bool {
        matches!(self, Self::RateLimitExhausted { .. })
    }
}

/// Extract a short, single-line message from an error.
pub fn short_error_message(err: &ListingError) -> String {
    match err {
        ListingError::Api { status, message } => {
            let first = message.lines().next().unwrap_or(message);
            format!("{} ({})", first, status)
        }
        other => other
            .to_string()
            .lines()
            .next()
            .unwrap_or_default()
            .to_string(),
    }
}

/// Result type alias for listing operations.
pub type Result<T> = std::result::Result<T, ListingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausted_error_message_includes_attempts() {
        let err = ListingError::RateLimitExhausted {
            attempts: 5,
            message: "You have exceeded 4096 MB".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Rate limit exceeded after 5 retries: You have exceeded 4096 MB"
        );
        assert!(err.is_rate_limit_exhausted());
    }

    #[test]
    fn api_errors_are_not_exhaustion() {
        let err = ListingError::Api {
            status: 500,
            message: "boom".to_string(),
        };
        assert!(!err.is_rate_limit_exhausted());
    }

    #[test]
    fn short_error_message_uses_first_line() {
        let err = ListingError::Api {
            status: 400,
            message: "Invalid $filter\nat position 12".to_string(),
        };
        assert_eq!(short_error_message(&err), "Invalid $filter (400)");

        let err = ListingError::config("missing token");
        assert_eq!(
            short_error_message(&err),
            "Invalid configuration: missing token"
        );
    }
}
