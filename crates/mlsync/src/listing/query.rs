//! OData query construction.

use chrono::{DateTime, SecondsFormat, Utc};
use url::Url;

use super::error::{ListingError, Result};

/// Filter used when no watermark exists: every record the feed lets us show.
pub const VISIBLE_FILTER: &str = "MlgCanView eq true";

/// Filter selecting records modified strictly after `watermark`.
#[must_use]
pub fn modified_since_filter(watermark: DateTime<Utc>) -> String {
    format!(
        "ModificationTimestamp gt {}",
        watermark.to_rfc3339_opts(SecondsFormat::Millis, true)
    )
}

/// Query against one provider collection.
///
/// The provider's next-page link already carries every parameter, so a
/// query is only rendered for the first page of a collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ODataQuery {
    pub endpoint: String,
    pub filter: Option<String>,
    pub expand: Option<String>,
    pub select: Option<String>,
    pub order_by: Option<String>,
    pub top: Option<u32>,
    pub skip: Option<u32>,
}

impl ODataQuery {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    #[must_use]
    pub fn expand(mut self, expand: impl Into<String>) -> Self {
        self.expand = Some(expand.into());
        self
    }

    #[must_use]
    pub fn select(mut self, select: impl Into<String>) -> Self {
        self.select = Some(select.into());
        self
    }

    #[must_use]
    pub fn order_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by = Some(order_by.into());
        self
    }

    #[must_use]
    pub fn top(mut self, top: u32) -> Self {
        self.top = Some(top);
        self
    }

    #[must_use]
    pub fn skip(mut self, skip: u32) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Render the absolute URL for this query under `base_url`.
    pub fn to_url(&self, base_url: &str) -> Result<String> {
        let base = format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            self.endpoint.trim_start_matches('/')
        );
        let mut url = Url::parse(&base)
            .map_err(|e| ListingError::config(format!("invalid base URL {}: {}", base_url, e)))?;

        {
            let mut pairs = url.query_pairs_mut();
            if let Some(filter) = &self.filter {
                pairs.append_pair("$filter", filter);
            }
            if let Some(expand) = &self.expand {
                pairs.append_pair("$expand", expand);
            }
            if let Some(select) = &self.select {
                pairs.append_pair("$select", select);
            }
            if let Some(order_by) = &self.order_by {
                pairs.append_pair("$orderby", order_by);
            }
            if let Some(top) = self.top {
                pairs.append_pair("$top", &top.to_string());
            }
            if let Some(skip) = self.skip {
                pairs.append_pair("$skip", &skip.to_string());
            }
        }

        if url.query() == Some("") {
            url.set_query(None);
        }

        Ok(url.into())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn renders_all_parameters_encoded() {
        let url = ODataQuery::new("Property")
            .filter(VISIBLE_FILTER)
            .expand("Media,Rooms")
            .top(500)
            .to_url("https://api.example.com/v2/OData/nwmls/")
            .expect("url");

        let parsed = Url::parse(&url).expect("parse");
        assert_eq!(parsed.path(), "/v2/OData/nwmls/Property");
        let pairs: Vec<(String, String)> = parsed
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("$filter".to_string(), "MlgCanView eq true".to_string()),
                ("$expand".to_string(), "Media,Rooms".to_string()),
                ("$top".to_string(), "500".to_string()),
            ]
        );
    }

    #[test]
    fn query_without_parameters_has_no_question_mark() {
        let url = ODataQuery::new("Office")
            .to_url("https://api.example.com")
            .expect("url");
        assert_eq!(url, "https://api.example.com/Office");
    }

    #[test]
    fn invalid_base_url_is_a_config_error() {
        let err = ODataQuery::new("Office")
            .to_url("not a url")
            .expect_err("should fail");
        assert!(matches!(err, ListingError::Config(_)));
    }

    #[test]
    fn modified_since_uses_millisecond_utc_timestamps() {
        let watermark = Utc.with_ymd_and_hms(2025, 3, 1, 12, 30, 0).unwrap();
        assert_eq!(
            modified_since_filter(watermark),
            "ModificationTimestamp gt 2025-03-01T12:30:00.000Z"
        );
    }
}
