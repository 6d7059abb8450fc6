//! Wire types for the listing provider.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One record from a provider collection, kept as raw JSON.
///
/// Field mapping belongs to the persistence side; the sync core only needs
/// the key, the visibility flag, the modification time and the expanded
/// child collections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Value);

impl Record {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Natural key from `field`. Numeric keys are rendered as strings.
    #[must_use]
    pub fn key(&self, field: &str) -> Option<String> {
        match self.get(field)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Boolean flag from `field`, if present and boolean.
    #[must_use]
    pub fn flag(&self, field: &str) -> Option<bool> {
        self.get(field).and_then(Value::as_bool)
    }

    /// `MlgCanView`: whether the feed allows the listing to be shown.
    #[must_use]
    pub fn can_view(&self) -> bool {
        self.flag("MlgCanView").unwrap_or(false)
    }

    /// Timestamp from `field`.
    ///
    /// Accepts RFC 3339 and the catalog's `YYYY-MM-DD[ HH:MM:SS[.f]]` forms
    /// (read as UTC).
    #[must_use]
    pub fn timestamp(&self, field: &str) -> Option<DateTime<Utc>> {
        parse_timestamp(self.get(field)?.as_str()?)
    }

    #[must_use]
    pub fn modification_timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp("ModificationTimestamp")
    }

    /// Expanded child collections named in `expand` (comma separated) that
    /// are present as arrays on this record.
    #[must_use]
    pub fn child_collections<'a>(&'a self, expand: &'a str) -> Vec<(&'a str, &'a [Value])> {
        expand
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .filter_map(|name| {
                self.get(name)
                    .and_then(Value::as_array)
                    .map(|items| (name, items.as_slice()))
            })
            .collect()
    }

    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    #[must_use]
    pub fn into_value(self) -> Value {
        self.0
    }
}

impl From<Value> for Record {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(ts.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ts| ts.and_utc())
}

/// One page of an OData collection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ODataPage {
    #[serde(default)]
    pub value: Vec<Record>,

    /// Absolute URL of the next page, carrying the original query.
    #[serde(rename = "@odata.nextLink", default)]
    pub next_link: Option<String>,

    #[serde(rename = "@odata.count", default)]
    pub count: Option<u64>,
}
