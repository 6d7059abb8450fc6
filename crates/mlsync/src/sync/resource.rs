//! Which collections a sync run covers, and how each one is fetched.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::entity::resource_kind::ResourceKind;
use crate::listing::{ListingClient, ODataQuery, Record, RecordFilter, VISIBLE_FILTER, modified_since_filter};

/// Restrict listings to one jurisdiction.
///
/// Empty fields match everything. Comparison ignores ASCII case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LocationFilter {
    pub state_or_province: Option<String>,
    pub county_or_parish: Option<String>,
}

impl LocationFilter {
    pub fn new(state_or_province: Option<String>, county_or_parish: Option<String>) -> Self {
        Self {
            state_or_province,
            county_or_parish,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state_or_province.is_none() && self.county_or_parish.is_none()
    }

    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        field_matches(record, "StateOrProvince", self.state_or_province.as_deref())
            && field_matches(record, "CountyOrParish", self.county_or_parish.as_deref())
    }

    /// The filter as a page predicate, or `None` when it matches everything.
    #[must_use]
    pub fn into_record_filter(self) -> Option<RecordFilter> {
        if self.is_empty() {
            return None;
        }
        Some(Arc::new(move |record: &Record| self.matches(record)))
    }
}

fn field_matches(record: &Record, field: &str, expected: Option<&str>) -> bool {
    match expected {
        None => true,
        Some(expected) => record
            .get(field)
            .and_then(|v| v.as_str())
            .is_some_and(|actual| actual.eq_ignore_ascii_case(expected)),
    }
}

/// A record may only be stored when its parent already is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentRequirement {
    pub kind: ResourceKind,
    /// Field on the child holding the parent's natural key. Children
    /// without the field are not checked.
    pub key_field: &'static str,
}

/// One collection in a sync run.
#[derive(Clone)]
pub struct ResourceDefinition {
    pub kind: ResourceKind,
    /// Child collections requested with `$expand`.
    pub expand: Option<String>,
    /// Records failing this predicate are fetched but not reconciled.
    pub filter: Option<RecordFilter>,
    pub parent: Option<ParentRequirement>,
}

impl fmt::Debug for ResourceDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceDefinition")
            .field("kind", &self.kind)
            .field("expand", &self.expand)
            .field("filter", &self.filter.is_some())
            .field("parent", &self.parent)
            .finish()
    }
}

impl ResourceDefinition {
    /// Definition for `kind` with its default expansion.
    pub fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            expand: kind.default_expand().map(str::to_string),
            filter: None,
            parent: None,
        }
    }

    #[must_use]
    pub fn with_filter(mut self, filter: Option<RecordFilter>) -> Self {
        self.filter = filter;
        self
    }

    #[must_use]
    pub fn with_parent(mut self, parent: ParentRequirement) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Offices, members, properties and open houses, in that order.
    ///
    /// `location` narrows properties; open houses then follow because they
    /// require their property to be stored.
    pub fn standard_set(location: Option<LocationFilter>) -> Vec<Self> {
        let property_filter = location.and_then(LocationFilter::into_record_filter);
        vec![
            Self::new(ResourceKind::Office),
            Self::new(ResourceKind::Member),
            Self::new(ResourceKind::Property).with_filter(property_filter),
            Self::new(ResourceKind::OpenHouse).with_parent(ParentRequirement {
                kind: ResourceKind::Property,
                key_field: "ListingKey",
            }),
        ]
    }

    /// The standard set narrowed to `kinds`, keeping sync order.
    pub fn select(kinds: &[ResourceKind], location: Option<LocationFilter>) -> Vec<Self> {
        Self::standard_set(location)
            .into_iter()
            .filter(|def| kinds.contains(&def.kind))
            .collect()
    }

    /// First-page query: modified since `watermark` when given, otherwise
    /// every visible record.
    pub fn query(&self, client: &ListingClient, watermark: Option<DateTime<Utc>>) -> ODataQuery {
        let mut query = client.query_for(self.kind);
        query.expand = self.expand.clone();
        match watermark {
            Some(ts) => query.filter(modified_since_filter(ts)),
            None => query.filter(VISIBLE_FILTER),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn cook_county() -> LocationFilter {
        LocationFilter::new(Some("IL".to_string()), Some("Cook".to_string()))
    }

    #[test]
    fn location_filter_requires_every_set_field() {
        let filter = cook_county();
        assert!(filter.matches(&Record::new(
            json!({"StateOrProvince": "IL", "CountyOrParish": "Cook"})
        )));
        assert!(filter.matches(&Record::new(
            json!({"StateOrProvince": "il", "CountyOrParish": "COOK"})
        )));
        assert!(!filter.matches(&Record::new(
            json!({"StateOrProvince": "IL", "CountyOrParish": "DuPage"})
        )));
        assert!(!filter.matches(&Record::new(json!({"StateOrProvince": "IL"}))));

        let state_only = LocationFilter::new(Some("WI".to_string()), None);
        assert!(state_only.matches(&Record::new(json!({"StateOrProvince": "WI"}))));
    }

    #[test]
    fn empty_location_filter_becomes_no_filter() {
        assert!(LocationFilter::default().into_record_filter().is_none());
        assert!(cook_county().into_record_filter().is_some());
    }

    #[test]
    fn standard_set_is_in_dependency_order() {
        let set = ResourceDefinition::standard_set(Some(cook_county()));
        let kinds: Vec<ResourceKind> = set.iter().map(|d| d.kind).collect();
        assert_eq!(kinds, ResourceKind::LISTING.to_vec());

        assert!(set[2].filter.is_some());
        assert!(set[0].filter.is_none());
        assert_eq!(
            set[3].parent,
            Some(ParentRequirement {
                kind: ResourceKind::Property,
                key_field: "ListingKey",
            })
        );
        assert_eq!(set[2].expand.as_deref(), Some("Media,Rooms,UnitTypes"));
    }

    #[test]
    fn select_keeps_sync_order() {
        let set = ResourceDefinition::select(
            &[ResourceKind::OpenHouse, ResourceKind::Office],
            None,
        );
        let kinds: Vec<ResourceKind> = set.iter().map(|d| d.kind).collect();
        assert_eq!(kinds, vec![ResourceKind::Office, ResourceKind::OpenHouse]);
    }
}
