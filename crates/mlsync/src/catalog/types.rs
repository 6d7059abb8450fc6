//! Catalog wire types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::listing::Record;

/// Top-level catalog document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogResponse {
    #[serde(default)]
    pub dataset: Vec<CatalogDataset>,
}

/// One dataset entry from the catalog.
///
/// Only the fields the sync needs are typed; everything else is kept in
/// `extra` and written back out unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogDataset {
    pub identifier: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<String>,
    #[serde(rename = "c_vintage", default, skip_serializing_if = "Option::is_none")]
    pub vintage: Option<i64>,
    #[serde(rename = "c_isAvailable", default, skip_serializing_if = "Option::is_none")]
    pub is_available: Option<bool>,
    #[serde(rename = "c_geographyLink", default, skip_serializing_if = "Option::is_none")]
    pub geography_link: Option<String>,
    #[serde(rename = "c_variablesLink", default, skip_serializing_if = "Option::is_none")]
    pub variables_link: Option<String>,
    #[serde(rename = "c_tagsLink", default, skip_serializing_if = "Option::is_none")]
    pub tags_link: Option<String>,
    #[serde(rename = "c_examplesLink", default, skip_serializing_if = "Option::is_none")]
    pub examples_link: Option<String>,
    #[serde(rename = "c_groupsLink", default, skip_serializing_if = "Option::is_none")]
    pub groups_link: Option<String>,
    #[serde(rename = "c_sorts_url", default, skip_serializing_if = "Option::is_none")]
    pub sorts_link: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CatalogDataset {
    /// Datasets are available unless the catalog says otherwise.
    #[must_use]
    pub fn available(&self) -> bool {
        self.is_available != Some(false)
    }

    /// The dataset as a storable record, with `metadata` embedded when given.
    pub fn to_record(&self, metadata: Option<&CatalogMetadata>) -> serde_json::Result<Record> {
        let mut value = serde_json::to_value(self)?;
        if let (Some(metadata), Some(obj)) = (metadata, value.as_object_mut()) {
            obj.insert("metadata".to_string(), serde_json::to_value(metadata)?);
        }
        Ok(Record::new(value))
    }
}

/// Linked metadata documents for one dataset. A part is `None` when the
/// link is missing or could not be fetched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CatalogMetadata {
    pub geography: Option<Value>,
    pub variables: Option<Value>,
    pub tags: Option<Value>,
    pub examples: Option<Value>,
    pub groups: Option<Value>,
    pub sorts: Option<Value>,
}

impl CatalogMetadata {
    /// Number of parts fetched, out of six.
    #[must_use]
    pub fn fetched_count(&self) -> usize {
        [
            &self.geography,
            &self.variables,
            &self.tags,
            &self.examples,
            &self.groups,
            &self.sorts,
        ]
        .iter()
        .filter(|part| part.is_some())
        .count()
    }
}
