//! Resource types synced from the providers.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A provider collection that can be synced.
///
/// The listing resources are declared in sync order: records that others
/// reference come first.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum ResourceKind {
    /// Brokerage offices.
    #[sea_orm(string_value = "Office")]
    Office,
    /// Agents and other office members.
    #[sea_orm(string_value = "Member")]
    Member,
    /// Listings.
    #[sea_orm(string_value = "Property")]
    Property,
    /// Open-house events attached to a listing.
    #[sea_orm(string_value = "OpenHouse")]
    OpenHouse,
    /// Datasets from the statistical catalog.
    #[sea_orm(string_value = "Dataset")]
    Dataset,
}

impl ResourceKind {
    /// Listing-provider resources in dependency order.
    pub const LISTING: [ResourceKind; 4] = [
        ResourceKind::Office,
        ResourceKind::Member,
        ResourceKind::Property,
        ResourceKind::OpenHouse,
    ];

    /// Collection path relative to the provider's base URL.
    #[must_use]
    pub fn endpoint(self) -> &'static str {
        match self {
            ResourceKind::Office => "Office",
            ResourceKind::Member => "Member",
            ResourceKind::Property => "Property",
            ResourceKind::OpenHouse => "OpenHouse",
            ResourceKind::Dataset => "dataset",
        }
    }

    /// Field holding the record's natural key.
    #[must_use]
    pub fn key_field(self) -> &'static str {
        match self {
            ResourceKind::Office => "OfficeKey",
            ResourceKind::Member => "MemberKey",
            ResourceKind::Property => "ListingKey",
            ResourceKind::OpenHouse => "OpenHouseKey",
            ResourceKind::Dataset => "identifier",
        }
    }

    /// Field carrying the record's last-modified time.
    #[must_use]
    pub fn timestamp_field(self) -> &'static str {
        match self {
            ResourceKind::Dataset => "modified",
            _ => "ModificationTimestamp",
        }
    }

    /// Field flagging whether the record may be displayed. Records without
    /// such a field are always kept.
    #[must_use]
    pub fn visibility_field(self) -> Option<&'static str> {
        match self {
            ResourceKind::Dataset => None,
            _ => Some("MlgCanView"),
        }
    }

    /// Related collections expanded inline by default.
    #[must_use]
    pub fn default_expand(self) -> Option<&'static str> {
        match self {
            ResourceKind::Office | ResourceKind::Member => Some("Media"),
            ResourceKind::Property => Some("Media,Rooms,UnitTypes"),
            ResourceKind::OpenHouse | ResourceKind::Dataset => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Office => "Office",
            ResourceKind::Member => "Member",
            ResourceKind::Property => "Property",
            ResourceKind::OpenHouse => "OpenHouse",
            ResourceKind::Dataset => "Dataset",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', '_'], "").as_str() {
            "office" | "offices" => Ok(ResourceKind::Office),
            "member" | "members" => Ok(ResourceKind::Member),
            "property" | "properties" | "listing" | "listings" => Ok(ResourceKind::Property),
            "openhouse" | "openhouses" => Ok(ResourceKind::OpenHouse),
            "dataset" | "datasets" => Ok(ResourceKind::Dataset),
            _ => Err(format!("Unknown resource type: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::Iterable;

    use super::*;

    #[test]
    fn test_display_round_trips_through_from_str() {
        for kind in ResourceKind::iter() {
            assert_eq!(kind.to_string().parse::<ResourceKind>(), Ok(kind));
        }
    }

    #[test]
    fn test_from_str_accepts_plurals_and_separators() {
        assert_eq!("open-houses".parse::<ResourceKind>(), Ok(ResourceKind::OpenHouse));
        assert_eq!("open_house".parse::<ResourceKind>(), Ok(ResourceKind::OpenHouse));
        assert_eq!("Properties".parse::<ResourceKind>(), Ok(ResourceKind::Property));
        assert!("agents".parse::<ResourceKind>().is_err());
    }

    #[test]
    fn test_key_fields() {
        assert_eq!(ResourceKind::Office.key_field(), "OfficeKey");
        assert_eq!(ResourceKind::Member.key_field(), "MemberKey");
        assert_eq!(ResourceKind::Property.key_field(), "ListingKey");
        assert_eq!(ResourceKind::OpenHouse.key_field(), "OpenHouseKey");
    }

    #[test]
    fn test_default_expansions() {
        assert_eq!(ResourceKind::Member.default_expand(), Some("Media"));
        assert_eq!(
            ResourceKind::Property.default_expand(),
            Some("Media,Rooms,UnitTypes")
        );
        assert_eq!(ResourceKind::OpenHouse.default_expand(), None);
    }

    #[test]
    fn test_listing_order_puts_referenced_resources_first() {
        let order = ResourceKind::LISTING;
        let pos = |k| order.iter().position(|x| *x == k).expect("listed");
        assert!(pos(ResourceKind::Office) < pos(ResourceKind::Member));
        assert!(pos(ResourceKind::Property) < pos(ResourceKind::OpenHouse));
    }
}
