//! List type enum for the two remote lists a user keeps.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// The remote lists mirrored locally.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum ListType {
    /// Releases the user owns. One entry per physical copy (instance).
    #[sea_orm(string_value = "collection")]
    Collection,
    /// Releases the user wants. At most one entry per release.
    #[sea_orm(string_value = "wantlist")]
    Wantlist,
}

impl ListType {
    /// Every list type, in sync order.
    pub const ALL: [ListType; 2] = [ListType::Collection, ListType::Wantlist];

    /// Whether entries of this list carry an instance id.
    #[inline]
    pub fn has_instances(self) -> bool {
        matches!(self, ListType::Collection)
    }

    /// Short lowercase name, as stored.
    pub fn as_str(self) -> &'static str {
        match self {
            ListType::Collection => "collection",
            ListType::Wantlist => "wantlist",
        }
    }
}

impl std::fmt::Display for ListType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ListType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "collection" => Ok(ListType::Collection),
            "wantlist" | "wants" => Ok(ListType::Wantlist),
            _ => Err(format!("Unknown list type: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(ListType::Collection.to_string(), "collection");
        assert_eq!(ListType::Wantlist.to_string(), "wantlist");
    }

    #[test]
    fn test_from_str() {
        assert_eq!(
            "Collection".parse::<ListType>().unwrap(),
            ListType::Collection
        );
        assert_eq!("wants".parse::<ListType>().unwrap(), ListType::Wantlist);
        assert!("folders".parse::<ListType>().is_err());
    }

    #[test]
    fn test_only_collection_has_instances() {
        assert!(ListType::Collection.has_instances());
        assert!(!ListType::Wantlist.has_instances());
    }
}
