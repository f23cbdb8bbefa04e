//! Composite identity of a list entry.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::list_type::ListType;

/// Identity of one entry on one list.
///
/// `instance_id` tells apart several physical copies of the same release
/// inside a collection; wantlist keys never carry one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryKey {
    pub list_type: ListType,
    pub release_id: u64,
    pub instance_id: Option<u64>,
}

impl EntryKey {
    pub fn new(list_type: ListType, release_id: u64, instance_id: Option<u64>) -> Self {
        Self {
            list_type,
            release_id,
            instance_id,
        }
    }

    /// Canonical string form: `"{list}:{release}:{instance or '-'}"`.
    pub fn storage_key(&self) -> String {
        match self.instance_id {
            Some(instance) => format!("{}:{}:{}", self.list_type, self.release_id, instance),
            None => format!("{}:{}:-", self.list_type, self.release_id),
        }
    }

    /// Parse the canonical string form.
    pub fn parse(key: &str) -> Option<Self> {
        let mut parts = key.splitn(3, ':');
        let list_type = parts.next()?.parse::<ListType>().ok()?;
        let release_id = parts.next()?.parse::<u64>().ok()?;
        let instance_id = match parts.next()? {
            "-" => None,
            raw => Some(raw.parse::<u64>().ok()?),
        };
        Some(Self::new(list_type, release_id, instance_id))
    }
}

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.storage_key())
    }
}

impl FromStr for EntryKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid entry key: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_key_format() {
        let copy = EntryKey::new(ListType::Collection, 123, Some(456));
        assert_eq!(copy.storage_key(), "collection:123:456");

        let want = EntryKey::new(ListType::Wantlist, 123, None);
        assert_eq!(want.storage_key(), "wantlist:123:-");
    }

    #[test]
    fn test_parse_accepts_canonical_form() {
        let key: EntryKey = "collection:123:456".parse().unwrap();
        assert_eq!(key, EntryKey::new(ListType::Collection, 123, Some(456)));
        assert_eq!(
            EntryKey::parse("wantlist:9:-"),
            Some(EntryKey::new(ListType::Wantlist, 9, None))
        );
    }

    #[test]
    fn test_parse_rejects_malformed_keys() {
        assert_eq!(EntryKey::parse("collection:abc:-"), None);
        assert_eq!(EntryKey::parse("shelf:1:-"), None);
        assert_eq!(EntryKey::parse("collection:1"), None);
        assert_eq!(EntryKey::parse("collection:1:x"), None);
    }

    #[test]
    fn test_copies_of_same_release_are_distinct() {
        let a = EntryKey::new(ListType::Collection, 1, Some(10));
        let b = EntryKey::new(ListType::Collection, 1, Some(11));
        assert_ne!(a, b);
        assert_ne!(a.storage_key(), b.storage_key());
    }
}
