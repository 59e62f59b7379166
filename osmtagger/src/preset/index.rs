//! Flat tag-pattern index over the preset tree.
//!
//! Each entry maps an item's defining tags to its [`ItemPath`]. Entries keep
//! catalog order so subset matches come back in the order presets appear in
//! the document.

use std::collections::HashMap;

use tracing::debug;

use super::model::{ItemPath, TagMap};

/// `building=*` values that resolve to the Building preset.
pub const BUILDING_ALIAS_VALUES: &[&str] = &[
    "allotment_house",
    "bakehouse",
    "barn",
    "basilica",
    "boathouse",
    "bunker",
    "cabin",
    "carport",
    "cathedral",
    "chapel",
    "church",
    "college",
    "commercial",
    "construction",
    "cowshed",
    "digester",
    "farm_auxiliary",
    "fire_station",
    "garage",
    "garages",
    "gasometer",
    "gatehouse",
    "grandstand",
    "greenhouse",
    "hangar",
    "hospital",
    "industrial",
    "kindergarten",
    "kiosk",
    "manufacture",
    "monastery",
    "mosque",
    "office",
    "pavilion",
    "parking",
    "public",
    "retail",
    "riding_hall",
    "roof",
    "ruins",
    "school",
    "service",
    "shed",
    "silo",
    "sports_centre",
    "sports_hall",
    "stable",
    "storage_tank",
    "sty",
    "supermarket",
    "synagogue",
    "temple",
    "tent",
    "toilets",
    "train_station",
    "transformer_tower",
    "transportation",
    "university",
    "warehouse",
    "yes",
];

/// `entrance=*` values that resolve to the Entrance preset.
pub const ENTRANCE_ALIAS_VALUES: &[&str] = &[
    "main",
    "service",
    "shop",
    "exit",
    "emergency",
    "staircase",
    "home",
    "garage",
    "yes",
];

/// One index entry.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub tags: TagMap,
    pub path: ItemPath,
}

/// Ordered mapping from defining-tag dictionaries to item paths.
#[derive(Debug, Clone, Default)]
pub struct TagPatternIndex {
    entries: Vec<IndexEntry>,
    exact: HashMap<TagMap, usize>,
}

impl TagPatternIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry. Empty tag sets are rejected.
    ///
    /// When two items share the same defining tags both stay in the ordered
    /// list, but the exact lookup keeps pointing at the first.
    pub fn insert(&mut self, tags: TagMap, path: ItemPath) -> bool {
        if tags.is_empty() {
            return false;
        }
        let position = self.entries.len();
        if let Some(&first) = self.exact.get(&tags) {
            debug!(
                tags = ?tags,
                kept = %self.entries[first].path,
                shadowed = %path,
                "Duplicate defining tags, first item wins exact lookup"
            );
        } else {
            self.exact.insert(tags.clone(), position);
        }
        self.entries.push(IndexEntry { tags, path });
        true
    }

    /// Adds an alias entry unless some item already claims the same tags.
    pub fn insert_alias(&mut self, tags: TagMap, path: ItemPath) -> bool {
        if self.exact.contains_key(&tags) {
            return false;
        }
        self.insert(tags, path)
    }

    /// The item whose defining tags equal `tags` exactly.
    pub fn exact(&self, tags: &TagMap) -> Option<&ItemPath> {
        self.exact.get(tags).map(|&i| &self.entries[i].path)
    }

    /// Every entry whose defining tags are a subset of `tags`, in catalog order.
    pub fn subset_matches<'a>(&'a self, tags: &'a TagMap) -> impl Iterator<Item = &'a ItemPath> + 'a {
        self.entries
            .iter()
            .filter(move |entry| is_subset(&entry.tags, tags))
            .map(|entry| &entry.path)
    }

    /// All entries in catalog order.
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Whether every pair of `pattern` appears in `tags` with the same value.
pub fn is_subset(pattern: &TagMap, tags: &TagMap) -> bool {
    pattern
        .iter()
        .all(|(key, value)| tags.get(key) == Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> TagMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_empty_tags_not_indexed() {
        let mut index = TagPatternIndex::new();
        assert!(!index.insert(TagMap::new(), ItemPath::in_category("C", "I")));
        assert!(index.is_empty());
    }

    #[test]
    fn test_exact_and_subset() {
        let mut index = TagPatternIndex::new();
        let cafe = ItemPath::in_category("Food", "Cafe");
        let amenity = ItemPath::in_category("Food", "Any amenity");
        index.insert(tags(&[("amenity", "cafe")]), cafe.clone());
        index.insert(tags(&[("amenity", "cafe"), ("cuisine", "coffee_shop")]), amenity);

        assert_eq!(index.exact(&tags(&[("amenity", "cafe")])), Some(&cafe));

        let query = tags(&[("amenity", "cafe"), ("name", "Joe's")]);
        let matches: Vec<_> = index.subset_matches(&query).collect();
        assert_eq!(matches, vec![&cafe]);
    }

    #[test]
    fn test_duplicate_keeps_first_for_exact() {
        let mut index = TagPatternIndex::new();
        let first = ItemPath::in_category("A", "One");
        let second = ItemPath::in_category("B", "Two");
        index.insert(tags(&[("shop", "bakery")]), first.clone());
        index.insert(tags(&[("shop", "bakery")]), second);
        assert_eq!(index.len(), 2);
        assert_eq!(index.exact(&tags(&[("shop", "bakery")])), Some(&first));
    }

    #[test]
    fn test_alias_does_not_override_item() {
        let mut index = TagPatternIndex::new();
        let hut = ItemPath::in_category("Man Made", "Hut");
        index.insert(tags(&[("building", "cabin")]), hut.clone());
        let building = ItemPath::in_group("Man Made", "Man Made", "Building");

        assert!(!index.insert_alias(tags(&[("building", "cabin")]), building.clone()));
        assert!(index.insert_alias(tags(&[("building", "yes")]), building.clone()));
        assert_eq!(index.exact(&tags(&[("building", "cabin")])), Some(&hut));
        assert_eq!(index.exact(&tags(&[("building", "yes")])), Some(&building));
    }
}
