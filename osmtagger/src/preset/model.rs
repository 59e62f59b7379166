//! Preset catalog data types.
//!
//! The catalog mirrors the JOSM preset tree: categories contain groups and
//! items, groups contain items, and items carry an ordered list of
//! [`FieldElement`]s. Chunks are reusable element sequences referenced by id.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

/// A tag dictionary with deterministic ordering.
pub type TagMap = BTreeMap<String, String>;

/// Geometric kind of an OSM feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureKind {
    /// A point.
    Node,
    /// An open line.
    Way,
    /// A line whose first and last node are the same.
    #[serde(rename = "closedway")]
    ClosedWay,
    /// A multipolygon relation.
    Multipolygon,
}

impl FeatureKind {
    /// Parses the JOSM spelling used in preset `type` attributes.
    pub fn from_preset_name(name: &str) -> Option<Self> {
        match name.trim() {
            "node" => Some(Self::Node),
            "way" => Some(Self::Way),
            "closedway" => Some(Self::ClosedWay),
            "multipolygon" => Some(Self::Multipolygon),
            _ => None,
        }
    }

    /// Parses a comma-separated `type` attribute, ignoring unknown names.
    pub fn parse_list(list: &str) -> Vec<Self> {
        list.split(',').filter_map(Self::from_preset_name).collect()
    }

    /// The JOSM spelling of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Way => "way",
            Self::ClosedWay => "closedway",
            Self::Multipolygon => "multipolygon",
        }
    }

    /// Whether this kind describes an area.
    pub fn is_area(&self) -> bool {
        matches!(self, Self::ClosedWay | Self::Multipolygon)
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One field descriptor of a preset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldElement {
    /// Fixed key/value pair.
    Key { key: String, value: String },
    /// Free text bound to a key.
    Text { key: String, label: String },
    /// Single choice with an optional default value.
    Combo {
        key: String,
        values: Vec<String>,
        default: Option<String>,
    },
    /// Boolean checkbox; `value_on` overrides the usual `yes`.
    Check {
        key: String,
        label: Option<String>,
        value_on: Option<String>,
    },
    /// Multiple choice.
    MultiSelect {
        key: String,
        values: Vec<String>,
        label: String,
    },
    /// Wiki page link.
    Link { wiki: String },
    /// Static label.
    Label { text: String },
    /// Reference to a chunk by id.
    ChunkRef { id: String },
    /// Link to another preset by name.
    PresetLink { preset_name: String },
    /// Separates the item's own fields from collected preset links.
    LinkDivider,
}

impl FieldElement {
    /// The tag key this element edits, if any.
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Key { key, .. }
            | Self::Text { key, .. }
            | Self::Combo { key, .. }
            | Self::Check { key, .. }
            | Self::MultiSelect { key, .. } => Some(key),
            _ => None,
        }
    }

    /// The tag this element pins down when present on a feature.
    ///
    /// Only fixed key/value pairs and choices with a literal default count.
    pub fn defining_tag(&self) -> Option<(&str, &str)> {
        match self {
            Self::Key { key, value } => Some((key, value)),
            Self::Combo {
                key,
                default: Some(default),
                ..
            } if !default.is_empty() => Some((key, default)),
            _ => None,
        }
    }
}

/// Stable locator of a preset inside the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemPath {
    pub category: String,
    pub group: Option<String>,
    pub item: String,
}

impl ItemPath {
    /// Creates a path for an item placed directly in a category.
    pub fn in_category(category: impl Into<String>, item: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            group: None,
            item: item.into(),
        }
    }

    /// Creates a path for an item inside a group.
    pub fn in_group(
        category: impl Into<String>,
        group: impl Into<String>,
        item: impl Into<String>,
    ) -> Self {
        Self {
            category: category.into(),
            group: Some(group.into()),
            item: item.into(),
        }
    }
}

impl fmt::Display for ItemPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.group {
            Some(group) => write!(f, "{}/{}/{}", self.category, group, self.item),
            None => write!(f, "{}/{}", self.category, self.item),
        }
    }
}

/// A preset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    pub icon: Option<String>,
    pub kinds: Vec<FeatureKind>,
    pub elements: Vec<FieldElement>,
}

impl Item {
    /// Creates an item without elements.
    pub fn new(name: impl Into<String>, icon: Option<String>, kinds: Vec<FeatureKind>) -> Self {
        Self {
            name: name.into(),
            icon,
            kinds,
            elements: Vec::new(),
        }
    }

    /// Adds an element (builder style).
    pub fn with_element(mut self, element: FieldElement) -> Self {
        self.elements.push(element);
        self
    }

    /// Tags that make this preset match a feature.
    ///
    /// Later elements win when the same key appears twice.
    pub fn defining_tags(&self) -> TagMap {
        self.elements
            .iter()
            .filter_map(FieldElement::defining_tag)
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    /// Whether the preset applies to features of `kind`.
    ///
    /// A preset without declared kinds applies to everything.
    pub fn applies_to(&self, kind: FeatureKind) -> bool {
        self.kinds.is_empty() || self.kinds.contains(&kind)
    }
}

/// A named group of items inside a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    pub icon: Option<String>,
    pub items: Vec<Item>,
}

/// Top level of the preset tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub icon: Option<String>,
    pub groups: Vec<Group>,
    pub items: Vec<Item>,
}

impl Category {
    /// Iterates every item in the category with its path, in document order:
    /// direct items first, then group items.
    pub fn items_with_paths(&self) -> impl Iterator<Item = (ItemPath, &Item)> + '_ {
        let direct = self
            .items
            .iter()
            .map(move |item| (ItemPath::in_category(&self.name, &item.name), item));
        let grouped = self.groups.iter().flat_map(move |group| {
            group.items.iter().map(move |item| {
                (
                    ItemPath::in_group(&self.name, &group.name, &item.name),
                    item,
                )
            })
        });
        direct.chain(grouped)
    }
}

/// Reusable element sequences keyed by chunk id.
pub type ChunkTable = HashMap<String, Vec<FieldElement>>;

/// Normalizes an icon path into the flat icon namespace (`/` becomes `+`).
pub fn normalize_icon(icon: &str) -> String {
    icon.replace('/', "+")
}
