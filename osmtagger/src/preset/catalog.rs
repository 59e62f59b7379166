//! The immutable preset catalog.

use tracing::{debug, info};

use super::error::{CatalogError, LoadReport};
use super::index::{TagPatternIndex, BUILDING_ALIAS_VALUES, ENTRANCE_ALIAS_VALUES};
use super::model::{Category, ChunkTable, Item, ItemPath, TagMap};
use super::parser::{parse_chunks, parse_presets};

/// Parsed catalog tree, chunk table and tag index.
///
/// Built once and shared read-only behind an `Arc`.
#[derive(Debug, Default)]
pub struct PresetCatalog {
    categories: Vec<Category>,
    chunks: ChunkTable,
    index: TagPatternIndex,
    report: LoadReport,
}

impl PresetCatalog {
    /// A catalog with nothing in it.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parses a preset document and an optional separate chunk document.
    ///
    /// Chunks from the separate document replace same-named chunks from the
    /// preset document.
    pub fn from_xml(presets_xml: &str, chunks_xml: Option<&str>) -> Self {
        let parsed = parse_presets(presets_xml);
        let mut chunks = parsed.chunks;
        let mut errors = parsed.errors;

        if let Some(xml) = chunks_xml {
            let (extra, extra_errors) = parse_chunks(xml);
            chunks.extend(extra);
            errors.extend(extra_errors);
        }

        Self::from_parts(parsed.categories, chunks, errors)
    }

    /// Builds the tag index over an already parsed tree.
    pub fn from_parts(
        categories: Vec<Category>,
        chunks: ChunkTable,
        errors: Vec<CatalogError>,
    ) -> Self {
        let mut catalog = Self {
            categories,
            chunks,
            index: TagPatternIndex::new(),
            report: LoadReport::default(),
        };

        let mut index = TagPatternIndex::new();
        let mut items = 0;
        for category in &catalog.categories {
            for (path, item) in category.items_with_paths() {
                items += 1;
                index.insert(item.defining_tags(), path);
            }
        }

        catalog.index = index;
        catalog.register_aliases();

        catalog.report = LoadReport {
            items,
            indexed: catalog.index.len(),
            chunks: catalog.chunks.len(),
            errors,
        };
        info!(
            items = catalog.report.items,
            patterns = catalog.report.indexed,
            chunks = catalog.report.chunks,
            errors = catalog.report.errors.len(),
            "Preset catalog built"
        );
        catalog
    }

    /// Registers the Building and Entrance tag aliases.
    fn register_aliases(&mut self) {
        let aliases: [(ItemPath, &str, &[&str]); 2] = [
            (
                ItemPath::in_group("Man Made", "Man Made", "Building"),
                "building",
                BUILDING_ALIAS_VALUES,
            ),
            (
                ItemPath::in_group("Man Made", "Man Made", "Entrance"),
                "entrance",
                ENTRANCE_ALIAS_VALUES,
            ),
        ];

        for (path, key, values) in aliases {
            if self.resolve_item(&path).is_none() {
                debug!(item = %path, "Alias target missing, skipping");
                continue;
            }
            let mut added = 0;
            for value in values {
                let tags = TagMap::from([(key.to_string(), value.to_string())]);
                if self.index.insert_alias(tags, path.clone()) {
                    added += 1;
                }
            }
            debug!(item = %path, added, "Registered tag aliases");
        }
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn chunks(&self) -> &ChunkTable {
        &self.chunks
    }

    pub fn index(&self) -> &TagPatternIndex {
        &self.index
    }

    /// Summary of how loading went.
    pub fn report(&self) -> &LoadReport {
        &self.report
    }

    /// Every item with its path, in catalog order.
    pub fn items(&self) -> impl Iterator<Item = (ItemPath, &Item)> + '_ {
        self.categories.iter().flat_map(Category::items_with_paths)
    }

    /// Records a problem found after parsing.
    pub(crate) fn push_error(&mut self, error: CatalogError) {
        self.report.errors.push(error);
    }
}
