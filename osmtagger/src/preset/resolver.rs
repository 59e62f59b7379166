//! Preset lookup and field expansion.

use std::collections::HashSet;

use tracing::warn;

use super::catalog::PresetCatalog;
use super::model::{ChunkTable, FeatureKind, FieldElement, Item, ItemPath, TagMap};

/// Maximum chunk nesting depth followed during expansion.
pub const MAX_CHUNK_DEPTH: usize = 20;

/// Non-fatal problems found while expanding chunk references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpansionWarning {
    /// A chunk referenced itself, directly or through other chunks.
    /// `stack` lists the chunks being expanded when the cycle was found.
    Cycle { chunk: String, stack: Vec<String> },
    /// Nesting exceeded [`MAX_CHUNK_DEPTH`]; the reference was dropped.
    DepthLimit { chunk: String },
}

/// Result of [`expand_elements`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Expansion {
    /// Expanded elements, followed by a divider and the preset links if any.
    pub elements: Vec<FieldElement>,
    pub warnings: Vec<ExpansionWarning>,
}

impl Expansion {
    /// Names of the linked presets, in order.
    pub fn preset_links(&self) -> Vec<&str> {
        self.elements
            .iter()
            .filter_map(|e| match e {
                FieldElement::PresetLink { preset_name } => Some(preset_name.as_str()),
                _ => None,
            })
            .collect()
    }
}

struct ExpandState<'a> {
    chunks: &'a ChunkTable,
    stack: Vec<String>,
    out: Vec<FieldElement>,
    links: Vec<String>,
    warnings: Vec<ExpansionWarning>,
}

impl ExpandState<'_> {
    fn walk(&mut self, elements: &[FieldElement]) {
        for element in elements {
            match element {
                FieldElement::LinkDivider => {}
                FieldElement::PresetLink { preset_name } => self.links.push(preset_name.clone()),
                FieldElement::ChunkRef { id } => self.enter_chunk(id),
                other => self.out.push(other.clone()),
            }
        }
    }

    fn enter_chunk(&mut self, id: &str) {
        if self.stack.iter().any(|open| open == id) {
            warn!(chunk = id, stack = ?self.stack, "Chunk reference cycle, dropping reference");
            self.warnings.push(ExpansionWarning::Cycle {
                chunk: id.to_string(),
                stack: self.stack.clone(),
            });
            return;
        }
        if self.stack.len() >= MAX_CHUNK_DEPTH {
            warn!(chunk = id, "Chunk nesting too deep, dropping reference");
            self.warnings.push(ExpansionWarning::DepthLimit {
                chunk: id.to_string(),
            });
            return;
        }
        // Unknown chunks vanish silently
        let Some(chunk) = self.chunks.get(id) else {
            return;
        };

        self.stack.push(id.to_string());
        self.walk(chunk);
        self.stack.pop();
    }
}

/// Replaces chunk references with chunk contents and moves preset links to
/// the end, behind a [`FieldElement::LinkDivider`].
///
/// Links are deduplicated by preset name, first occurrence wins. Expanding
/// an already expanded list returns it unchanged.
pub fn expand_elements(elements: &[FieldElement], chunks: &ChunkTable) -> Expansion {
    let mut state = ExpandState {
        chunks,
        stack: Vec::new(),
        out: Vec::with_capacity(elements.len()),
        links: Vec::new(),
        warnings: Vec::new(),
    };
    state.walk(elements);

    let mut seen = HashSet::new();
    state.links.retain(|name| seen.insert(name.clone()));

    let mut elements = state.out;
    if !state.links.is_empty() {
        elements.push(FieldElement::LinkDivider);
        elements.extend(
            state
                .links
                .into_iter()
                .map(|preset_name| FieldElement::PresetLink { preset_name }),
        );
    }

    Expansion {
        elements,
        warnings: state.warnings,
    }
}

impl PresetCatalog {
    /// Presets matching a feature's tags.
    ///
    /// An exact match on defining tags wins outright. Otherwise every preset
    /// whose defining tags are contained in `tags` is returned in catalog order.
    pub fn resolve_paths_for_tags(&self, tags: &TagMap) -> Vec<ItemPath> {
        if let Some(path) = self.index().exact(tags) {
            return vec![path.clone()];
        }
        self.index().subset_matches(tags).cloned().collect()
    }

    /// Like [`resolve_paths_for_tags`](Self::resolve_paths_for_tags), limited
    /// to presets usable for `kind`. Closed lines also accept area presets.
    pub fn items_for_kind(&self, tags: &TagMap, kind: FeatureKind) -> Vec<ItemPath> {
        self.resolve_paths_for_tags(tags)
            .into_iter()
            .filter(|path| {
                self.resolve_item(path).is_some_and(|item| {
                    item.applies_to(kind)
                        || (kind == FeatureKind::ClosedWay
                            && item.applies_to(FeatureKind::Multipolygon))
                })
            })
            .collect()
    }

    /// Looks up an item by path.
    pub fn resolve_item(&self, path: &ItemPath) -> Option<&Item> {
        let category = self.categories().iter().find(|c| c.name == path.category)?;
        let items = match &path.group {
            Some(group) => &category.groups.iter().find(|g| &g.name == group)?.items,
            None => &category.items,
        };
        items.iter().find(|item| item.name == path.item)
    }

    /// Looks up an item by name; the first match in catalog order wins.
    pub fn resolve_item_by_name(&self, name: &str) -> Option<(ItemPath, &Item)> {
        self.items().find(|(_, item)| item.name == name)
    }

    /// Expands an item's elements against this catalog's chunk table.
    pub fn expand_elements(&self, elements: &[FieldElement]) -> Expansion {
        expand_elements(elements, self.chunks())
    }

    /// Looks up an item and expands its elements.
    pub fn expand_item(&self, path: &ItemPath) -> Option<Expansion> {
        self.resolve_item(path)
            .map(|item| self.expand_elements(&item.elements))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(text: &str) -> FieldElement {
        FieldElement::Label { text: text.into() }
    }

    fn chunk_ref(id: &str) -> FieldElement {
        FieldElement::ChunkRef { id: id.into() }
    }

    fn link(name: &str) -> FieldElement {
        FieldElement::PresetLink {
            preset_name: name.into(),
        }
    }

    #[test]
    fn test_expand_replaces_chunk_in_place() {
        let chunks = ChunkTable::from([("c".to_string(), vec![label("b1"), label("b2")])]);
        let expansion = expand_elements(&[label("a"), chunk_ref("c"), label("z")], &chunks);
        assert_eq!(
            expansion.elements,
            vec![label("a"), label("b1"), label("b2"), label("z")]
        );
        assert!(expansion.warnings.is_empty());
    }

    #[test]
    fn test_unknown_chunk_dropped_silently() {
        let expansion = expand_elements(&[chunk_ref("missing"), label("a")], &ChunkTable::new());
        assert_eq!(expansion.elements, vec![label("a")]);
        assert!(expansion.warnings.is_empty());
    }

    #[test]
    fn test_links_deduplicated_behind_divider() {
        let chunks = ChunkTable::from([("c".to_string(), vec![link("Cafe"), label("c")])]);
        let expansion = expand_elements(
            &[link("Cafe"), label("a"), chunk_ref("c"), link("Bakery")],
            &chunks,
        );
        assert_eq!(
            expansion.elements,
            vec![
                label("a"),
                label("c"),
                FieldElement::LinkDivider,
                link("Cafe"),
                link("Bakery"),
            ]
        );
        assert_eq!(expansion.preset_links(), vec!["Cafe", "Bakery"]);
    }

    #[test]
    fn test_expansion_is_idempotent() {
        let chunks = ChunkTable::from([
            ("a".to_string(), vec![label("x"), chunk_ref("b"), link("L1")]),
            ("b".to_string(), vec![label("y"), link("L2")]),
        ]);
        let once = expand_elements(&[chunk_ref("a"), link("L1")], &chunks);
        let twice = expand_elements(&once.elements, &chunks);
        assert_eq!(once.elements, twice.elements);
    }

    #[test]
    fn test_mutual_chunk_cycle_terminates() {
        let chunks = ChunkTable::from([
            ("a".to_string(), vec![label("in a"), chunk_ref("b")]),
            ("b".to_string(), vec![label("in b"), chunk_ref("a")]),
        ]);
        let expansion = expand_elements(&[chunk_ref("a")], &chunks);
        assert_eq!(expansion.elements, vec![label("in a"), label("in b")]);
        assert_eq!(
            expansion.warnings,
            vec![ExpansionWarning::Cycle {
                chunk: "a".into(),
                stack: vec!["a".into(), "b".into()],
            }]
        );
    }

    #[test]
    fn test_depth_limit() {
        let mut chunks = ChunkTable::new();
        for i in 0..=MAX_CHUNK_DEPTH {
            chunks.insert(format!("c{i}"), vec![chunk_ref(&format!("c{}", i + 1))]);
        }
        chunks.insert(format!("c{}", MAX_CHUNK_DEPTH + 1), vec![label("deep")]);
        let expansion = expand_elements(&[chunk_ref("c0")], &chunks);
        assert!(expansion.elements.is_empty());
        assert!(matches!(
            expansion.warnings.as_slice(),
            [ExpansionWarning::DepthLimit { .. }]
        ));
    }

    const CATALOG: &str = r#"<presets>
      <chunk id="names"><text key="name" text="Name"/></chunk>
      <category name="Food">
        <item name="Cafe" type="node,closedway">
          <key key="amenity" value="cafe"/>
          <reference ref="names"/>
          <preset_link preset_name="Bakery"/>
        </item>
        <group name="Shops">
          <item name="Bakery" type="node">
            <key key="shop" value="bakery"/>
          </item>
        </group>
      </category>
      <category name="Other">
        <item name="Cafe" type="node">
          <key key="amenity" value="cafe"/>
          <key key="cuisine" value="coffee_shop"/>
        </item>
        <item name="Plaza" type="multipolygon">
          <key key="place" value="square"/>
        </item>
      </category>
    </presets>"#;

    fn tags(pairs: &[(&str, &str)]) -> TagMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_exact_match_is_sole_result() {
        let catalog = PresetCatalog::from_xml(CATALOG, None);
        let paths = catalog.resolve_paths_for_tags(&tags(&[("amenity", "cafe")]));
        assert_eq!(paths, vec![ItemPath::in_category("Food", "Cafe")]);
    }

    #[test]
    fn test_superset_returns_all_subsets() {
        let catalog = PresetCatalog::from_xml(CATALOG, None);
        let paths = catalog.resolve_paths_for_tags(&tags(&[
            ("amenity", "cafe"),
            ("cuisine", "coffee_shop"),
            ("name", "Joe's"),
        ]));
        assert_eq!(
            paths,
            vec![
                ItemPath::in_category("Food", "Cafe"),
                ItemPath::in_category("Other", "Cafe"),
            ]
        );
    }

    #[test]
    fn test_no_match_is_empty() {
        let catalog = PresetCatalog::from_xml(CATALOG, None);
        assert!(catalog
            .resolve_paths_for_tags(&tags(&[("highway", "primary")]))
            .is_empty());
    }

    #[test]
    fn test_resolve_by_name_first_wins() {
        let catalog = PresetCatalog::from_xml(CATALOG, None);
        let (path, _) = catalog.resolve_item_by_name("Cafe").unwrap();
        assert_eq!(path, ItemPath::in_category("Food", "Cafe"));
        assert!(catalog.resolve_item_by_name("Nothing").is_none());
    }

    #[test]
    fn test_expand_item() {
        let catalog = PresetCatalog::from_xml(CATALOG, None);
        let expansion = catalog
            .expand_item(&ItemPath::in_category("Food", "Cafe"))
            .unwrap();
        assert_eq!(expansion.elements.len(), 4);
        assert_eq!(expansion.elements[2], FieldElement::LinkDivider);
        assert_eq!(expansion.preset_links(), vec!["Bakery"]);
    }

    #[test]
    fn test_items_for_kind_closed_way_accepts_areas() {
        let catalog = PresetCatalog::from_xml(CATALOG, None);
        let square = tags(&[("place", "square")]);
        assert_eq!(catalog.items_for_kind(&square, FeatureKind::ClosedWay).len(), 1);
        assert!(catalog.items_for_kind(&square, FeatureKind::Node).is_empty());
    }
}
