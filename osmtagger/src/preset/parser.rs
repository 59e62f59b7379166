//! Streaming parser for JOSM-style preset documents.
//!
//! The parser walks the document once and builds both the category tree and
//! the chunk table. It is deliberately forgiving: elements with missing
//! attributes are skipped, unknown elements are ignored, and a hard XML error
//! stops parsing but keeps everything completed before it.
//!
//! # Document shape
//!
//! ```text
//! <presets>
//!   <chunk id="name_fields"> <text key="name" text="Name"/> </chunk>
//!   <category name="Food" icon="food.svg">
//!     <group name="Shops">
//!       <item name="Bakery" type="node,closedway">
//!         <key key="shop" value="bakery"/>
//!         <reference ref="name_fields"/>
//!         <combo key="opening_hours" values="24/7,sunrise-sunset"/>
//!       </item>
//!     </group>
//!   </category>
//! </presets>
//! ```

use std::collections::HashMap;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::{debug, warn};

use super::error::CatalogError;
use super::model::{normalize_icon, Category, ChunkTable, FeatureKind, FieldElement, Group, Item};

/// Default value separator for `<combo values>`.
const COMBO_DELIMITER: &str = ",";

/// Default value separator for `<multiselect values>`.
const MULTISELECT_DELIMITER: &str = ";";

/// Output of a single parse.
#[derive(Debug, Default)]
pub struct ParsedPresets {
    pub categories: Vec<Category>,
    pub chunks: ChunkTable,
    pub errors: Vec<CatalogError>,
}

/// A choice element whose values arrive as `<list_entry>` children.
#[derive(Debug)]
struct PendingChoice {
    multi: bool,
    key: String,
    default: Option<String>,
    label: String,
    values: Vec<String>,
}

impl PendingChoice {
    fn finish(self) -> FieldElement {
        if self.multi {
            FieldElement::MultiSelect {
                key: self.key,
                values: self.values,
                label: self.label,
            }
        } else {
            FieldElement::Combo {
                key: self.key,
                values: self.values,
                default: self.default,
            }
        }
    }
}

/// Mutable state of the tree walk.
#[derive(Debug, Default)]
struct TreeBuilder {
    out: ParsedPresets,
    category: Option<Category>,
    group: Option<Group>,
    item: Option<Item>,
    chunk: Option<(String, Vec<FieldElement>)>,
    choice: Option<PendingChoice>,
}

impl TreeBuilder {
    fn start(&mut self, name: &str, attrs: HashMap<String, String>, empty: bool, position: u64) {
        match name {
            "category" => {
                let Some(cat_name) = self.require(name, &attrs, "name", position) else {
                    return;
                };
                let category = Category {
                    name: cat_name,
                    icon: attrs.get("icon").map(|i| normalize_icon(i)),
                    groups: Vec::new(),
                    items: Vec::new(),
                };
                if empty {
                    self.out.categories.push(category);
                } else {
                    self.category = Some(category);
                }
            }
            "group" => {
                let Some(group_name) = self.require(name, &attrs, "name", position) else {
                    return;
                };
                let group = Group {
                    name: group_name,
                    icon: attrs.get("icon").map(|i| normalize_icon(i)),
                    items: Vec::new(),
                };
                if empty {
                    self.attach_group(group, position);
                } else {
                    self.group = Some(group);
                }
            }
            "item" => {
                let Some(item_name) = self.require(name, &attrs, "name", position) else {
                    return;
                };
                let kinds = attrs
                    .get("type")
                    .map(|t| FeatureKind::parse_list(t))
                    .unwrap_or_default();
                let item = Item::new(item_name, attrs.get("icon").map(|i| normalize_icon(i)), kinds);
                if empty {
                    self.attach_item(item, position);
                } else {
                    self.item = Some(item);
                }
            }
            "chunk" => {
                let Some(id) = self.require(name, &attrs, "id", position) else {
                    return;
                };
                if empty {
                    self.out.chunks.insert(id, Vec::new());
                } else {
                    self.chunk = Some((id, Vec::new()));
                }
            }
            "list_entry" => {
                if let Some(choice) = self.choice.as_mut() {
                    if let Some(value) = attrs.get("value") {
                        choice.values.push(value.clone());
                    }
                }
            }
            "combo" | "multiselect" => self.start_choice(name, attrs, empty, position),
            _ => {
                if let Some(element) = self.field_element(name, &attrs, position) {
                    self.push_element(element, name, position);
                }
            }
        }
    }

    fn end(&mut self, name: &str, position: u64) {
        match name {
            "category" => {
                if let Some(category) = self.category.take() {
                    self.out.categories.push(category);
                }
            }
            "group" => {
                if let Some(group) = self.group.take() {
                    self.attach_group(group, position);
                }
            }
            "item" => {
                if let Some(item) = self.item.take() {
                    self.attach_item(item, position);
                }
            }
            "chunk" => {
                if let Some((id, elements)) = self.chunk.take() {
                    if self.out.chunks.insert(id.clone(), elements).is_some() {
                        debug!(chunk = %id, "Chunk redefined, later definition wins");
                    }
                }
            }
            "combo" | "multiselect" => {
                if let Some(choice) = self.choice.take() {
                    self.push_element(choice.finish(), name, position);
                }
            }
            _ => {}
        }
    }

    fn start_choice(&mut self, name: &str, attrs: HashMap<String, String>, empty: bool, position: u64) {
        let multi = name == "multiselect";
        let Some(key) = self.require(name, &attrs, "key", position) else {
            return;
        };
        let delimiter = attrs
            .get("delimiter")
            .map(String::as_str)
            .unwrap_or(if multi {
                MULTISELECT_DELIMITER
            } else {
                COMBO_DELIMITER
            });
        let label = attrs.get("text").cloned().unwrap_or_else(|| key.clone());
        let pending = PendingChoice {
            multi,
            key,
            default: attrs.get("default").cloned(),
            label,
            values: attrs
                .get("values")
                .map(|v| v.split(delimiter).map(str::to_string).collect())
                .unwrap_or_default(),
        };

        // Inline values win; any <list_entry> children are then ignored
        if empty || attrs.contains_key("values") {
            self.push_element(pending.finish(), name, position);
        } else {
            self.choice = Some(pending);
        }
    }

    fn field_element(
        &mut self,
        name: &str,
        attrs: &HashMap<String, String>,
        position: u64,
    ) -> Option<FieldElement> {
        let element = match name {
            "key" => FieldElement::Key {
                key: self.require(name, attrs, "key", position)?,
                value: self.require(name, attrs, "value", position)?,
            },
            "text" => {
                let key = self.require(name, attrs, "key", position)?;
                FieldElement::Text {
                    label: attrs.get("text").cloned().unwrap_or_else(|| key.clone()),
                    key,
                }
            }
            "check" => FieldElement::Check {
                key: self.require(name, attrs, "key", position)?,
                label: attrs.get("text").cloned(),
                value_on: attrs.get("value_on").cloned(),
            },
            "link" => FieldElement::Link {
                wiki: self.require(name, attrs, "wiki", position)?,
            },
            "label" => FieldElement::Label {
                text: self.require(name, attrs, "text", position)?,
            },
            "reference" => FieldElement::ChunkRef {
                id: self.require(name, attrs, "ref", position)?,
            },
            "preset_link" => FieldElement::PresetLink {
                preset_name: self.require(name, attrs, "preset_name", position)?,
            },
            _ => return None,
        };
        Some(element)
    }

    fn push_element(&mut self, element: FieldElement, name: &str, position: u64) {
        if let Some(item) = self.item.as_mut() {
            item.elements.push(element);
        } else if let Some((_, elements)) = self.chunk.as_mut() {
            elements.push(element);
        } else {
            self.out.errors.push(CatalogError::Orphaned {
                element: name.to_string(),
                position,
            });
        }
    }

    fn attach_item(&mut self, item: Item, position: u64) {
        if let Some(group) = self.group.as_mut() {
            group.items.push(item);
        } else if let Some(category) = self.category.as_mut() {
            category.items.push(item);
        } else {
            self.out.errors.push(CatalogError::Orphaned {
                element: "item".to_string(),
                position,
            });
        }
    }

    fn attach_group(&mut self, group: Group, position: u64) {
        if let Some(category) = self.category.as_mut() {
            category.groups.push(group);
        } else {
            self.out.errors.push(CatalogError::Orphaned {
                element: "group".to_string(),
                position,
            });
        }
    }

    fn require(
        &mut self,
        element: &str,
        attrs: &HashMap<String, String>,
        attribute: &'static str,
        position: u64,
    ) -> Option<String> {
        match attrs.get(attribute) {
            Some(value) => Some(value.clone()),
            None => {
                self.out.errors.push(CatalogError::MissingAttribute {
                    element: element.to_string(),
                    attribute,
                    position,
                });
                None
            }
        }
    }

    /// Closes whatever is still open after a hard error, keeping finished items.
    fn salvage(&mut self) {
        if let Some(group) = self.group.take() {
            if let Some(category) = self.category.as_mut() {
                category.groups.push(group);
            }
        }
        if let Some(category) = self.category.take() {
            self.out.categories.push(category);
        }
        if let Some((id, elements)) = self.chunk.take() {
            self.out.chunks.insert(id, elements);
        }
        self.item = None;
        self.choice = None;
    }
}

/// Collects an element's attributes, dropping any that fail to unescape.
fn attributes(e: &BytesStart) -> HashMap<String, String> {
    e.attributes()
        .flatten()
        .filter_map(|attr| {
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value().ok()?.into_owned();
            Some((key, value))
        })
        .collect()
}

/// Parses a preset document into categories and chunks.
///
/// Never fails: problems are returned in [`ParsedPresets::errors`].
pub fn parse_presets(xml: &str) -> ParsedPresets {
    let mut reader = Reader::from_str(xml);
    let mut builder = TreeBuilder::default();

    loop {
        let position = reader.buffer_position() as u64;
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                builder.start(&name, attributes(e), false, position);
            }
            Ok(Event::Empty(ref e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                builder.start(&name, attributes(e), true, position);
            }
            Ok(Event::End(ref e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                builder.end(&name, position);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                warn!(position, error = %e, "Preset XML is malformed, keeping partial catalog");
                builder.out.errors.push(CatalogError::Malformed {
                    position: reader.buffer_position() as u64,
                    reason: e.to_string(),
                });
                builder.salvage();
                break;
            }
        }
    }

    builder.out
}

/// Parses a standalone chunk document, ignoring any categories in it.
pub fn parse_chunks(xml: &str) -> (ChunkTable, Vec<CatalogError>) {
    let parsed = parse_presets(xml);
    (parsed.chunks, parsed.errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<presets xmlns="http://josm.openstreetmap.de/tagging-preset-1.0">
  <chunk id="name">
    <text key="name" text="Name"/>
  </chunk>
  <chunk id="payment">
    <check key="payment:cash" text="Cash" value_on="yes"/>
    <combo key="payment:cards" text="Cards">
      <list_entry value="yes"/>
      <list_entry value="no"/>
    </combo>
  </chunk>
  <category name="Food" icon="presets/food.svg">
    <item name="Cafe" icon="presets/cafe.svg" type="node,closedway">
      <key key="amenity" value="cafe"/>
      <reference ref="name"/>
      <multiselect key="cuisine" text="Cuisine" values="coffee_shop;italian"/>
      <link wiki="Tag:amenity=cafe"/>
    </item>
    <group name="Shops" icon="shops.svg">
      <item name="Bakery" type="node">
        <key key="shop" value="bakery"/>
        <preset_link preset_name="Cafe"/>
      </item>
    </group>
  </category>
</presets>"#;

    #[test]
    fn test_parses_tree_and_chunks() {
        let parsed = parse_presets(SAMPLE);
        assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
        assert_eq!(parsed.categories.len(), 1);

        let food = &parsed.categories[0];
        assert_eq!(food.icon.as_deref(), Some("presets+food.svg"));
        assert_eq!(food.items.len(), 1);
        assert_eq!(food.groups.len(), 1);
        assert_eq!(food.groups[0].items[0].name, "Bakery");

        let cafe = &food.items[0];
        assert_eq!(cafe.kinds, vec![FeatureKind::Node, FeatureKind::ClosedWay]);
        assert_eq!(cafe.elements.len(), 4);
        assert_eq!(
            cafe.elements[2],
            FieldElement::MultiSelect {
                key: "cuisine".into(),
                values: vec!["coffee_shop".into(), "italian".into()],
                label: "Cuisine".into(),
            }
        );

        assert_eq!(parsed.chunks.len(), 2);
        assert_eq!(
            parsed.chunks["payment"][1],
            FieldElement::Combo {
                key: "payment:cards".into(),
                values: vec!["yes".into(), "no".into()],
                default: None,
            }
        );
    }

    #[test]
    fn test_inline_combo_values_and_default() {
        let xml = r#"<presets><category name="C"><item name="I" type="node">
            <combo key="k" values="a,b" default="b"/>
        </item></category></presets>"#;
        let parsed = parse_presets(xml);
        assert_eq!(
            parsed.categories[0].items[0].elements,
            vec![FieldElement::Combo {
                key: "k".into(),
                values: vec!["a".into(), "b".into()],
                default: Some("b".into()),
            }]
        );
    }

    #[test]
    fn test_missing_attribute_is_skipped_and_reported() {
        let xml = r#"<presets><category name="C"><item name="I" type="node">
            <key key="amenity"/>
            <key key="shop" value="bakery"/>
        </item></category></presets>"#;
        let parsed = parse_presets(xml);
        assert_eq!(parsed.categories[0].items[0].elements.len(), 1);
        assert!(matches!(
            parsed.errors[0],
            CatalogError::MissingAttribute {
                attribute: "value",
                ..
            }
        ));
    }

    #[test]
    fn test_malformed_document_keeps_completed_items() {
        let xml = r#"<presets><category name="C">
            <item name="Good" type="node"><key key="a" value="b"/></item>
            <item name="Broken" type="node"><key key="c" value="d"/></oops>
        "#;
        let parsed = parse_presets(xml);
        assert_eq!(parsed.categories.len(), 1);
        assert_eq!(parsed.categories[0].items.len(), 1);
        assert_eq!(parsed.categories[0].items[0].name, "Good");
        assert!(parsed
            .errors
            .iter()
            .any(|e| matches!(e, CatalogError::Malformed { .. })));
    }

    #[test]
    fn test_orphaned_item_is_reported() {
        let xml = r#"<presets><item name="Loose" type="node"/></presets>"#;
        let parsed = parse_presets(xml);
        assert!(parsed.categories.is_empty());
        assert!(matches!(parsed.errors[0], CatalogError::Orphaned { .. }));
    }

    #[test]
    fn test_parse_chunks_only() {
        let (chunks, errors) = parse_chunks(
            r#"<presets><chunk id="x"><label text="Hello"/></chunk></presets>"#,
        );
        assert!(errors.is_empty());
        assert_eq!(
            chunks["x"],
            vec![FieldElement::Label {
                text: "Hello".into()
            }]
        );
    }
}
