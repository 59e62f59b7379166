//! Preset catalog: loading, indexing and resolution.
//!
//! Presets follow the JOSM tagging-preset format. The catalog is parsed once
//! into a [`PresetCatalog`] holding the category tree, a chunk table of
//! reusable field fragments, and a [`TagPatternIndex`] mapping each preset's
//! defining tags to its [`ItemPath`].
//!
//! # Example
//!
//! ```ignore
//! use osmtagger::preset::{CatalogLoader, PresetPaths, TagMap};
//!
//! let handle = CatalogLoader::spawn(PresetPaths::new("defaultPresets.xml"));
//! let catalog = handle.wait().await;
//!
//! let tags = TagMap::from([("amenity".into(), "cafe".into())]);
//! for path in catalog.resolve_paths_for_tags(&tags) {
//!     println!("{path}");
//! }
//! ```

mod catalog;
mod error;
mod index;
mod loader;
mod model;
mod parser;
mod resolver;

pub use catalog::PresetCatalog;
pub use error::{CatalogError, LoadReport};
pub use index::{is_subset, IndexEntry, TagPatternIndex};
pub use loader::{CatalogHandle, CatalogLoader, PresetPaths};
pub use model::{
    normalize_icon, Category, ChunkTable, FeatureKind, FieldElement, Group, Item, ItemPath, TagMap,
};
pub use parser::{parse_chunks, parse_presets, ParsedPresets};
pub use resolver::{expand_elements, Expansion, ExpansionWarning, MAX_CHUNK_DEPTH};
