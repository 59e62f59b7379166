//! Catalog loading errors.
//!
//! None of these abort loading. The parser records them in a [`LoadReport`]
//! and keeps whatever it managed to read.

use std::path::PathBuf;

use thiserror::Error;

/// A problem encountered while loading the preset catalog.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CatalogError {
    /// The preset source could not be read.
    #[error("failed to read preset source {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    /// The XML is malformed; everything after `position` was dropped.
    #[error("malformed preset XML at byte {position}: {reason}")]
    Malformed { position: u64, reason: String },

    /// An element lacks an attribute it cannot do without.
    #[error("<{element}> at byte {position} is missing attribute '{attribute}'")]
    MissingAttribute {
        element: String,
        attribute: &'static str,
        position: u64,
    },

    /// An element appeared outside any item or chunk.
    #[error("<{element}> at byte {position} is outside an item or chunk")]
    Orphaned { element: String, position: u64 },
}

/// Summary of a catalog load.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    /// Number of items in the tree.
    pub items: usize,
    /// Number of items with defining tags (tag index entries).
    pub indexed: usize,
    /// Number of chunks in the chunk table.
    pub chunks: usize,
    /// Problems encountered; empty on a clean load.
    pub errors: Vec<CatalogError>,
}

impl LoadReport {
    /// Whether the load was free of problems.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}
