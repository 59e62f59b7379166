//! Last loaded viewport, kept across restarts.

use std::io;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::coord::BoundingBox;
use crate::storage::{read_json, write_json_atomic};

/// File name of the persisted viewport.
pub const VIEWPORT_FILE: &str = "viewport.json";

/// Stores the bounding box of the last successful download.
#[derive(Debug, Clone)]
pub struct ViewportStore {
    path: Option<PathBuf>,
}

impl ViewportStore {
    /// Store backed by `viewport.json` in `data_dir`.
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: Some(data_dir.join(VIEWPORT_FILE)),
        }
    }

    /// Store that remembers nothing.
    pub fn disabled() -> Self {
        Self { path: None }
    }

    /// The saved viewport, if any. Unreadable files are logged and ignored.
    pub fn load(&self) -> Option<BoundingBox> {
        let path = self.path.as_ref()?;
        match read_json(path) {
            Ok(bbox) => bbox,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable viewport");
                None
            }
        }
    }

    pub fn save(&self, bbox: &BoundingBox) -> io::Result<()> {
        match &self.path {
            Some(path) => write_json_atomic(path, bbox),
            None => Ok(()),
        }
    }
}
