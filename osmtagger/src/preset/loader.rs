//! Background catalog loading.
//!
//! Parsing the full preset document takes long enough that it should not
//! block startup. [`CatalogLoader::spawn`] reads the files on a blocking
//! worker and publishes the finished catalog through a [`CatalogHandle`].

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

use super::catalog::PresetCatalog;
use super::error::CatalogError;
use super::model::ChunkTable;

/// Where the preset documents live.
#[derive(Debug, Clone)]
pub struct PresetPaths {
    /// The preset document.
    pub presets: PathBuf,
    /// Optional separate chunk document.
    pub chunks: Option<PathBuf>,
}

impl PresetPaths {
    pub fn new(presets: impl Into<PathBuf>) -> Self {
        Self {
            presets: presets.into(),
            chunks: None,
        }
    }

    pub fn with_chunks(mut self, chunks: impl Into<PathBuf>) -> Self {
        self.chunks = Some(chunks.into());
        self
    }
}

/// Loads the preset catalog.
pub struct CatalogLoader;

impl CatalogLoader {
    /// Reads and parses the catalog on the current thread.
    ///
    /// Never fails; unreadable files produce an empty or partial catalog
    /// with the problem recorded in its load report.
    pub fn load(paths: &PresetPaths) -> PresetCatalog {
        let presets_xml = match std::fs::read_to_string(&paths.presets) {
            Ok(xml) => xml,
            Err(e) => {
                let error = CatalogError::Unreadable {
                    path: paths.presets.clone(),
                    reason: e.to_string(),
                };
                warn!(error = %error, "Preset catalog unavailable");
                return PresetCatalog::from_parts(Vec::new(), ChunkTable::new(), vec![error]);
            }
        };

        let mut unreadable_chunks = None;
        let chunks_xml = paths
            .chunks
            .as_ref()
            .and_then(|path| match std::fs::read_to_string(path) {
                Ok(xml) => Some(xml),
                Err(e) => {
                    unreadable_chunks = Some(CatalogError::Unreadable {
                        path: path.clone(),
                        reason: e.to_string(),
                    });
                    None
                }
            });

        let mut catalog = PresetCatalog::from_xml(&presets_xml, chunks_xml.as_deref());
        if let Some(error) = unreadable_chunks {
            catalog.push_error(error);
        }

        for error in &catalog.report().errors {
            warn!(error = %error, "Preset catalog problem");
        }
        catalog
    }

    /// Starts loading on a blocking worker and returns a handle to the result.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(paths: PresetPaths) -> CatalogHandle {
        let (tx, rx) = watch::channel(None);
        tokio::task::spawn_blocking(move || {
            info!(path = %paths.presets.display(), "Loading preset catalog");
            let catalog = Self::load(&paths);
            // Nobody listening is fine
            let _ = tx.send(Some(Arc::new(catalog)));
        });
        CatalogHandle { rx }
    }
}

/// Read side of a catalog that is published once.
#[derive(Debug, Clone)]
pub struct CatalogHandle {
    rx: watch::Receiver<Option<Arc<PresetCatalog>>>,
}

impl CatalogHandle {
    /// A handle to a catalog that is already loaded.
    pub fn ready(catalog: PresetCatalog) -> Self {
        let (_tx, rx) = watch::channel(Some(Arc::new(catalog)));
        Self { rx }
    }

    /// The catalog, if loading has finished.
    pub fn get(&self) -> Option<Arc<PresetCatalog>> {
        self.rx.borrow().clone()
    }

    /// Waits for loading to finish.
    ///
    /// If the loader died without publishing, an empty catalog is returned.
    pub async fn wait(&self) -> Arc<PresetCatalog> {
        if let Some(catalog) = self.get() {
            return catalog;
        }
        let mut rx = self.rx.clone();
        let catalog = match rx.wait_for(Option::is_some).await {
            Ok(catalog) => catalog.clone().unwrap_or_default(),
            Err(_) => {
                warn!("Preset loader exited without publishing a catalog");
                Arc::new(PresetCatalog::empty())
            }
        };
        catalog
    }
}
