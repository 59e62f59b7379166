//! Viewport-driven area downloads.
//!
//! The API rejects boxes holding too many nodes (HTTP 400) or throttles
//! oversized requests (HTTP 509). Either answer makes the downloader shrink
//! the box to 75% of its extent and try again, and the smaller extent sticks
//! for later downloads.
//!
//! Every download takes a generation number. When responses arrive out of
//! order, only the newest one is indexed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::index::RemoteDataIndex;
use super::viewport::ViewportStore;
use crate::coord::{BoundingBox, CoordError, GeoPoint};
use crate::osm::{OsmApi, OsmError, OsmTransport, RawFeature};

/// Default half extent of the downloaded box, in degrees.
pub const DEFAULT_HALF_EXTENT: f64 = 0.0045;
/// Default number of shrink-and-retry rounds.
pub const DEFAULT_MAX_SHRINK_ATTEMPTS: u32 = 5;
/// Extent multiplier applied after an area-too-large answer.
pub const SHRINK_FACTOR: f64 = 0.75;

/// Area download tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadConfig {
    pub half_extent: f64,
    pub max_shrink_attempts: u32,
    pub shrink_factor: f64,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            half_extent: DEFAULT_HALF_EXTENT,
            max_shrink_attempts: DEFAULT_MAX_SHRINK_ATTEMPTS,
            shrink_factor: SHRINK_FACTOR,
        }
    }
}

/// Result of a download that reached the server.
#[derive(Debug, Clone, PartialEq)]
pub enum DownloadOutcome {
    /// The response was indexed.
    Loaded {
        bbox: BoundingBox,
        features: usize,
        generation: u64,
    },
    /// A newer download started meanwhile; the response was dropped.
    Stale { generation: u64 },
}

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Invalid download area: {0}")]
    Coord(#[from] CoordError),

    #[error("Area still too large after {attempts} attempts: {source}")]
    TooLarge {
        attempts: u32,
        #[source]
        source: OsmError,
    },

    #[error(transparent)]
    Osm(#[from] OsmError),
}

/// Downloads the area around the viewport center into a [`RemoteDataIndex`].
pub struct AreaDownloader<T> {
    api: OsmApi<T>,
    index: Arc<RemoteDataIndex>,
    viewport: ViewportStore,
    config: DownloadConfig,
    half_extent: Mutex<f64>,
    generation: AtomicU64,
    /// Serializes the staleness check with indexing.
    commit: Mutex<()>,
    loaded: Mutex<Option<BoundingBox>>,
}

impl<T: OsmTransport> AreaDownloader<T> {
    /// Create a downloader.
    ///
    /// # Arguments
    ///
    /// * `api` - API client used for map requests
    /// * `index` - Index replaced by every successful download
    /// * `viewport` - Where the last loaded box is remembered
    /// * `config` - Initial extent and shrink policy
    pub fn new(
        api: OsmApi<T>,
        index: Arc<RemoteDataIndex>,
        viewport: ViewportStore,
        config: DownloadConfig,
    ) -> Self {
        Self {
            api,
            index,
            viewport,
            half_extent: Mutex::new(config.half_extent),
            config,
            generation: AtomicU64::new(0),
            commit: Mutex::new(()),
            loaded: Mutex::new(None),
        }
    }

    /// The index this downloader fills.
    pub fn index(&self) -> &Arc<RemoteDataIndex> {
        &self.index
    }

    /// Half extent the next download will use.
    pub fn half_extent(&self) -> f64 {
        *self.half_extent.lock()
    }

    /// Bounding box of the last indexed download.
    pub fn loaded_area(&self) -> Option<BoundingBox> {
        *self.loaded.lock()
    }

    /// Viewport saved by a previous session, for restoring the map position.
    pub fn saved_viewport(&self) -> Option<BoundingBox> {
        self.viewport.load()
    }

    /// Whether `center` lies outside the currently loaded area.
    pub fn needs_download(&self, center: &GeoPoint) -> bool {
        match *self.loaded.lock() {
            Some(bbox) => !bbox.contains(center),
            None => true,
        }
    }

    /// Downloads the box around `center`, shrinking it while the server
    /// reports the area as too large.
    ///
    /// The reduced extent is kept for later downloads.
    ///
    /// # Arguments
    ///
    /// * `center` - Center of the box to load
    ///
    /// # Returns
    ///
    /// `Loaded` when the response was indexed, or `Stale` when a newer
    /// download started meanwhile and the response was dropped.
    ///
    /// # Errors
    ///
    /// * `DownloadError::Coord` - The box around `center` is invalid
    /// * `DownloadError::TooLarge` - Still too large after every shrink attempt
    /// * `DownloadError::Osm` - Any other API failure
    pub async fn download(&self, center: GeoPoint) -> Result<DownloadOutcome, DownloadError> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let mut extent = self.half_extent();
        let mut attempt = 0;

        loop {
            let bbox = BoundingBox::around(center, extent)?;
            debug!(generation, attempt, extent, "Requesting area");
            match self.api.download_area(&bbox).await {
                Ok(features) => return Ok(self.commit(generation, bbox, features)),
                Err(e @ OsmError::AreaTooLarge { .. }) => {
                    if attempt >= self.config.max_shrink_attempts {
                        return Err(DownloadError::TooLarge {
                            attempts: attempt + 1,
                            source: e,
                        });
                    }
                    attempt += 1;
                    extent *= self.config.shrink_factor;
                    *self.half_extent.lock() = extent;
                    warn!(status = ?e.status(), extent, "Area too large, shrinking");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Downloads again around the center of the loaded area.
    ///
    /// # Returns
    ///
    /// `None` when nothing has been loaded yet.
    ///
    /// # Errors
    ///
    /// Same as [`download`](Self::download).
    pub async fn refresh(&self) -> Result<Option<DownloadOutcome>, DownloadError> {
        match self.loaded_area() {
            Some(bbox) => self.download(bbox.center()).await.map(Some),
            None => Ok(None),
        }
    }

    fn commit(&self, generation: u64, bbox: BoundingBox, features: Vec<RawFeature>) -> DownloadOutcome {
        let _commit = self.commit.lock();
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(generation, "Dropping stale area response");
            return DownloadOutcome::Stale { generation };
        }

        let count = features.len();
        self.index.index_area(features);
        *self.loaded.lock() = Some(bbox);
        if let Err(e) = self.viewport.save(&bbox) {
            warn!(error = %e, "Failed to save viewport");
        }
        info!(generation, features = count, bbox = %bbox.to_query(), "Area loaded");

        DownloadOutcome::Loaded {
            bbox,
            features: count,
            generation,
        }
    }
}
