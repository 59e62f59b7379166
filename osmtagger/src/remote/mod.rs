//! Downloaded map data.
//!
//! [`AreaDownloader`] fetches the area around the viewport into a
//! [`RemoteDataIndex`], which answers geometry lookups and tap queries and
//! hands out [`StagedObject`](crate::staging::StagedObject)s for editing.
//! [`OverpassClient`] runs tag searches and merges the answers into the
//! same index.

mod area;
mod geometry;
mod index;
mod layers;
mod overpass;
mod viewport;

pub use area::{
    AreaDownloader, DownloadConfig, DownloadError, DownloadOutcome, DEFAULT_HALF_EXTENT,
    DEFAULT_MAX_SHRINK_ATTEMPTS, SHRINK_FACTOR,
};
pub use geometry::{point_in_ring, LineGeometry, TapHit};
pub use index::RemoteDataIndex;
pub use layers::{LayerId, LayerSink, LayerStyle, SavedLayerPresenter};
pub use overpass::{
    OverpassClient, OverpassQuery, QueryError, SearchArea, TagFilter, DEFAULT_QUERY_TIMEOUT_SECS,
    DEFAULT_SEARCH_HALF_EXTENT, OVERPASS_URL,
};
pub use viewport::{ViewportStore, VIEWPORT_FILE};
