//! Tag searches through an Overpass API interpreter.
//!
//! A search asks for every node, way and relation carrying a tag, either in
//! a box around a point or inside a named area. The answer is ordinary OSM
//! XML, so it goes through the same parser as area downloads and lands in
//! the [`RemoteDataIndex`] next to the downloaded features.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use super::index::RemoteDataIndex;
use crate::coord::{BoundingBox, CoordError, GeoPoint};
use crate::osm::{parse_osm_xml, HttpRequest, OsmError, OsmTransport, RawFeature};
use crate::preset::TagMap;
use crate::staging::StagedObject;

/// Public Overpass interpreter.
pub const OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";
/// Default half extent of a search box, in degrees.
pub const DEFAULT_SEARCH_HALF_EXTENT: f64 = 0.05;
/// Server-side time limit sent with every query.
pub const DEFAULT_QUERY_TIMEOUT_SECS: u32 = 25;

/// Errors building a query.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    #[error("Tag filter needs a key")]
    EmptyKey,

    #[error("Area name cannot be empty")]
    EmptyAreaName,

    #[error(transparent)]
    Coord(#[from] CoordError),
}

/// Which tag a feature must carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagFilter {
    /// Any value for the key.
    Key(String),
    /// Exactly this value.
    KeyValue(String, String),
}

impl TagFilter {
    pub fn matches(&self, tags: &TagMap) -> bool {
        match self {
            Self::Key(key) => tags.contains_key(key),
            Self::KeyValue(key, value) => tags.get(key) == Some(value),
        }
    }
}

impl FromStr for TagFilter {
    type Err = QueryError;

    /// Parses `key` or `key=value`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key, value) = match s.split_once('=') {
            Some((key, value)) => (key.trim(), Some(value.trim())),
            None => (s.trim(), None),
        };
        if key.is_empty() {
            return Err(QueryError::EmptyKey);
        }
        Ok(match value {
            Some(value) if !value.is_empty() => Self::KeyValue(key.to_string(), value.to_string()),
            _ => Self::Key(key.to_string()),
        })
    }
}

impl fmt::Display for TagFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => write!(f, "[\"{}\"]", quoted(key)),
            Self::KeyValue(key, value) => write!(f, "[\"{}\"=\"{}\"]", quoted(key), quoted(value)),
        }
    }
}

/// Where to look.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchArea {
    Bbox(BoundingBox),
    /// An area whose `name` tag matches exactly, e.g. a city.
    Named(String),
}

impl SearchArea {
    /// Square box of `half_extent` degrees around `center`.
    pub fn around(center: GeoPoint, half_extent: f64) -> Result<Self, QueryError> {
        Ok(Self::Bbox(BoundingBox::around(center, half_extent)?))
    }

    pub fn named(name: &str) -> Result<Self, QueryError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(QueryError::EmptyAreaName);
        }
        Ok(Self::Named(name.to_string()))
    }
}

/// A tag search, rendered to Overpass QL by [`OverpassQuery::to_ql`].
#[derive(Debug, Clone, PartialEq)]
pub struct OverpassQuery {
    pub filter: TagFilter,
    pub area: SearchArea,
    pub timeout_secs: u32,
}

impl OverpassQuery {
    pub fn new(filter: TagFilter, area: SearchArea) -> Self {
        Self {
            filter,
            area,
            timeout_secs: DEFAULT_QUERY_TIMEOUT_SECS,
        }
    }

    /// Query text asking for the matches plus everything they reference.
    ///
    /// Member ways and nodes come back too, and `out meta` keeps versions so
    /// results can be edited like downloaded features.
    pub fn to_ql(&self) -> String {
        let header = format!("[out:xml][timeout:{}];", self.timeout_secs);
        let select = match &self.area {
            SearchArea::Bbox(b) => format!(
                "nwr{}({},{},{},{});",
                self.filter, b.min_lat, b.min_lon, b.max_lat, b.max_lon
            ),
            SearchArea::Named(name) => format!(
                "area[\"name\"=\"{}\"]->.searchArea;nwr{}(area.searchArea);",
                quoted(name),
                self.filter
            ),
        };
        format!("{}{}(._;>;);out meta;", header, select)
    }
}

fn quoted(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Overpass interpreter client over a transport.
pub struct OverpassClient<T> {
    transport: Arc<T>,
    url: String,
}

impl<T> Clone for OverpassClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            url: self.url.clone(),
        }
    }
}

impl<T: OsmTransport> OverpassClient<T> {
    pub fn new(transport: Arc<T>, url: impl Into<String>) -> Self {
        Self {
            transport,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Runs `query` and returns every feature in the answer.
    ///
    /// # Errors
    ///
    /// Non-success answers (a rejected query, rate limiting, a server-side
    /// timeout) map to [`OsmError::Server`]; unreadable XML to
    /// [`OsmError::Decode`].
    pub async fn fetch(&self, query: &OverpassQuery) -> Result<Vec<RawFeature>, OsmError> {
        let ql = query.to_ql();
        debug!(url = %self.url, query = %ql, "Running Overpass query");
        let request = HttpRequest::post(self.url.clone()).form(vec![("data".to_string(), ql)]);
        let response = self.transport.send(request).await?;

        if !response.is_success() {
            return Err(OsmError::from_status(response.status, response.body));
        }
        let features = parse_osm_xml(&response.body)?;
        debug!(count = features.len(), "Overpass answer parsed");
        Ok(features)
    }

    /// Runs `query`, adds the answer to `index` and returns the matches.
    ///
    /// # Arguments
    ///
    /// * `query` - Tag filter and area to search
    /// * `index` - Receives the matches and the features they reference
    ///
    /// # Returns
    ///
    /// Editable objects for the features carrying the tag, sorted by type
    /// and id. Relations other than multipolygons are left out.
    ///
    /// # Errors
    ///
    /// Same as [`OverpassClient::fetch`]; the index is untouched on error.
    pub async fn search(
        &self,
        query: &OverpassQuery,
        index: &RemoteDataIndex,
    ) -> Result<Vec<StagedObject>, OsmError> {
        let features = self.fetch(query).await?;
        let mut matches: Vec<_> = features
            .iter()
            .filter(|f| query.filter.matches(f.tags()))
            .map(|f| (f.object_type(), f.id()))
            .collect();
        matches.sort();
        matches.dedup();

        index.merge_features(features);
        let results: Vec<StagedObject> = matches
            .into_iter()
            .filter_map(|(object_type, id)| index.to_staged_object(object_type, id))
            .collect();
        info!(filter = %query.filter, results = results.len(), "Overpass search finished");
        Ok(results)
    }
}
