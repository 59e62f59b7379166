//! Geographic primitives
//!
//! Provides WGS84 points and bounding boxes used by the area downloader, the
//! remote data index and tap resolution. Distances are planar, measured in
//! degrees, which is what the map layer hands us as tap tolerance.

mod geometry;

pub use geometry::{Geometry, Position};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum valid latitude in degrees.
pub const MIN_LAT: f64 = -90.0;
/// Maximum valid latitude in degrees.
pub const MAX_LAT: f64 = 90.0;
/// Minimum valid longitude in degrees.
pub const MIN_LON: f64 = -180.0;
/// Maximum valid longitude in degrees.
pub const MAX_LON: f64 = 180.0;

/// Errors produced when constructing geographic values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordError {
    /// Latitude outside [-90, 90].
    #[error("Invalid latitude: {0}")]
    InvalidLatitude(f64),

    /// Longitude outside [-180, 180].
    #[error("Invalid longitude: {0}")]
    InvalidLongitude(f64),

    /// Half extent must be positive and finite.
    #[error("Invalid extent: {0}")]
    InvalidExtent(f64),
}

/// A WGS84 coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    /// Creates a point without validation.
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Creates a point, rejecting out-of-range coordinates.
    pub fn checked(lat: f64, lon: f64) -> Result<Self, CoordError> {
        if !(MIN_LAT..=MAX_LAT).contains(&lat) {
            return Err(CoordError::InvalidLatitude(lat));
        }
        if !(MIN_LON..=MAX_LON).contains(&lon) {
            return Err(CoordError::InvalidLongitude(lon));
        }
        Ok(Self { lat, lon })
    }

    /// Planar distance to another point, in degrees.
    #[inline]
    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        (self.lat - other.lat).hypot(self.lon - other.lon)
    }

    /// Planar distance from this point to the segment `a`-`b`, in degrees.
    pub fn distance_to_segment(&self, a: &GeoPoint, b: &GeoPoint) -> f64 {
        let dx = b.lon - a.lon;
        let dy = b.lat - a.lat;
        let len_sq = dx * dx + dy * dy;
        if len_sq == 0.0 {
            return self.distance_to(a);
        }

        // Projection of the point onto the segment, clamped to its ends
        let t = (((self.lon - a.lon) * dx + (self.lat - a.lat) * dy) / len_sq).clamp(0.0, 1.0);
        let projected = GeoPoint::new(a.lat + t * dy, a.lon + t * dx);
        self.distance_to(&projected)
    }

    /// Planar distance from this point to a polyline, in degrees.
    ///
    /// Returns `None` for an empty polyline.
    pub fn distance_to_polyline(&self, points: &[GeoPoint]) -> Option<f64> {
        match points {
            [] => None,
            [single] => Some(self.distance_to(single)),
            _ => points
                .windows(2)
                .map(|pair| self.distance_to_segment(&pair[0], &pair[1]))
                .reduce(f64::min),
        }
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6},{:.6}", self.lat, self.lon)
    }
}

/// Axis-aligned bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    /// Creates a bounding box from its corners.
    pub const fn new(min_lat: f64, min_lon: f64, max_lat: f64, max_lon: f64) -> Self {
        Self {
            min_lat,
            min_lon,
            max_lat,
            max_lon,
        }
    }

    /// Creates a square box of `half_extent` degrees around `center`.
    ///
    /// # Errors
    ///
    /// Returns `CoordError::InvalidExtent` if the extent is not a positive
    /// finite number.
    pub fn around(center: GeoPoint, half_extent: f64) -> Result<Self, CoordError> {
        if !half_extent.is_finite() || half_extent <= 0.0 {
            return Err(CoordError::InvalidExtent(half_extent));
        }
        Ok(Self {
            min_lat: (center.lat - half_extent).max(MIN_LAT),
            min_lon: (center.lon - half_extent).max(MIN_LON),
            max_lat: (center.lat + half_extent).min(MAX_LAT),
            max_lon: (center.lon + half_extent).min(MAX_LON),
        })
    }

    /// Center of the box.
    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lon + self.max_lon) / 2.0,
        )
    }

    /// Latitude span in degrees.
    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// Longitude span in degrees.
    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    /// Returns a box with the same center and each span scaled by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        let center = self.center();
        let half_h = self.height() * factor / 2.0;
        let half_w = self.width() * factor / 2.0;
        Self {
            min_lat: center.lat - half_h,
            min_lon: center.lon - half_w,
            max_lat: center.lat + half_h,
            max_lon: center.lon + half_w,
        }
    }

    /// Whether the point lies inside the box (edges inclusive).
    pub fn contains(&self, point: &GeoPoint) -> bool {
        (self.min_lat..=self.max_lat).contains(&point.lat)
            && (self.min_lon..=self.max_lon).contains(&point.lon)
    }

    /// Formats the box as the API `bbox` parameter: `min_lon,min_lat,max_lon,max_lat`.
    pub fn to_query(&self) -> String {
        format!(
            "{},{},{},{}",
            self.min_lon, self.min_lat, self.max_lon, self.max_lat
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_point_rejects_invalid_latitude() {
        let result = GeoPoint::checked(91.0, 0.0);
        assert!(matches!(result, Err(CoordError::InvalidLatitude(_))));
    }

    #[test]
    fn test_checked_point_rejects_invalid_longitude() {
        let result = GeoPoint::checked(0.0, 181.0);
        assert!(matches!(result, Err(CoordError::InvalidLongitude(_))));
    }

    #[test]
    fn test_bbox_around_center() {
        let bbox = BoundingBox::around(GeoPoint::new(55.75, 37.62), 0.005).unwrap();
        assert!((bbox.min_lat - 55.745).abs() < 1e-9);
        assert!((bbox.max_lon - 37.625).abs() < 1e-9);
        assert!(bbox.contains(&GeoPoint::new(55.75, 37.62)));
    }

    #[test]
    fn test_bbox_rejects_zero_extent() {
        let result = BoundingBox::around(GeoPoint::new(0.0, 0.0), 0.0);
        assert!(matches!(result, Err(CoordError::InvalidExtent(_))));
    }

    #[test]
    fn test_bbox_scaled_keeps_center() {
        let bbox = BoundingBox::new(10.0, 20.0, 12.0, 24.0);
        let scaled = bbox.scaled(0.75);
        assert_eq!(scaled.center(), bbox.center());
        assert!((scaled.width() - 3.0).abs() < 1e-9);
        assert!((scaled.height() - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_bbox_query_order() {
        let bbox = BoundingBox::new(1.0, 2.0, 3.0, 4.0);
        assert_eq!(bbox.to_query(), "2,1,4,3");
    }

    #[test]
    fn test_distance_to_segment_projects_inside() {
        let p = GeoPoint::new(1.0, 0.5);
        let a = GeoPoint::new(0.0, 0.0);
        let b = GeoPoint::new(0.0, 1.0);
        assert!((p.distance_to_segment(&a, &b) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_distance_to_segment_clamps_to_endpoint() {
        let p = GeoPoint::new(0.0, 2.0);
        let a = GeoPoint::new(0.0, 0.0);
        let b = GeoPoint::new(0.0, 1.0);
        assert!((p.distance_to_segment(&a, &b) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_distance_to_polyline_empty() {
        assert!(GeoPoint::new(0.0, 0.0).distance_to_polyline(&[]).is_none());
    }
}
