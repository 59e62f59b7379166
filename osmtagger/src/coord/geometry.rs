//! GeoJSON geometry values.

use serde::{Deserialize, Serialize};

use super::GeoPoint;

/// A `[lon, lat]` position, GeoJSON axis order.
pub type Position = [f64; 2];

/// A GeoJSON geometry object.
///
/// Serializes as `{"type": "...", "coordinates": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point(Position),
    LineString(Vec<Position>),
    Polygon(Vec<Vec<Position>>),
    MultiLineString(Vec<Vec<Position>>),
}

impl Geometry {
    pub fn point(point: GeoPoint) -> Self {
        Self::Point(to_position(point))
    }

    /// A line, or a single-ring polygon when `closed`.
    pub fn line(points: &[GeoPoint], closed: bool) -> Self {
        let ring: Vec<Position> = points.iter().copied().map(to_position).collect();
        if closed {
            Self::Polygon(vec![ring])
        } else {
            Self::LineString(ring)
        }
    }

    /// Collects several member lines into one geometry.
    pub fn lines(lines: &[Vec<GeoPoint>]) -> Self {
        Self::MultiLineString(
            lines
                .iter()
                .map(|line| line.iter().copied().map(to_position).collect())
                .collect(),
        )
    }
}

fn to_position(point: GeoPoint) -> Position {
    [point.lon, point.lat]
}
