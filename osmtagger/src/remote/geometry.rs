//! Geometry assembly and hit testing for downloaded features.

use crate::coord::{GeoPoint, Geometry};
use crate::osm::ObjectType;
use crate::preset::FeatureKind;

/// Coordinates of a way, in node order.
#[derive(Debug, Clone, PartialEq)]
pub struct LineGeometry {
    pub points: Vec<GeoPoint>,
    /// First and last referenced node are the same.
    pub closed: bool,
}

impl LineGeometry {
    /// Feature kind implied by the line shape.
    pub fn kind(&self) -> FeatureKind {
        if self.closed {
            FeatureKind::ClosedWay
        } else {
            FeatureKind::Way
        }
    }

    /// Distance from `point`; zero inside a closed ring.
    pub fn distance_to(&self, point: &GeoPoint) -> Option<f64> {
        if self.closed && point_in_ring(point, &self.points) {
            return Some(0.0);
        }
        point.distance_to_polyline(&self.points)
    }

    pub fn to_geometry(&self) -> Geometry {
        Geometry::line(&self.points, self.closed)
    }
}

/// Even-odd test of `point` against a ring.
pub fn point_in_ring(point: &GeoPoint, ring: &[GeoPoint]) -> bool {
    if ring.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let (a, b) = (&ring[i], &ring[j]);
        if (a.lat > point.lat) != (b.lat > point.lat)
            && point.lon < (b.lon - a.lon) * (point.lat - a.lat) / (b.lat - a.lat) + a.lon
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// A feature near a tapped location.
#[derive(Debug, Clone, PartialEq)]
pub struct TapHit {
    pub object_type: ObjectType,
    pub id: i64,
    pub kind: FeatureKind,
    /// Distance from the tap in degrees.
    pub distance: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<GeoPoint> {
        vec![
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(0.0, 1.0),
            GeoPoint::new(1.0, 1.0),
            GeoPoint::new(1.0, 0.0),
            GeoPoint::new(0.0, 0.0),
        ]
    }

    #[test]
    fn test_point_in_ring() {
        assert!(point_in_ring(&GeoPoint::new(0.5, 0.5), &square()));
        assert!(!point_in_ring(&GeoPoint::new(1.5, 0.5), &square()));
    }

    #[test]
    fn test_closed_line_distance_inside_is_zero() {
        let line = LineGeometry {
            points: square(),
            closed: true,
        };
        assert_eq!(line.distance_to(&GeoPoint::new(0.5, 0.5)), Some(0.0));
        assert_eq!(line.kind(), FeatureKind::ClosedWay);
        assert!(matches!(line.to_geometry(), Geometry::Polygon(_)));
    }

    #[test]
    fn test_open_line_distance() {
        let line = LineGeometry {
            points: square(),
            closed: false,
        };
        let d = line.distance_to(&GeoPoint::new(0.5, 0.5)).unwrap();
        assert!((d - 0.5).abs() < 1e-9);
    }
}
