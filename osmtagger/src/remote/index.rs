//! In-memory index of the last downloaded area.

use std::collections::HashMap;

use chrono::Utc;
use parking_lot::RwLock;
use tracing::debug;

use super::geometry::{point_in_ring, LineGeometry, TapHit};
use crate::coord::{GeoPoint, Geometry};
use crate::osm::{ObjectType, RawFeature, RawNode, RawRelation, RawWay};
use crate::preset::FeatureKind;
use crate::staging::StagedObject;

#[derive(Debug, Default)]
struct Features {
    nodes: HashMap<i64, RawNode>,
    ways: HashMap<i64, RawWay>,
    relations: HashMap<i64, RawRelation>,
}

impl Features {
    fn insert(&mut self, feature: RawFeature) {
        match feature {
            RawFeature::Node(n) => {
                self.nodes.insert(n.id, n);
            }
            RawFeature::Way(w) => {
                self.ways.insert(w.id, w);
            }
            RawFeature::Relation(r) => {
                self.relations.insert(r.id, r);
            }
        }
    }

    fn line(&self, way: &RawWay) -> LineGeometry {
        let points = way
            .node_refs
            .iter()
            .filter_map(|id| self.nodes.get(id).map(|n| n.position))
            .collect();
        LineGeometry {
            points,
            closed: way.is_closed(),
        }
    }

    /// Distance from `point` to a multipolygon's area.
    ///
    /// Zero inside an outer ring unless an inner ring contains the point;
    /// otherwise the distance to the nearest member boundary.
    fn multipolygon_distance(&self, relation: &RawRelation, point: &GeoPoint) -> Option<f64> {
        let mut boundary: Option<f64> = None;
        let mut inside_outer = false;
        let mut inside_inner = false;

        for member in &relation.members {
            if member.member_type != ObjectType::Way {
                continue;
            }
            let Some(way) = self.ways.get(&member.reference) else {
                continue;
            };
            let line = self.line(way);
            if let Some(d) = point.distance_to_polyline(&line.points) {
                boundary = Some(boundary.map_or(d, |b| b.min(d)));
            }
            if line.closed && point_in_ring(point, &line.points) {
                if member.role == "inner" {
                    inside_inner = true;
                } else {
                    inside_outer = true;
                }
            }
        }

        if inside_outer && !inside_inner {
            Some(0.0)
        } else {
            boundary
        }
    }
}

/// Downloaded features by type and id.
///
/// Replaced as a whole on every successful area download; reads never see
/// a half-built index.
#[derive(Debug, Default)]
pub struct RemoteDataIndex {
    features: RwLock<Features>,
}

impl RemoteDataIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the index with `features`.
    pub fn index_area(&self, features: Vec<RawFeature>) {
        let mut fresh = Features::default();
        for feature in features {
            fresh.insert(feature);
        }
        debug!(
            nodes = fresh.nodes.len(),
            ways = fresh.ways.len(),
            relations = fresh.relations.len(),
            "Indexed area"
        );
        *self.features.write() = fresh;
    }

    /// Adds `features` to the current index, replacing any with the same id.
    ///
    /// Used for query results that lie outside the downloaded area.
    pub fn merge_features(&self, features: Vec<RawFeature>) {
        let count = features.len();
        let mut current = self.features.write();
        for feature in features {
            current.insert(feature);
        }
        debug!(count, "Merged features into index");
    }

    pub fn node(&self, id: i64) -> Option<RawNode> {
        self.features.read().nodes.get(&id).cloned()
    }

    pub fn way(&self, id: i64) -> Option<RawWay> {
        self.features.read().ways.get(&id).cloned()
    }

    pub fn relation(&self, id: i64) -> Option<RawRelation> {
        self.features.read().relations.get(&id).cloned()
    }

    /// Number of indexed features of all types.
    pub fn len(&self) -> usize {
        let features = self.features.read();
        features.nodes.len() + features.ways.len() + features.relations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Coordinates of `way`; referenced nodes missing from the index are skipped.
    pub fn resolve_line_geometry(&self, way: &RawWay) -> LineGeometry {
        self.features.read().line(way)
    }

    /// Features within `tolerance` degrees of `point`, closest first.
    ///
    /// Tagged nodes, tagged ways and multipolygon relations are candidates.
    /// A relation matched through several member ways is reported once, at
    /// its closest distance. Staged nodes replace their remote counterparts.
    pub fn resolve_tap(
        &self,
        point: GeoPoint,
        tolerance: f64,
        staged: &[StagedObject],
    ) -> Vec<TapHit> {
        let features = self.features.read();
        let mut best: HashMap<(ObjectType, i64), TapHit> = HashMap::new();
        let mut offer = |hit: TapHit| {
            if hit.distance > tolerance {
                return;
            }
            best.entry((hit.object_type, hit.id))
                .and_modify(|existing| {
                    if hit.distance < existing.distance {
                        *existing = hit.clone();
                    }
                })
                .or_insert(hit);
        };

        let staged_nodes: HashMap<i64, &StagedObject> = staged
            .iter()
            .filter(|o| o.kind == FeatureKind::Node && o.position.is_some())
            .map(|o| (o.id, o))
            .collect();

        for node in features.nodes.values() {
            if node.tags.is_empty() || staged_nodes.contains_key(&node.id) {
                continue;
            }
            offer(TapHit {
                object_type: ObjectType::Node,
                id: node.id,
                kind: FeatureKind::Node,
                distance: point.distance_to(&node.position),
            });
        }
        for object in staged_nodes.values() {
            if let Some(position) = object.position {
                offer(TapHit {
                    object_type: ObjectType::Node,
                    id: object.id,
                    kind: FeatureKind::Node,
                    distance: point.distance_to(&position),
                });
            }
        }

        for way in features.ways.values() {
            if way.tags.is_empty() {
                continue;
            }
            let line = features.line(way);
            if let Some(distance) = line.distance_to(&point) {
                offer(TapHit {
                    object_type: ObjectType::Way,
                    id: way.id,
                    kind: line.kind(),
                    distance,
                });
            }
        }

        for relation in features.relations.values().filter(|r| r.is_multipolygon()) {
            if let Some(distance) = features.multipolygon_distance(relation, &point) {
                offer(TapHit {
                    object_type: ObjectType::Relation,
                    id: relation.id,
                    kind: FeatureKind::Multipolygon,
                    distance,
                });
            }
        }

        let mut hits: Vec<TapHit> = best.into_values().collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.id.cmp(&b.id)));
        hits
    }

    /// Turns an indexed feature into a staged object ready for editing.
    ///
    /// Only multipolygon relations are editable; other relations give `None`.
    pub fn to_staged_object(&self, object_type: ObjectType, id: i64) -> Option<StagedObject> {
        let features = self.features.read();
        let staged_at = Utc::now();
        let object = match object_type {
            ObjectType::Node => {
                let node = features.nodes.get(&id)?;
                StagedObject {
                    id,
                    kind: FeatureKind::Node,
                    version: node.version,
                    changeset: node.changeset,
                    tags: node.tags.clone(),
                    baseline: node.tags.clone(),
                    position: Some(node.position),
                    node_refs: Vec::new(),
                    members: Vec::new(),
                    geometry: Some(Geometry::point(node.position)),
                    staged_at,
                }
            }
            ObjectType::Way => {
                let way = features.ways.get(&id)?;
                let line = features.line(way);
                StagedObject {
                    id,
                    kind: line.kind(),
                    version: way.version,
                    changeset: way.changeset,
                    tags: way.tags.clone(),
                    baseline: way.tags.clone(),
                    position: None,
                    node_refs: way.node_refs.clone(),
                    members: Vec::new(),
                    geometry: Some(line.to_geometry()),
                    staged_at,
                }
            }
            ObjectType::Relation => {
                let relation = features.relations.get(&id)?;
                if !relation.is_multipolygon() {
                    return None;
                }
                let lines: Vec<Vec<GeoPoint>> = relation
                    .members
                    .iter()
                    .filter(|m| m.member_type == ObjectType::Way)
                    .filter_map(|m| features.ways.get(&m.reference))
                    .map(|way| features.line(way).points)
                    .collect();
                StagedObject {
                    id,
                    kind: FeatureKind::Multipolygon,
                    version: relation.version,
                    changeset: relation.changeset,
                    tags: relation.tags.clone(),
                    baseline: relation.tags.clone(),
                    position: None,
                    node_refs: Vec::new(),
                    members: relation.members.clone(),
                    geometry: Some(Geometry::lines(&lines)),
                    staged_at,
                }
            }
        };
        Some(object)
    }
}
