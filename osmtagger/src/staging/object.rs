//! Staged feature representation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::coord::{GeoPoint, Geometry};
use crate::osm::{Member, ObjectType};
use crate::preset::{FeatureKind, TagMap};

/// A feature created, modified or marked for deletion locally.
///
/// Negative ids are features created on this device; positive ids refer to
/// existing features on the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagedObject {
    pub id: i64,
    pub kind: FeatureKind,
    pub version: u64,
    /// Changeset the server version belongs to.
    pub changeset: u64,
    /// Current tags.
    pub tags: TagMap,
    /// Tags as they were when the feature was first staged.
    pub baseline: TagMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<GeoPoint>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub node_refs: Vec<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<Member>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Geometry>,
    pub staged_at: DateTime<Utc>,
}

impl StagedObject {
    /// A new point created locally.
    pub fn new_node(id: i64, position: GeoPoint) -> Self {
        Self {
            id,
            kind: FeatureKind::Node,
            version: 0,
            changeset: 0,
            tags: TagMap::new(),
            baseline: TagMap::new(),
            position: Some(position),
            node_refs: Vec::new(),
            members: Vec::new(),
            geometry: Some(Geometry::point(position)),
            staged_at: Utc::now(),
        }
    }

    /// Whether the feature only exists locally.
    pub fn is_local(&self) -> bool {
        self.id < 0
    }

    /// Wire type of the feature; closed lines are ways.
    pub fn object_type(&self) -> ObjectType {
        match self.kind {
            FeatureKind::Node => ObjectType::Node,
            FeatureKind::Way | FeatureKind::ClosedWay => ObjectType::Way,
            FeatureKind::Multipolygon => ObjectType::Relation,
        }
    }

    /// Whether the current tags differ from the baseline.
    pub fn is_modified(&self) -> bool {
        self.tags != self.baseline
    }

    /// Whether `other` would upload the same data; ignores bookkeeping such
    /// as the changeset stamp and staging time.
    pub fn same_content(&self, other: &StagedObject) -> bool {
        self.id == other.id
            && self.kind == other.kind
            && self.tags == other.tags
            && self.position == other.position
            && self.node_refs == other.node_refs
            && self.members == other.members
    }

    /// A copy with the current tags reset to the baseline.
    pub fn reverted(mut self) -> Self {
        self.tags = self.baseline.clone();
        self
    }
}
