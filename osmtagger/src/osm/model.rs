//! Raw OSM features as delivered by the API.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::coord::GeoPoint;
use crate::preset::TagMap;

/// OSM element type, as used on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    Node,
    Way,
    Relation,
}

impl ObjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Way => "way",
            Self::Relation => "relation",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "node" => Ok(Self::Node),
            "way" => Ok(Self::Way),
            "relation" => Ok(Self::Relation),
            other => Err(format!("unknown element type '{}'", other)),
        }
    }
}

/// A relation member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    #[serde(rename = "type")]
    pub member_type: ObjectType,
    #[serde(rename = "ref")]
    pub reference: i64,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawNode {
    pub id: i64,
    pub version: u64,
    pub changeset: u64,
    pub position: GeoPoint,
    pub tags: TagMap,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawWay {
    pub id: i64,
    pub version: u64,
    pub changeset: u64,
    pub node_refs: Vec<i64>,
    pub tags: TagMap,
}

impl RawWay {
    /// A way is closed when it starts and ends on the same node.
    pub fn is_closed(&self) -> bool {
        match (self.node_refs.first(), self.node_refs.last()) {
            (Some(first), Some(last)) => self.node_refs.len() > 1 && first == last,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawRelation {
    pub id: i64,
    pub version: u64,
    pub changeset: u64,
    pub members: Vec<Member>,
    pub tags: TagMap,
}

impl RawRelation {
    pub fn is_multipolygon(&self) -> bool {
        self.tags.get("type").map(String::as_str) == Some("multipolygon")
    }
}

/// Any downloaded feature.
#[derive(Debug, Clone, PartialEq)]
pub enum RawFeature {
    Node(RawNode),
    Way(RawWay),
    Relation(RawRelation),
}

impl RawFeature {
    pub fn id(&self) -> i64 {
        match self {
            Self::Node(n) => n.id,
            Self::Way(w) => w.id,
            Self::Relation(r) => r.id,
        }
    }

    pub fn object_type(&self) -> ObjectType {
        match self {
            Self::Node(_) => ObjectType::Node,
            Self::Way(_) => ObjectType::Way,
            Self::Relation(_) => ObjectType::Relation,
        }
    }

    pub fn tags(&self) -> &TagMap {
        match self {
            Self::Node(n) => &n.tags,
            Self::Way(w) => &w.tags,
            Self::Relation(r) => &r.tags,
        }
    }

    pub fn version(&self) -> u64 {
        match self {
            Self::Node(n) => n.version,
            Self::Way(w) => w.version,
            Self::Relation(r) => r.version,
        }
    }

    pub fn changeset(&self) -> u64 {
        match self {
            Self::Node(n) => n.changeset,
            Self::Way(w) => w.changeset,
            Self::Relation(r) => r.changeset,
        }
    }
}
