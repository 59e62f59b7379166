//! Changeset documents: the `changeset/create` body and `osmChange` uploads.

use std::io::Cursor;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use tracing::warn;

use super::error::OsmError;
use super::model::ObjectType;
use crate::staging::StagedObject;

/// `generator` attribute of uploaded documents.
pub const GENERATOR: &str = "osmtagger";

/// Why an entry was left out of a change document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// New relations cannot be created.
    RelationCreate,
    /// A node needs coordinates.
    MissingPosition,
}

/// An entry that was not included in the upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    pub id: i64,
    pub reason: SkipReason,
}

/// Entries of one action, bucketed by element type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeBucket {
    pub nodes: Vec<StagedObject>,
    pub ways: Vec<StagedObject>,
    pub relations: Vec<StagedObject>,
}

impl ChangeBucket {
    fn push(&mut self, object: StagedObject) {
        match object.object_type() {
            ObjectType::Node => self.nodes.push(object),
            ObjectType::Way => self.ways.push(object),
            ObjectType::Relation => self.relations.push(object),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len() + self.ways.len() + self.relations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn iter_mut(&mut self) -> impl Iterator<Item = &mut StagedObject> {
        self.nodes
            .iter_mut()
            .chain(self.ways.iter_mut())
            .chain(self.relations.iter_mut())
    }

    /// Entries in upload order: nodes, ways, relations.
    pub fn iter(&self) -> impl Iterator<Item = &StagedObject> {
        self.nodes
            .iter()
            .chain(self.ways.iter())
            .chain(self.relations.iter())
    }

}

/// An `osmChange` document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OsmChange {
    pub create: ChangeBucket,
    pub modify: ChangeBucket,
    pub delete: ChangeBucket,
}

impl OsmChange {
    /// Sorts staged edits into create, modify and delete buckets.
    ///
    /// Negative ids are created, positive ids modified. Entries that cannot be
    /// expressed are returned separately and logged.
    pub fn build(saves: &[StagedObject], deletes: &[StagedObject]) -> (Self, Vec<SkippedEntry>) {
        let mut change = Self::default();
        let mut skipped = Vec::new();

        let mut skip = |id: i64, reason: SkipReason| {
            warn!(id, ?reason, "Leaving staged entry out of changeset");
            skipped.push(SkippedEntry { id, reason });
        };

        for object in saves {
            if object.object_type() == ObjectType::Node && object.position.is_none() {
                skip(object.id, SkipReason::MissingPosition);
                continue;
            }
            if object.is_local() {
                if object.object_type() == ObjectType::Relation {
                    skip(object.id, SkipReason::RelationCreate);
                    continue;
                }
                change.create.push(object.clone());
            } else {
                change.modify.push(object.clone());
            }
        }

        for object in deletes {
            if object.object_type() == ObjectType::Node && object.position.is_none() {
                skip(object.id, SkipReason::MissingPosition);
                continue;
            }
            change.delete.push(object.clone());
        }

        (change, skipped)
    }

    /// Sets the changeset id on every entry.
    pub fn stamp(&mut self, changeset_id: u64) {
        for object in self
            .create
            .iter_mut()
            .chain(self.modify.iter_mut())
            .chain(self.delete.iter_mut())
        {
            object.changeset = changeset_id;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.create.is_empty() && self.modify.is_empty() && self.delete.is_empty()
    }

    /// Entries included as creations or modifications.
    pub fn saved(&self) -> Vec<StagedObject> {
        self.create.iter().chain(self.modify.iter()).cloned().collect()
    }

    /// Entries included as deletions.
    pub fn deleted(&self) -> Vec<StagedObject> {
        self.delete.iter().cloned().collect()
    }

    /// Serializes the document.
    ///
    /// Creations and modifications go nodes first; deletions go relations
    /// first so nothing is deleted while still referenced.
    pub fn to_xml(&self) -> Result<String, OsmError> {
        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(encode)?;
        let mut root = BytesStart::new("osmChange");
        root.push_attribute(("version", "0.6"));
        root.push_attribute(("generator", GENERATOR));
        writer.write_event(Event::Start(root)).map_err(encode)?;

        for (action, bucket, reverse) in [
            ("create", &self.create, false),
            ("modify", &self.modify, false),
            ("delete", &self.delete, true),
        ] {
            if bucket.is_empty() {
                continue;
            }
            writer
                .write_event(Event::Start(BytesStart::new(action)))
                .map_err(encode)?;
            let mut groups = [&bucket.nodes, &bucket.ways, &bucket.relations];
            if reverse {
                groups.reverse();
            }
            for object in groups.into_iter().flatten() {
                write_object(&mut writer, object).map_err(encode)?;
            }
            writer
                .write_event(Event::End(BytesEnd::new(action)))
                .map_err(encode)?;
        }

        writer
            .write_event(Event::End(BytesEnd::new("osmChange")))
            .map_err(encode)?;

        String::from_utf8(writer.into_inner().into_inner())
            .map_err(encode)
    }
}

fn write_object(writer: &mut Writer<Cursor<Vec<u8>>>, object: &StagedObject) -> std::io::Result<()> {
    let element = object.object_type().as_str();
    let id = object.id.to_string();
    let version = object.version.to_string();
    let changeset = object.changeset.to_string();

    let mut start = BytesStart::new(element);
    start.push_attribute(("id", id.as_str()));
    start.push_attribute(("version", version.as_str()));
    start.push_attribute(("changeset", changeset.as_str()));
    if let Some(position) = object.position.filter(|_| element == "node") {
        start.push_attribute(("lat", position.lat.to_string().as_str()));
        start.push_attribute(("lon", position.lon.to_string().as_str()));
    }
    writer.write_event(Event::Start(start)).map_err(into_io)?;

    for reference in &object.node_refs {
        let reference = reference.to_string();
        let mut nd = BytesStart::new("nd");
        nd.push_attribute(("ref", reference.as_str()));
        writer.write_event(Event::Empty(nd)).map_err(into_io)?;
    }
    for member in &object.members {
        let reference = member.reference.to_string();
        let mut tag = BytesStart::new("member");
        tag.push_attribute(("type", member.member_type.as_str()));
        tag.push_attribute(("ref", reference.as_str()));
        tag.push_attribute(("role", member.role.as_str()));
        writer.write_event(Event::Empty(tag)).map_err(into_io)?;
    }
    for (key, value) in &object.tags {
        let mut tag = BytesStart::new("tag");
        tag.push_attribute(("k", key.as_str()));
        tag.push_attribute(("v", value.as_str()));
        writer.write_event(Event::Empty(tag)).map_err(into_io)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new(element)))
        .map_err(into_io)
}

fn into_io<E: std::fmt::Display>(e: E) -> std::io::Error {
    std::io::Error::other(e.to_string())
}

fn encode<E: std::fmt::Display>(e: E) -> OsmError {
    OsmError::Encode(e.to_string())
}

/// Body of the `changeset/create` request.
pub fn changeset_create_body(comment: &str, created_by: &str) -> Result<String, OsmError> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    writer
        .write_event(Event::Start(BytesStart::new("osm")))
        .map_err(encode)?;
    writer
        .write_event(Event::Start(BytesStart::new("changeset")))
        .map_err(encode)?;
    for (k, v) in [("created_by", created_by), ("comment", comment)] {
        let mut tag = BytesStart::new("tag");
        tag.push_attribute(("k", k));
        tag.push_attribute(("v", v));
        writer
            .write_event(Event::Empty(tag))
            .map_err(encode)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("changeset")))
        .map_err(encode)?;
    writer
        .write_event(Event::End(BytesEnd::new("osm")))
        .map_err(encode)?;

    String::from_utf8(writer.into_inner().into_inner())
        .map_err(encode)
}
