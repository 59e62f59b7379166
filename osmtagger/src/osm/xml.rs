//! Decoding of OSM XML map responses.

use std::collections::HashMap;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;

use super::error::OsmError;
use super::model::{Member, RawFeature, RawNode, RawRelation, RawWay};
use crate::coord::GeoPoint;

fn attributes(e: &BytesStart) -> HashMap<String, String> {
    e.attributes()
        .flatten()
        .filter_map(|attr| {
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value().ok()?.into_owned();
            Some((key, value))
        })
        .collect()
}

fn number<T: std::str::FromStr>(attrs: &HashMap<String, String>, name: &str) -> Option<T> {
    attrs.get(name)?.parse().ok()
}

/// Common header of every element.
struct Header {
    id: i64,
    version: u64,
    changeset: u64,
}

impl Header {
    fn read(attrs: &HashMap<String, String>) -> Option<Self> {
        Some(Self {
            id: number(attrs, "id")?,
            version: number(attrs, "version")?,
            changeset: number(attrs, "changeset")?,
        })
    }
}

/// Parses a `/map` response into features.
///
/// Elements lacking id, version, changeset or (for nodes) coordinates are
/// skipped. Broken XML is a [`OsmError::Decode`].
pub fn parse_osm_xml(xml: &str) -> Result<Vec<RawFeature>, OsmError> {
    let mut reader = Reader::from_str(xml);
    let mut features = Vec::new();
    let mut current: Option<RawFeature> = None;
    let mut skipped = 0usize;

    loop {
        let event = reader.read_event().map_err(|e| {
            OsmError::Decode(format!(
                "invalid OSM XML at byte {}: {}",
                reader.buffer_position(),
                e
            ))
        })?;

        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let empty = matches!(event, Event::Empty(_));
                let attrs = attributes(e);
                match e.local_name().as_ref() {
                    b"node" | b"way" | b"relation" => {
                        let feature = start_feature(e.local_name().as_ref(), &attrs);
                        if feature.is_none() {
                            skipped += 1;
                        }
                        match (feature, empty) {
                            (Some(feature), true) => features.push(feature),
                            (feature, false) => current = feature,
                            (None, true) => {}
                        }
                    }
                    b"tag" => {
                        if let (Some(feature), Some(k), Some(v)) =
                            (current.as_mut(), attrs.get("k"), attrs.get("v"))
                        {
                            feature_tags(feature).insert(k.clone(), v.clone());
                        }
                    }
                    b"nd" => {
                        if let (Some(RawFeature::Way(way)), Some(reference)) =
                            (current.as_mut(), number::<i64>(&attrs, "ref"))
                        {
                            way.node_refs.push(reference);
                        }
                    }
                    b"member" => {
                        if let Some(RawFeature::Relation(relation)) = current.as_mut() {
                            let member = attrs
                                .get("type")
                                .and_then(|t| t.parse().ok())
                                .zip(number::<i64>(&attrs, "ref"))
                                .map(|(member_type, reference)| Member {
                                    member_type,
                                    reference,
                                    role: attrs.get("role").cloned().unwrap_or_default(),
                                });
                            if let Some(member) = member {
                                relation.members.push(member);
                            }
                        }
                    }
                    _ => {}
                }
            }
            Event::End(ref e) => {
                if matches!(e.local_name().as_ref(), b"node" | b"way" | b"relation") {
                    if let Some(feature) = current.take() {
                        features.push(feature);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if skipped > 0 {
        debug!(skipped, "Skipped incomplete OSM elements");
    }
    Ok(features)
}

fn start_feature(name: &[u8], attrs: &HashMap<String, String>) -> Option<RawFeature> {
    let header = Header::read(attrs)?;
    let feature = match name {
        b"node" => RawFeature::Node(RawNode {
            id: header.id,
            version: header.version,
            changeset: header.changeset,
            position: GeoPoint::new(number(attrs, "lat")?, number(attrs, "lon")?),
            tags: Default::default(),
        }),
        b"way" => RawFeature::Way(RawWay {
            id: header.id,
            version: header.version,
            changeset: header.changeset,
            node_refs: Vec::new(),
            tags: Default::default(),
        }),
        _ => RawFeature::Relation(RawRelation {
            id: header.id,
            version: header.version,
            changeset: header.changeset,
            members: Vec::new(),
            tags: Default::default(),
        }),
    };
    Some(feature)
}

fn feature_tags(feature: &mut RawFeature) -> &mut crate::preset::TagMap {
    match feature {
        RawFeature::Node(n) => &mut n.tags,
        RawFeature::Way(w) => &mut w.tags,
        RawFeature::Relation(r) => &mut r.tags,
    }
}
