//! OsmTagger - tag editing for OpenStreetMap
//!
//! This library provides the core of a feature tag editor:
//!
//! - [`preset`]: loads a JOSM-style preset catalog and finds presets for tags
//! - [`staging`]: keeps local edits until they are uploaded
//! - [`osm`]: API 0.6 client, OAuth2 login and `osmChange` documents
//! - [`sync`]: uploads staged edits as one changeset
//! - [`remote`]: downloads the viewport area and answers map taps
//! - [`app`]: wires the above together from the user configuration

pub mod app;
pub mod config;
pub mod coord;
pub mod logging;
pub mod osm;
pub mod preset;
pub mod remote;
pub mod staging;
pub mod storage;
pub mod sync;

/// Library version, reported as the changeset `created_by`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
