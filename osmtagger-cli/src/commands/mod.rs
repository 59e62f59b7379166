//! CLI command implementations.

pub mod auth;
pub mod common;
pub mod config;
pub mod download;
pub mod pending;
pub mod presets;
pub mod search;
pub mod submit;
