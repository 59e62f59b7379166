//! Common types and utilities shared across CLI commands.

use std::sync::Arc;

use clap::ValueEnum;
use osmtagger::app::{AppConfig, AppContext};
use osmtagger::config::ConfigFile;
use osmtagger::preset::{FeatureKind, TagMap};

use crate::error::CliError;
use crate::prompt::TerminalPrompt;

/// Feature kind selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum KindArg {
    Node,
    Way,
    Closedway,
    Multipolygon,
}

impl From<KindArg> for FeatureKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Node => FeatureKind::Node,
            KindArg::Way => FeatureKind::Way,
            KindArg::Closedway => FeatureKind::ClosedWay,
            KindArg::Multipolygon => FeatureKind::Multipolygon,
        }
    }
}

/// Parse `key=value` arguments into a tag map.
pub fn parse_tags(pairs: &[String]) -> Result<TagMap, CliError> {
    pairs
        .iter()
        .map(|pair| {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| CliError::Input(format!("Expected key=value, got '{}'", pair)))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(CliError::Input(format!("Empty key in '{}'", pair)));
            }
            Ok((key.to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Format tags as `k=v, k=v`.
pub fn format_tags(tags: &TagMap) -> String {
    tags.iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Start the application on its own runtime, with a terminal login prompt.
pub fn start_app(config: &ConfigFile) -> Result<AppContext, CliError> {
    let app_config = AppConfig::from_config_file(config);
    Ok(AppContext::start_sync(
        app_config,
        Some(Arc::new(TerminalPrompt)),
    )?)
}
