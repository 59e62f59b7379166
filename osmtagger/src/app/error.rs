//! Application error types.

use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::config::ConfigError;
use crate::osm::OsmError;

/// Errors that can occur while assembling the application.
#[derive(Debug)]
pub enum AppError {
    /// The configuration file could not be read.
    Config(ConfigError),

    /// The data directory could not be created.
    DataDir { path: PathBuf, source: io::Error },

    /// The HTTP client could not be built.
    Transport(OsmError),

    /// Failed to create the Tokio runtime.
    RuntimeCreation(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(e) => write!(f, "Configuration error: {}", e),
            AppError::DataDir { path, source } => {
                write!(
                    f,
                    "Failed to create data directory {}: {}",
                    path.display(),
                    source
                )
            }
            AppError::Transport(e) => write!(f, "Failed to create HTTP client: {}", e),
            AppError::RuntimeCreation(msg) => {
                write!(f, "Failed to create Tokio runtime: {}", msg)
            }
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(e) => Some(e),
            AppError::DataDir { source, .. } => Some(source),
            AppError::Transport(e) => Some(e),
            AppError::RuntimeCreation(_) => None,
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        AppError::Config(e)
    }
}

impl From<OsmError> for AppError {
    fn from(e: OsmError) -> Self {
        AppError::Transport(e)
    }
}
