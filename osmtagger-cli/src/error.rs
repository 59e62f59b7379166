//! CLI error type.

use std::fmt;
use std::io;

use osmtagger::app::AppError;
use osmtagger::config::ConfigError;
use osmtagger::osm::{AuthError, OsmError};
use osmtagger::remote::DownloadError;
use osmtagger::sync::SyncError;

/// Errors reported to the user with a non-zero exit code.
#[derive(Debug)]
pub enum CliError {
    /// Configuration problem, with a message for the user.
    Config(String),

    /// Bad command-line input.
    Input(String),

    /// The application could not start.
    App(AppError),

    /// Login or logout failed.
    Auth(AuthError),

    /// The area download failed.
    Download(DownloadError),

    /// The submission failed.
    Sync(SyncError),

    /// An API call failed.
    Api(OsmError),

    /// Local file error.
    Io(io::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Input(msg) => write!(f, "{}", msg),
            CliError::App(e) => write!(f, "{}", e),
            CliError::Auth(e) => write!(f, "Login failed: {}", e),
            CliError::Download(e) => write!(f, "Download failed: {}", e),
            CliError::Sync(e) => write!(f, "Submission failed: {}", e),
            CliError::Api(e) => write!(f, "API error: {}", e),
            CliError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::App(e) => Some(e),
            CliError::Auth(e) => Some(e),
            CliError::Download(e) => Some(e),
            CliError::Sync(e) => Some(e),
            CliError::Api(e) => Some(e),
            CliError::Io(e) => Some(e),
            CliError::Config(_) | CliError::Input(_) => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<AppError> for CliError {
    fn from(e: AppError) -> Self {
        CliError::App(e)
    }
}

impl From<AuthError> for CliError {
    fn from(e: AuthError) -> Self {
        CliError::Auth(e)
    }
}

impl From<DownloadError> for CliError {
    fn from(e: DownloadError) -> Self {
        CliError::Download(e)
    }
}

impl From<SyncError> for CliError {
    fn from(e: SyncError) -> Self {
        CliError::Sync(e)
    }
}

impl From<OsmError> for CliError {
    fn from(e: OsmError) -> Self {
        CliError::Api(e)
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        CliError::Io(e)
    }
}
