//! OSM API errors.

use thiserror::Error;

/// HTTP statuses the map call uses for "too many objects in this box".
pub const AREA_TOO_LARGE_STATUSES: [u16; 2] = [400, 509];

/// Errors talking to the OSM API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OsmError {
    /// Non-success response, with the body the server sent.
    #[error("Server returned HTTP {status}: {message}")]
    Server { status: u16, message: String },

    /// The requested bounding box holds too much data.
    #[error("Requested area is too large (HTTP {status}): {message}")]
    AreaTooLarge { status: u16, message: String },

    /// The response could not be understood.
    #[error("Malformed server response: {0}")]
    Decode(String),

    /// A request body could not be built.
    #[error("Failed to encode request: {0}")]
    Encode(String),

    /// The request never got an HTTP response.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The call needs a token and none is available.
    #[error("Not logged in: {0}")]
    Auth(String),
}

impl OsmError {
    /// Builds the error for a non-success response.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        Self::Server {
            status,
            message: message.into(),
        }
    }

    /// HTTP status, when the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } | Self::AreaTooLarge { status, .. } => Some(*status),
            _ => None,
        }
    }
}
