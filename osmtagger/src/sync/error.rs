//! Submission errors.

use thiserror::Error;

use crate::osm::{AuthError, OsmError};

/// Why a submission did not complete.
///
/// Every variant leaves the staging store as it was.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Another submission is running on this client.
    #[error("A submission is already in progress")]
    Busy,

    /// Both staging maps are empty, or nothing in them can be uploaded.
    #[error("Nothing to submit")]
    NothingToSubmit,

    /// The same ids are staged for saving and for deletion.
    #[error("Staged edits conflict: {ids:?} are both modified and deleted; discard one side first")]
    StagingConflict { ids: Vec<i64> },

    /// No token and login failed.
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    /// The changeset could not be opened; nothing was sent.
    #[error("Failed to open changeset: {0}")]
    OpenChangeset(#[source] OsmError),

    /// The upload was rejected or never arrived.
    #[error("Failed to upload changeset {changeset_id}: {source}")]
    Upload {
        changeset_id: u64,
        #[source]
        source: OsmError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_error_carries_server_detail() {
        let err = SyncError::Upload {
            changeset_id: 42,
            source: OsmError::from_status(409, "Version mismatch: Provided 1, server had: 2"),
        };
        let text = err.to_string();
        assert!(text.contains("changeset 42"));
        assert!(text.contains("Version mismatch"));
    }

    #[test]
    fn test_conflict_lists_ids() {
        let err = SyncError::StagingConflict { ids: vec![3, 9] };
        assert!(err.to_string().contains("[3, 9]"));
    }
}
