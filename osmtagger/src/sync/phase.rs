//! Submission progress.

use std::fmt;

use crate::osm::SkippedEntry;

/// Where a submission currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubmissionPhase {
    #[default]
    Idle,
    AuthCheck,
    ChangesetOpen,
    ChangesetUpload { changeset_id: u64 },
    ChangesetClose { changeset_id: u64 },
}

impl fmt::Display for SubmissionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::AuthCheck => write!(f, "checking login"),
            Self::ChangesetOpen => write!(f, "opening changeset"),
            Self::ChangesetUpload { changeset_id } => {
                write!(f, "uploading changeset {}", changeset_id)
            }
            Self::ChangesetClose { changeset_id } => {
                write!(f, "closing changeset {}", changeset_id)
            }
        }
    }
}

/// Outcome of a successful submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReport {
    pub changeset_id: u64,
    pub created: usize,
    pub modified: usize,
    pub deleted: usize,
    /// Entries that could not be expressed and stay staged.
    pub skipped: Vec<SkippedEntry>,
    /// Whether the changeset was closed; the server closes it on its own
    /// after an hour otherwise.
    pub closed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_display() {
        assert_eq!(
            SubmissionPhase::ChangesetUpload { changeset_id: 42 }.to_string(),
            "uploading changeset 42"
        );
        assert_eq!(SubmissionPhase::default(), SubmissionPhase::Idle);
    }
}
