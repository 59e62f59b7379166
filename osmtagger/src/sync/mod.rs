//! Changeset submission.
//!
//! [`SyncClient::submit`] turns the staging store into one changeset:
//!
//! ```text
//! Idle → AuthCheck → ChangesetOpen → ChangesetUpload → ChangesetClose → Idle
//! ```
//!
//! A failure at any step ends the submission with a [`SyncError`] and leaves
//! the staged edits in place so the user can retry.

mod client;
mod error;
mod phase;

pub use client::{RefetchHook, SyncClient};
pub use error::SyncError;
pub use phase::{SubmissionPhase, SubmissionReport};
