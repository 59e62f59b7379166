//! The changeset submission client.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::error::SyncError;
use super::phase::{SubmissionPhase, SubmissionReport};
use crate::osm::{Authenticator, OsmApi, OsmChange, OsmTransport};
use crate::staging::EditStagingStore;

/// Called after a successful upload so the map can reload the area.
pub trait RefetchHook: Send + Sync {
    fn refetch(&self);
}

/// Clears the busy flag and resets the phase when a submission ends.
struct BusyGuard<'a> {
    busy: &'a AtomicBool,
    phase: &'a watch::Sender<SubmissionPhase>,
}

impl<'a> BusyGuard<'a> {
    fn acquire(busy: &'a AtomicBool, phase: &'a watch::Sender<SubmissionPhase>) -> Option<Self> {
        busy.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { busy, phase })
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.phase.send_replace(SubmissionPhase::Idle);
        self.busy.store(false, Ordering::Release);
    }
}

/// Uploads staged edits as one changeset.
///
/// Runs auth check, changeset open, upload and close in order. Only one
/// submission runs at a time per client.
pub struct SyncClient<T> {
    api: OsmApi<T>,
    auth: Authenticator<T>,
    created_by: String,
    default_comment: Option<String>,
    refetch: Option<Arc<dyn RefetchHook>>,
    busy: AtomicBool,
    phase: watch::Sender<SubmissionPhase>,
}

impl<T: OsmTransport> SyncClient<T> {
    /// Create a sync client.
    ///
    /// # Arguments
    ///
    /// * `api` - API client the changeset requests go through
    /// * `auth` - Source of access tokens, logging in when needed
    pub fn new(api: OsmApi<T>, auth: Authenticator<T>) -> Self {
        let (phase, _) = watch::channel(SubmissionPhase::Idle);
        Self {
            api,
            auth,
            created_by: format!("osmtagger {}", crate::VERSION),
            default_comment: None,
            refetch: None,
            busy: AtomicBool::new(false),
            phase,
        }
    }

    /// Comment used when `submit` gets none.
    pub fn with_default_comment(mut self, comment: impl Into<String>) -> Self {
        let comment = comment.into();
        self.default_comment = (!comment.trim().is_empty()).then_some(comment);
        self
    }

    /// Set the hook asked to reload the map area after an upload.
    pub fn with_refetch_hook(mut self, hook: Arc<dyn RefetchHook>) -> Self {
        self.refetch = Some(hook);
        self
    }

    pub fn authenticator(&self) -> &Authenticator<T> {
        &self.auth
    }

    pub fn api(&self) -> &OsmApi<T> {
        &self.api
    }

    /// Follows the phase of the running submission.
    pub fn phase(&self) -> watch::Receiver<SubmissionPhase> {
        self.phase.subscribe()
    }

    /// Whether a submission is running.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Uploads everything staged in `store`.
    ///
    /// Conflicting or empty staging is refused before any network call.
    /// Submitted entries leave the store only after the upload succeeded.
    ///
    /// # Arguments
    ///
    /// * `store` - Staging store to read edits from and clear on success
    /// * `comment` - Changeset comment; the default or a generated one is
    ///   used when `None` or blank
    ///
    /// # Returns
    ///
    /// The changeset id with counts of what was uploaded and skipped.
    ///
    /// # Errors
    ///
    /// * `SyncError::Busy` - Another submission is running
    /// * `SyncError::StagingConflict` - Ids are both edited and deleted
    /// * `SyncError::NothingToSubmit` - No uploadable entries
    /// * `SyncError::Auth` - Login failed or was cancelled
    /// * `SyncError::OpenChangeset` / `SyncError::Upload` - The server
    ///   refused a step; staged edits are kept
    pub async fn submit(
        &self,
        store: &EditStagingStore,
        comment: Option<&str>,
    ) -> Result<SubmissionReport, SyncError> {
        let _guard = BusyGuard::acquire(&self.busy, &self.phase).ok_or(SyncError::Busy)?;

        let conflicts = store.conflicts();
        if !conflicts.is_empty() {
            warn!(ids = ?conflicts, "Refusing to submit conflicting edits");
            return Err(SyncError::StagingConflict { ids: conflicts });
        }
        let saves = store.pending_saves();
        let deletes = store.pending_deletes();
        if saves.is_empty() && deletes.is_empty() {
            return Err(SyncError::NothingToSubmit);
        }

        self.phase.send_replace(SubmissionPhase::AuthCheck);
        let token = self.auth.ensure_token().await?;

        let (mut change, skipped) = OsmChange::build(&saves, &deletes);
        if change.is_empty() {
            return Err(SyncError::NothingToSubmit);
        }
        let comment = comment
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .or_else(|| self.default_comment.clone())
            .unwrap_or_else(|| auto_comment(&change));

        self.phase.send_replace(SubmissionPhase::ChangesetOpen);
        let changeset_id = self
            .api
            .open_changeset(&token, &comment, &self.created_by)
            .await
            .map_err(SyncError::OpenChangeset)?;

        change.stamp(changeset_id);

        self.phase
            .send_replace(SubmissionPhase::ChangesetUpload { changeset_id });
        if let Err(source) = self.api.upload(&token, changeset_id, &change).await {
            warn!(changeset = changeset_id, error = %source, "Upload failed, staged edits kept");
            self.phase
                .send_replace(SubmissionPhase::ChangesetClose { changeset_id });
            self.close_quietly(&token, changeset_id).await;
            return Err(SyncError::Upload {
                changeset_id,
                source,
            });
        }

        store.remove_submitted(&change.saved(), &change.deleted());
        if let Some(hook) = &self.refetch {
            debug!("Requesting area refetch");
            hook.refetch();
        }

        self.phase
            .send_replace(SubmissionPhase::ChangesetClose { changeset_id });
        let closed = self.close_quietly(&token, changeset_id).await;

        let report = SubmissionReport {
            changeset_id,
            created: change.create.len(),
            modified: change.modify.len(),
            deleted: change.delete.len(),
            skipped,
            closed,
        };
        info!(
            changeset = changeset_id,
            created = report.created,
            modified = report.modified,
            deleted = report.deleted,
            "Submission complete"
        );
        Ok(report)
    }

    /// Best-effort close; failures are only logged.
    async fn close_quietly(&self, token: &str, changeset_id: u64) -> bool {
        match self.api.close_changeset(token, changeset_id).await {
            Ok(()) => true,
            Err(e) => {
                warn!(changeset = changeset_id, error = %e, "Failed to close changeset");
                false
            }
        }
    }
}

/// Describes a change document in words.
fn auto_comment(change: &OsmChange) -> String {
    let parts: Vec<String> = [
        ("Created", change.create.len()),
        ("modified", change.modify.len()),
        ("deleted", change.delete.len()),
    ]
    .into_iter()
    .filter(|(_, n)| *n > 0)
    .map(|(verb, n)| format!("{} {} {}", verb, n, if n == 1 { "object" } else { "objects" }))
    .collect();
    let text = parts.join(", ");
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => text,
    }
}
