//! The edit staging store.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::local_id::{LocalIdAllocator, LOCAL_ID_FILE};
use super::object::StagedObject;
use super::persistence::{
    JsonFilePersistence, MemoryPersistence, StagedMap, StagingMap, StagingPersistence,
};
use crate::preset::TagMap;

/// What [`EditStagingStore::stage`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    /// The object is now in pending-save.
    Staged,
    /// The tags matched the baseline; the object was dropped from pending-save.
    Reverted,
}

/// A change to the store, delivered to observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StagingEvent {
    Staged { id: i64 },
    Reverted { id: i64 },
    MarkedDeleted { id: i64 },
    Discarded { id: i64 },
    Submitted { saves: Vec<i64>, deletes: Vec<i64> },
}

/// Copy of both maps taken right after a change.
#[derive(Debug, Clone, Default)]
pub struct StagingSnapshot {
    pub saves: Vec<StagedObject>,
    pub deletes: Vec<StagedObject>,
}

/// Receives store change notifications.
///
/// Called after the store lock is released, so observers may read the store.
pub trait StagingObserver: Send + Sync {
    fn staging_changed(&self, event: &StagingEvent, snapshot: &StagingSnapshot);
}

/// Identifies an observer registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

#[derive(Debug, Default)]
struct Maps {
    saves: StagedMap,
    deletes: StagedMap,
}

/// Sorted ids present in both sets.
pub fn detect_conflicts(
    save_ids: impl IntoIterator<Item = i64>,
    delete_ids: impl IntoIterator<Item = i64>,
) -> Vec<i64> {
    let saves: BTreeSet<i64> = save_ids.into_iter().collect();
    let deletes: BTreeSet<i64> = delete_ids.into_iter().collect();
    saves.intersection(&deletes).copied().collect()
}

/// Removes each submitted entry whose staged copy still carries the uploaded
/// content, returning the removed ids.
fn remove_unchanged(map: &mut StagedMap, submitted: &[StagedObject]) -> Vec<i64> {
    let unchanged: Vec<i64> = submitted
        .iter()
        .filter(|sent| {
            map.get(&sent.id)
                .is_some_and(|current| current.same_content(sent))
        })
        .map(|sent| sent.id)
        .collect();
    for id in &unchanged {
        map.remove(id);
    }
    unchanged
}

/// Pending creations, modifications and deletions.
///
/// Every mutation is written through to the persistence backend. Write
/// failures are logged; the in-memory maps stay authoritative.
pub struct EditStagingStore {
    maps: Mutex<Maps>,
    persistence: Arc<dyn StagingPersistence>,
    local_ids: LocalIdAllocator,
    observers: Mutex<Vec<(Subscription, Arc<dyn StagingObserver>)>>,
    next_subscription: AtomicU64,
}

impl EditStagingStore {
    /// Opens the store in a data directory.
    pub fn open(data_dir: &Path) -> Self {
        Self::with_persistence(
            Arc::new(JsonFilePersistence::new(data_dir)),
            LocalIdAllocator::open(data_dir.join(LOCAL_ID_FILE)),
        )
    }

    /// A store that keeps nothing on disk.
    pub fn in_memory() -> Self {
        Self::with_persistence(
            Arc::new(MemoryPersistence::new()),
            LocalIdAllocator::in_memory(),
        )
    }

    /// Builds a store on an arbitrary backend, loading its current contents.
    pub fn with_persistence(
        persistence: Arc<dyn StagingPersistence>,
        local_ids: LocalIdAllocator,
    ) -> Self {
        let load = |map: StagingMap| {
            persistence.load(map).unwrap_or_else(|e| {
                warn!(file = map.file_name(), error = %e, "Failed to load staged edits, starting empty");
                StagedMap::new()
            })
        };
        let maps = Maps {
            saves: load(StagingMap::PendingSave),
            deletes: load(StagingMap::PendingDelete),
        };

        // Never hand out an id that is already staged
        if let Some(&lowest) = maps.saves.keys().chain(maps.deletes.keys()).min() {
            local_ids.reserve_below(lowest);
        }

        info!(
            pending_save = maps.saves.len(),
            pending_delete = maps.deletes.len(),
            "Staging store opened"
        );

        Self {
            maps: Mutex::new(maps),
            persistence,
            local_ids,
            observers: Mutex::new(Vec::new()),
            next_subscription: AtomicU64::new(1),
        }
    }

    /// Stages `object` with `new_tags`.
    ///
    /// Local features are always kept. Server features whose tags are empty
    /// or equal to the baseline are dropped from pending-save instead.
    pub fn stage(&self, mut object: StagedObject, new_tags: TagMap) -> StageOutcome {
        let id = object.id;
        let (outcome, event) = {
            let mut maps = self.maps.lock();

            // The first staged baseline sticks
            if let Some(existing) = maps.saves.get(&id) {
                object.baseline = existing.baseline.clone();
            }

            let outcome = if !object.is_local() && (new_tags.is_empty() || new_tags == object.baseline) {
                maps.saves.remove(&id);
                StageOutcome::Reverted
            } else {
                object.tags = new_tags;
                object.staged_at = Utc::now();
                maps.saves.insert(id, object);
                StageOutcome::Staged
            };
            self.persist(StagingMap::PendingSave, &maps.saves);

            let event = match outcome {
                StageOutcome::Staged => StagingEvent::Staged { id },
                StageOutcome::Reverted => StagingEvent::Reverted { id },
            };
            (outcome, event)
        };

        debug!(id, ?outcome, "Staged object");
        self.notify(event);
        outcome
    }

    /// Adds `object` to pending-delete.
    ///
    /// The same id may stay in pending-save; [`conflicts`](Self::conflicts)
    /// reports such ids and submission refuses to run until they are resolved.
    pub fn mark_deleted(&self, mut object: StagedObject) {
        let id = object.id;
        {
            let mut maps = self.maps.lock();
            object.staged_at = Utc::now();
            maps.deletes.insert(id, object);
            self.persist(StagingMap::PendingDelete, &maps.deletes);
        }
        debug!(id, "Marked object for deletion");
        self.notify(StagingEvent::MarkedDeleted { id });
    }

    /// Drops `id` from both maps, returning the object reset to its baseline.
    pub fn discard(&self, id: i64) -> Option<StagedObject> {
        let removed = {
            let mut maps = self.maps.lock();
            let saved = maps.saves.remove(&id);
            let deleted = maps.deletes.remove(&id);
            if saved.is_some() {
                self.persist(StagingMap::PendingSave, &maps.saves);
            }
            if deleted.is_some() {
                self.persist(StagingMap::PendingDelete, &maps.deletes);
            }
            saved.or(deleted)
        };

        let object = removed?;
        debug!(id, "Discarded staged object");
        self.notify(StagingEvent::Discarded { id });
        Some(object.reverted())
    }

    /// Ids that are both staged for saving and marked for deletion.
    pub fn conflicts(&self) -> Vec<i64> {
        let maps = self.maps.lock();
        detect_conflicts(
            maps.saves.keys().copied(),
            maps.deletes.keys().copied(),
        )
    }

    /// Removes entries that were uploaded successfully.
    ///
    /// An entry leaves the store only while it still matches the uploaded
    /// copy. Anything staged again after the snapshot was taken stays
    /// pending for the next submission.
    ///
    /// # Arguments
    ///
    /// * `saves` - Creations and modifications exactly as they were uploaded
    /// * `deletes` - Deletions exactly as they were uploaded
    pub fn remove_submitted(&self, saves: &[StagedObject], deletes: &[StagedObject]) {
        let (removed_saves, removed_deletes) = {
            let mut maps = self.maps.lock();
            let removed_saves = remove_unchanged(&mut maps.saves, saves);
            let removed_deletes = remove_unchanged(&mut maps.deletes, deletes);
            self.persist(StagingMap::PendingSave, &maps.saves);
            self.persist(StagingMap::PendingDelete, &maps.deletes);
            (removed_saves, removed_deletes)
        };

        let kept = saves.len() + deletes.len() - removed_saves.len() - removed_deletes.len();
        if kept > 0 {
            info!(kept, "Edits changed during upload stay staged");
        }
        info!(
            saved = removed_saves.len(),
            deleted = removed_deletes.len(),
            "Removed submitted edits"
        );
        self.notify(StagingEvent::Submitted {
            saves: removed_saves,
            deletes: removed_deletes,
        });
    }

    /// Next id for a locally created feature.
    pub fn allocate_local_id(&self) -> i64 {
        self.local_ids.allocate()
    }

    pub fn pending_saves(&self) -> Vec<StagedObject> {
        self.maps.lock().saves.values().cloned().collect()
    }

    pub fn pending_deletes(&self) -> Vec<StagedObject> {
        self.maps.lock().deletes.values().cloned().collect()
    }

    pub fn get_saved(&self, id: i64) -> Option<StagedObject> {
        self.maps.lock().saves.get(&id).cloned()
    }

    pub fn is_deleted(&self, id: i64) -> bool {
        self.maps.lock().deletes.contains_key(&id)
    }

    /// Total number of staged entries across both maps.
    pub fn len(&self) -> usize {
        let maps = self.maps.lock();
        maps.saves.len() + maps.deletes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Both maps, copied.
    pub fn snapshot(&self) -> StagingSnapshot {
        let maps = self.maps.lock();
        StagingSnapshot {
            saves: maps.saves.values().cloned().collect(),
            deletes: maps.deletes.values().cloned().collect(),
        }
    }

    /// Registers an observer.
    pub fn subscribe(&self, observer: Arc<dyn StagingObserver>) -> Subscription {
        let subscription = Subscription(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.observers.lock().push((subscription, observer));
        subscription
    }

    /// Removes an observer; returns whether it was registered.
    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        let mut observers = self.observers.lock();
        let before = observers.len();
        observers.retain(|(s, _)| *s != subscription);
        observers.len() != before
    }

    fn persist(&self, map: StagingMap, objects: &StagedMap) {
        if let Err(e) = self.persistence.save(map, objects) {
            warn!(file = map.file_name(), error = %e, "Failed to persist staged edits");
        }
    }

    fn notify(&self, event: StagingEvent) {
        let observers: Vec<Arc<dyn StagingObserver>> = self
            .observers
            .lock()
            .iter()
            .map(|(_, o)| Arc::clone(o))
            .collect();
        if observers.is_empty() {
            return;
        }
        let snapshot = self.snapshot();
        for observer in observers {
            observer.staging_changed(&event, &snapshot);
        }
    }
}

impl std::fmt::Debug for EditStagingStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let maps = self.maps.lock();
        f.debug_struct("EditStagingStore")
            .field("pending_save", &maps.saves.len())
            .field("pending_delete", &maps.deletes.len())
            .finish()
    }
}
