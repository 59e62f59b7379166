//! Local edit staging.
//!
//! Created and modified features wait in a pending-save map, deletions in a
//! pending-delete map, until a changeset uploads them. Both maps survive
//! restarts, as does the counter handing out negative ids for new features.

mod local_id;
mod object;
mod persistence;
mod store;

pub use local_id::{LocalIdAllocator, LOCAL_ID_FILE};
pub use object::StagedObject;
pub use persistence::{
    JsonFilePersistence, MemoryPersistence, StagedMap, StagingMap, StagingPersistence,
};
pub use store::{
    detect_conflicts, EditStagingStore, StageOutcome, StagingEvent, StagingObserver,
    StagingSnapshot, Subscription,
};
