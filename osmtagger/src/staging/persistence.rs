//! Durable storage for the staging maps.

use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use super::object::StagedObject;
use crate::storage::{read_json, write_json_atomic};

/// Staged objects keyed by id.
pub type StagedMap = BTreeMap<i64, StagedObject>;

/// Which of the two staging maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StagingMap {
    PendingSave,
    PendingDelete,
}

impl StagingMap {
    /// File name the map is stored under.
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::PendingSave => "pending_save.json",
            Self::PendingDelete => "pending_delete.json",
        }
    }
}

/// Storage backend for the staging maps.
pub trait StagingPersistence: Send + Sync {
    /// Loads a map; a map that was never saved is empty.
    fn load(&self, map: StagingMap) -> io::Result<StagedMap>;

    /// Replaces the stored map.
    fn save(&self, map: StagingMap, objects: &StagedMap) -> io::Result<()>;
}

/// Stores each map as a JSON array in a data directory.
#[derive(Debug, Clone)]
pub struct JsonFilePersistence {
    dir: PathBuf,
}

impl JsonFilePersistence {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, map: StagingMap) -> PathBuf {
        self.dir.join(map.file_name())
    }
}

impl StagingPersistence for JsonFilePersistence {
    fn load(&self, map: StagingMap) -> io::Result<StagedMap> {
        let objects: Vec<StagedObject> = read_json(&self.path(map))?.unwrap_or_default();
        Ok(objects.into_iter().map(|o| (o.id, o)).collect())
    }

    fn save(&self, map: StagingMap, objects: &StagedMap) -> io::Result<()> {
        let list: Vec<&StagedObject> = objects.values().collect();
        write_json_atomic(&self.path(map), &list)
    }
}

/// In-memory backend, optionally failing every write.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    maps: Mutex<HashMap<StagingMap, StagedMap>>,
    fail_writes: AtomicBool,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent saves fail with an I/O error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// What was last saved for `map`.
    pub fn stored(&self, map: StagingMap) -> StagedMap {
        self.maps.lock().get(&map).cloned().unwrap_or_default()
    }
}

impl StagingPersistence for MemoryPersistence {
    fn load(&self, map: StagingMap) -> io::Result<StagedMap> {
        Ok(self.stored(map))
    }

    fn save(&self, map: StagingMap, objects: &StagedMap) -> io::Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(io::Error::other("simulated write failure"));
        }
        self.maps.lock().insert(map, objects.clone());
        Ok(())
    }
}
