//! Persisted counter for ids of locally created features.

use std::path::PathBuf;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::storage::{read_json, write_json_atomic};

/// File name of the persisted counter.
pub const LOCAL_ID_FILE: &str = "local_id.json";

#[derive(Debug, Serialize, Deserialize)]
struct LocalIdState {
    next_id: i64,
}

/// Hands out strictly decreasing negative ids, starting at `-1`.
///
/// The next id is written to disk before it is returned, so ids are never
/// reused after a restart.
#[derive(Debug)]
pub struct LocalIdAllocator {
    next: Mutex<i64>,
    path: Option<PathBuf>,
}

impl LocalIdAllocator {
    /// Allocator that is not persisted.
    pub fn in_memory() -> Self {
        Self {
            next: Mutex::new(-1),
            path: None,
        }
    }

    /// Opens the counter stored at `path`, starting fresh if it is missing.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let next = match read_json::<LocalIdState>(&path) {
            Ok(Some(state)) => state.next_id.min(-1),
            Ok(None) => -1,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Local id counter unreadable, restarting at -1");
                -1
            }
        };
        Self {
            next: Mutex::new(next),
            path: Some(path),
        }
    }

    /// Returns the next id.
    pub fn allocate(&self) -> i64 {
        let mut next = self.next.lock();
        let id = *next;
        *next -= 1;
        self.persist(*next);
        id
    }

    /// Makes sure future ids are below `id`.
    ///
    /// Used at startup so staged features survive a lost counter file.
    pub fn reserve_below(&self, id: i64) {
        let mut next = self.next.lock();
        if id <= *next {
            *next = id - 1;
            self.persist(*next);
        }
    }

    /// The id the next call to [`allocate`](Self::allocate) returns.
    pub fn peek(&self) -> i64 {
        *self.next.lock()
    }

    fn persist(&self, next_id: i64) {
        if let Some(path) = &self.path {
            if let Err(e) = write_json_atomic(path, &LocalIdState { next_id }) {
                warn!(path = %path.display(), error = %e, "Failed to persist local id counter");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_start_at_minus_one_and_decrease() {
        let ids = LocalIdAllocator::in_memory();
        assert_eq!(ids.allocate(), -1);
        assert_eq!(ids.allocate(), -2);
        assert_eq!(ids.allocate(), -3);
    }

    #[test]
    fn test_ids_survive_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(LOCAL_ID_FILE);

        let first = LocalIdAllocator::open(&path);
        assert_eq!(first.allocate(), -1);
        assert_eq!(first.allocate(), -2);
        drop(first);

        let second = LocalIdAllocator::open(&path);
        assert_eq!(second.allocate(), -3);
    }

    #[test]
    fn test_reserve_below_skips_used_ids() {
        let ids = LocalIdAllocator::in_memory();
        ids.reserve_below(-5);
        assert_eq!(ids.allocate(), -6);
        ids.reserve_below(-2);
        assert_eq!(ids.allocate(), -7);
    }

    #[test]
    fn test_corrupt_counter_restarts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(LOCAL_ID_FILE);
        std::fs::write(&path, "garbage").unwrap();
        assert_eq!(LocalIdAllocator::open(&path).peek(), -1);
    }
}
