//! Integration tests for the edit staging store on disk.
//!
//! Each test opens a store in a temp data directory, closes it, and opens it
//! again to check what survives a restart.
//!
//! Run with: `cargo test --test staging_integration`

use std::collections::HashSet;
use std::fs;

use tempfile::TempDir;

use osmtagger::coord::GeoPoint;
use osmtagger::preset::TagMap;
use osmtagger::staging::{EditStagingStore, StageOutcome, StagedObject, StagingMap, LOCAL_ID_FILE};

fn tags(pairs: &[(&str, &str)]) -> TagMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn remote_node(id: i64, pairs: &[(&str, &str)]) -> StagedObject {
    let mut object = StagedObject::new_node(id, GeoPoint::new(48.85, 2.35));
    object.version = 4;
    object.tags = tags(pairs);
    object.baseline = tags(pairs);
    object
}

/// Local ids keep counting down across restarts.
#[test]
fn test_local_ids_never_repeat_across_restarts() {
    let dir = TempDir::new().unwrap();
    let mut seen = HashSet::new();

    for _ in 0..3 {
        let store = EditStagingStore::open(dir.path());
        for _ in 0..4 {
            assert!(seen.insert(store.allocate_local_id()));
        }
    }
    assert_eq!(seen.len(), 12);
    assert!(seen.iter().all(|id| *id < 0));
}

/// A lost counter file does not hand out ids still used by staged objects.
#[test]
fn test_lost_counter_respects_staged_ids() {
    let dir = TempDir::new().unwrap();
    {
        let store = EditStagingStore::open(dir.path());
        for _ in 0..3 {
            let id = store.allocate_local_id();
            store.stage(StagedObject::new_node(id, GeoPoint::new(0.0, 0.0)), tags(&[("a", "b")]));
        }
    }
    fs::remove_file(dir.path().join(LOCAL_ID_FILE)).unwrap();

    let store = EditStagingStore::open(dir.path());
    assert_eq!(store.allocate_local_id(), -4);
}

/// A corrupt counter file is reseeded below the lowest staged id.
#[test]
fn test_corrupt_counter_respects_staged_ids() {
    let dir = TempDir::new().unwrap();
    {
        let store = EditStagingStore::open(dir.path());
        for _ in 0..2 {
            let id = store.allocate_local_id();
            store.stage(StagedObject::new_node(id, GeoPoint::new(0.0, 0.0)), tags(&[("a", "b")]));
        }
    }
    fs::write(dir.path().join(LOCAL_ID_FILE), "{not json").unwrap();

    let store = EditStagingStore::open(dir.path());
    assert_eq!(store.allocate_local_id(), -3);
}

/// Pending saves and deletes are restored with their tags and baselines.
#[test]
fn test_pending_maps_survive_restart() {
    let dir = TempDir::new().unwrap();
    {
        let store = EditStagingStore::open(dir.path());
        let outcome = store.stage(
            remote_node(10, &[("amenity", "cafe")]),
            tags(&[("amenity", "cafe"), ("name", "Joe's")]),
        );
        assert_eq!(outcome, StageOutcome::Staged);
        store.mark_deleted(remote_node(11, &[("amenity", "bench")]));
    }
    assert!(dir.path().join(StagingMap::PendingSave.file_name()).exists());
    assert!(dir.path().join(StagingMap::PendingDelete.file_name()).exists());

    let store = EditStagingStore::open(dir.path());
    let saved = store.get_saved(10).unwrap();
    assert_eq!(saved.tags["name"], "Joe's");
    assert_eq!(saved.baseline, tags(&[("amenity", "cafe")]));
    assert!(store.is_deleted(11));
    assert!(store.conflicts().is_empty());
}

/// Editing back to the original tags removes the entry, also on disk.
#[test]
fn test_revert_removes_entry_after_restart() {
    let dir = TempDir::new().unwrap();
    let original = remote_node(20, &[("shop", "bakery")]);
    {
        let store = EditStagingStore::open(dir.path());
        store.stage(original.clone(), tags(&[("shop", "pastry")]));
        let edited = store.get_saved(20).unwrap();
        assert_eq!(
            store.stage(edited, tags(&[("shop", "bakery")])),
            StageOutcome::Reverted
        );
    }

    let store = EditStagingStore::open(dir.path());
    assert!(store.get_saved(20).is_none());
    assert!(store.is_empty());
}

/// A corrupt pending file is ignored rather than blocking startup.
#[test]
fn test_corrupt_pending_file_is_ignored() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(StagingMap::PendingSave.file_name()), "not json").unwrap();

    let store = EditStagingStore::open(dir.path());
    assert!(store.pending_saves().is_empty());
}
