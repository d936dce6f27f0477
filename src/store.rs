//! Durable activity checkpoint and merge reconciliation.
//!
//! The store is the sync checkpoint: a JSON array of activities loaded at
//! the start of a run, merged in memory, and written back wholesale at the
//! end. Merge is an upsert by id; records outside the fetch window are
//! retained untouched, because absence from an incremental pull does not
//! mean deletion upstream.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use log::{info, warn};

use crate::errors::SyncError;
use crate::models::Activity;

/// Counts reported by one merge call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MergeOutcome {
    pub updated: usize,
    pub added: usize,
}

/// Insertion-ordered activity set indexed by id.
#[derive(Debug, Default)]
pub struct ActivityStore {
    records: Vec<Activity>,
    index: HashMap<u64, usize>,
}

impl ActivityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<Activity>) -> Self {
        let mut store = Self::new();
        store.merge(records);
        store
    }

    /// Load the checkpoint, recovering to an empty store on any failure.
    ///
    /// A missing or unreadable file is logged and treated as "no history",
    /// which makes the next fetch run in bootstrap mode.
    pub fn load(path: &Path) -> Self {
        let raw = match fs::read(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!("no checkpoint at {}, starting fresh", path.display());
                return Self::new();
            }
            Err(err) => {
                warn!("could not read checkpoint {}: {err}", path.display());
                return Self::new();
            }
        };
        match serde_json::from_slice::<Vec<Activity>>(&raw) {
            Ok(records) => {
                let store = Self::from_records(records);
                info!(
                    "loaded {} activities from {}",
                    store.len(),
                    path.display()
                );
                store
            }
            Err(err) => {
                warn!("corrupt checkpoint {}: {err}", path.display());
                Self::new()
            }
        }
    }

    /// Write the full set back, replacing the previous checkpoint atomically.
    pub fn save(&self, path: &Path) -> Result<(), SyncError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|err| SyncError::Persistence(err.to_string()))?;
        }
        let body = serde_json::to_vec_pretty(&self.records)
            .map_err(|err| SyncError::Persistence(err.to_string()))?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, body).map_err(|err| SyncError::Persistence(err.to_string()))?;
        fs::rename(&tmp, path).map_err(|err| SyncError::Persistence(err.to_string()))?;
        info!("saved {} activities to {}", self.len(), path.display());
        Ok(())
    }

    /// Upsert each incoming record by id. Existing ids are replaced in place
    /// (the latest fetched copy always wins), unknown ids are appended.
    pub fn merge(&mut self, incoming: Vec<Activity>) -> MergeOutcome {
        let mut outcome = MergeOutcome::default();
        for activity in incoming {
            match self.index.get(&activity.id) {
                Some(&slot) => {
                    self.records[slot] = activity;
                    outcome.updated += 1;
                }
                None => {
                    self.index.insert(activity.id, self.records.len());
                    self.records.push(activity);
                    outcome.added += 1;
                }
            }
        }
        outcome
    }

    pub fn records(&self) -> &[Activity] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn activity(id: u64, name: &str) -> Activity {
        serde_json::from_value(json!({ "id": id, "name": name })).unwrap()
    }

    #[test]
    fn merge_updates_existing_and_appends_new() {
        let mut store = ActivityStore::from_records(vec![activity(1, "a")]);
        let outcome = store.merge(vec![activity(1, "b"), activity(2, "c")]);
        assert_eq!(outcome, MergeOutcome { updated: 1, added: 1 });
        assert_eq!(store.len(), 2);
        assert_eq!(store.records()[0].name, "b");
        assert_eq!(store.records()[1].name, "c");
    }

    #[test]
    fn merge_of_empty_batch_is_a_no_op() {
        let mut store = ActivityStore::new();
        let outcome = store.merge(Vec::new());
        assert_eq!(outcome, MergeOutcome::default());
        assert!(store.is_empty());
    }

    #[test]
    fn merge_is_idempotent() {
        let batch = vec![activity(1, "a"), activity(2, "b"), activity(3, "c")];
        let mut store = ActivityStore::new();
        let first = store.merge(batch.clone());
        assert_eq!(first, MergeOutcome { updated: 0, added: 3 });
        let snapshot: Vec<Activity> = store.records().to_vec();

        let second = store.merge(batch);
        assert_eq!(second, MergeOutcome { updated: 3, added: 0 });
        assert_eq!(store.records(), snapshot.as_slice());
    }

    #[test]
    fn merge_never_produces_duplicate_ids() {
        let mut store = ActivityStore::from_records(vec![activity(1, "a"), activity(2, "b")]);
        store.merge(vec![activity(2, "b2"), activity(3, "c"), activity(3, "c2")]);
        let mut ids: Vec<u64> = store.records().iter().map(|a| a.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), store.len());
    }

    #[test]
    fn later_duplicate_in_one_batch_wins() {
        let mut store = ActivityStore::new();
        let outcome = store.merge(vec![activity(7, "first"), activity(7, "second")]);
        assert_eq!(outcome, MergeOutcome { updated: 1, added: 1 });
        assert_eq!(store.records()[0].name, "second");
    }

    #[test]
    fn records_outside_the_batch_are_retained() {
        let mut store = ActivityStore::from_records(vec![activity(1, "old"), activity(2, "kept")]);
        store.merge(vec![activity(1, "new")]);
        assert_eq!(store.records()[1].name, "kept");
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("activities.json");
        let store = ActivityStore::from_records(vec![activity(1, "a"), activity(2, "b")]);
        store.save(&path).unwrap();

        let loaded = ActivityStore::load(&path);
        assert_eq!(loaded.records(), store.records());
    }

    #[test]
    fn missing_checkpoint_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = ActivityStore::load(&dir.path().join("nope.json"));
        assert!(store.is_empty());
    }

    #[test]
    fn corrupt_checkpoint_recovers_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("activities.json");
        fs::write(&path, b"{ not json").unwrap();
        let store = ActivityStore::load(&path);
        assert!(store.is_empty());
    }

    #[test]
    fn save_into_unwritable_location_is_a_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        // A file where a directory is needed makes create_dir_all fail.
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"x").unwrap();
        let store = ActivityStore::new();
        let err = store.save(&blocker.join("activities.json")).unwrap_err();
        assert_eq!(err.code(), "PER-1004");
    }
}
