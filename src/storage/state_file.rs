//! JSON state file holding the currently paused records. The whole file is
//! replaced on every save, so readers only ever see complete generations:
//! either the previous paused set or the new one, never a partial mix.

use crate::config::StoreConfig;
use crate::control::ProcessControl;
use crate::probe::ProcessRecord;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("state serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("state file write failed: {0}")]
    Io(#[from] io::Error),
}

/// Outcome of one recovery pass over the state file.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryReport {
    pub found: usize,
    pub resumed: usize,
    pub failed: usize,
}

pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    /// Open the store at the configured location, creating the directory.
    pub fn open(config: &StoreConfig) -> io::Result<Self> {
        fs::create_dir_all(&config.dir)?;
        Ok(Self {
            path: config.dir.join(&config.filename),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the file contents with `records`.
    pub fn save(&self, records: &[ProcessRecord]) -> Result<(), StoreError> {
        let data = serde_json::to_vec(records)?;
        fs::write(&self.path, data)?;
        Ok(())
    }

    /// Read back the persisted records. A missing file is an empty list; a
    /// corrupt one is logged and also read as empty.
    pub fn load(&self) -> Vec<ProcessRecord> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Vec::new(),
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "state file unreadable");
                return Vec::new();
            }
        };
        match serde_json::from_slice(&data) {
            Ok(records) => records,
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "state file corrupt, treating as empty");
                Vec::new()
            }
        }
    }

    /// Delete the file if present.
    pub fn clear(&self) {
        if let Err(err) = fs::remove_file(&self.path) {
            if err.kind() != io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %err, "state file removal failed");
            }
        }
    }

    /// Resume everything the file records as paused, then clear it. Safe on
    /// a missing or empty store, and idempotent when run twice: the first
    /// pass empties the store, the second finds nothing to do.
    pub fn recover(&self, control: &mut dyn ProcessControl) -> RecoveryReport {
        let records = self.load();
        let mut report = RecoveryReport::default();
        for record in records.iter().filter(|r| r.paused) {
            report.found += 1;
            match control.resume(record.pid) {
                Ok(()) => {
                    info!(pid = record.pid, name = %record.name, "resumed from recovery state");
                    report.resumed += 1;
                }
                Err(err) => {
                    warn!(pid = record.pid, error = %err, "recovery resume failed");
                    report.failed += 1;
                }
            }
        }
        self.clear();
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::ControlError;
    use tempfile::tempdir;

    struct TallyControl {
        resumed: Vec<u32>,
        fail: Vec<u32>,
    }

    impl TallyControl {
        fn new() -> Self {
            Self {
                resumed: Vec::new(),
                fail: Vec::new(),
            }
        }
    }

    impl ProcessControl for TallyControl {
        fn pause(&mut self, _pid: u32) -> Result<(), ControlError> {
            Ok(())
        }

        fn resume(&mut self, pid: u32) -> Result<(), ControlError> {
            if self.fail.contains(&pid) {
                return Err(ControlError::NotFound(pid));
            }
            self.resumed.push(pid);
            Ok(())
        }
    }

    fn store_in(dir: &Path) -> StateStore {
        StateStore::open(&StoreConfig {
            dir: dir.to_path_buf(),
            filename: "paused_processes.json".to_string(),
        })
        .unwrap()
    }

    fn paused(pid: u32, name: &str) -> ProcessRecord {
        let mut record = ProcessRecord::new(pid, name, 300.0, 1.0, Some(1));
        record.paused = true;
        record
    }

    #[test]
    fn open_creates_the_directory() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("state").join("deep");
        let store = store_in(&nested);
        assert!(nested.is_dir());
        assert_eq!(store.path(), nested.join("paused_processes.json"));
    }

    #[test]
    fn save_replaces_the_previous_generation() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        store.save(&[paused(10, "a"), paused(20, "b")]).unwrap();
        store.save(&[paused(20, "b")]).unwrap();

        let loaded = store.load();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].pid, 20);
        assert!(loaded[0].paused);
    }

    #[test]
    fn load_of_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());
        assert!(store.load().is_empty());
    }

    #[test]
    fn load_of_corrupt_file_is_empty() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());
        fs::write(store.path(), b"{not json").unwrap();
        assert!(store.load().is_empty());
    }

    #[test]
    fn record_fields_round_trip_through_the_file() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());
        let mut record = ProcessRecord::new(77, "media_indexer", 412.25, 3.5, Some(12));
        record.paused = true;
        store.save(std::slice::from_ref(&record)).unwrap();
        assert_eq!(store.load(), vec![record]);
    }

    #[test]
    fn clear_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());
        store.save(&[paused(10, "a")]).unwrap();
        store.clear();
        store.clear();
        assert!(!store.path().exists());
    }

    #[test]
    fn recover_resumes_paused_records_and_clears() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());
        let mut unpaused = ProcessRecord::new(30, "c", 100.0, 1.0, None);
        unpaused.paused = false;
        store
            .save(&[paused(10, "a"), paused(20, "b"), unpaused])
            .unwrap();

        let mut control = TallyControl::new();
        let report = store.recover(&mut control);

        assert_eq!(report, RecoveryReport { found: 2, resumed: 2, failed: 0 });
        assert_eq!(control.resumed, vec![10, 20]);
        assert!(!store.path().exists());
    }

    #[test]
    fn recover_counts_failures_but_still_clears() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());
        store.save(&[paused(10, "a"), paused(20, "b")]).unwrap();

        let mut control = TallyControl::new();
        control.fail.push(10);
        let report = store.recover(&mut control);

        assert_eq!(report, RecoveryReport { found: 2, resumed: 1, failed: 1 });
        assert!(!store.path().exists());
    }

    #[test]
    fn recover_twice_is_a_no_op_the_second_time() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());
        store.save(&[paused(10, "a")]).unwrap();

        let mut control = TallyControl::new();
        store.recover(&mut control);
        let second = store.recover(&mut control);

        assert_eq!(second, RecoveryReport::default());
        assert_eq!(control.resumed, vec![10]);
    }
}
