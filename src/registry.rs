//! Ordered ledger of the processes this program has paused.

use crate::probe::ProcessRecord;

/// A record lives here from the moment a stop signal succeeds until a resume
/// succeeds or the pid disappears. Insertion order is preserved, which keeps
/// the persisted file stable across rewrites.
#[derive(Debug, Default)]
pub struct PausedRegistry {
    records: Vec<ProcessRecord>,
}

impl PausedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a record whose pause signal just succeeded. An existing entry
    /// for the pid is marked paused instead of duplicated.
    pub fn insert_paused(&mut self, mut record: ProcessRecord) {
        record.paused = true;
        if let Some(existing) = self.records.iter_mut().find(|r| r.pid == record.pid) {
            existing.paused = true;
        } else {
            self.records.push(record);
        }
    }

    /// Drop the entry for `pid`, returning it if present.
    pub fn remove(&mut self, pid: u32) -> Option<ProcessRecord> {
        let idx = self.records.iter().position(|r| r.pid == pid)?;
        Some(self.records.remove(idx))
    }

    pub fn is_paused(&self, pid: u32) -> bool {
        self.records.iter().any(|r| r.pid == pid && r.paused)
    }

    /// Currently paused subset in insertion order. This is exactly what gets
    /// persisted.
    pub fn paused_records(&self) -> Vec<ProcessRecord> {
        self.records.iter().filter(|r| r.paused).cloned().collect()
    }

    pub fn paused_count(&self) -> usize {
        self.records.iter().filter(|r| r.paused).count()
    }

    /// Keep only records whose pid is still alive; returns what was dropped.
    pub fn retain_live(&mut self, mut alive: impl FnMut(u32) -> bool) -> Vec<ProcessRecord> {
        let mut dropped = Vec::new();
        self.records.retain(|r| {
            if alive(r.pid) {
                true
            } else {
                dropped.push(r.clone());
                false
            }
        });
        dropped
    }

    /// Empty the ledger, handing back everything it held.
    pub fn drain(&mut self) -> Vec<ProcessRecord> {
        std::mem::take(&mut self.records)
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

    fn record(pid: u32, name: &str) -> ProcessRecord {
        ProcessRecord::new(pid, name, 300.0, 1.0, Some(1))
    }

    #[test]
    fn insert_marks_paused_and_deduplicates() {
        let mut registry = PausedRegistry::new();
        registry.insert_paused(record(10, "a"));
        registry.insert_paused(record(10, "a"));
        assert_eq!(registry.len(), 1);
        assert!(registry.is_paused(10));
        assert_eq!(registry.paused_count(), 1);
    }

    #[test]
    fn paused_records_keep_insertion_order() {
        let mut registry = PausedRegistry::new();
        registry.insert_paused(record(30, "c"));
        registry.insert_paused(record(10, "a"));
        registry.insert_paused(record(20, "b"));
        let pids: Vec<u32> = registry.paused_records().iter().map(|r| r.pid).collect();
        assert_eq!(pids, vec![30, 10, 20]);
    }

    #[test]
    fn remove_forgets_the_pid() {
        let mut registry = PausedRegistry::new();
        registry.insert_paused(record(10, "a"));
        let removed = registry.remove(10);
        assert_eq!(removed.map(|r| r.pid), Some(10));
        assert!(!registry.is_paused(10));
        assert!(registry.is_empty());
        assert!(registry.remove(10).is_none());
    }

    #[test]
    fn retain_live_reports_the_dropped() {
        let mut registry = PausedRegistry::new();
        registry.insert_paused(record(10, "a"));
        registry.insert_paused(record(20, "b"));
        let dropped = registry.retain_live(|pid| pid != 20);
        assert_eq!(dropped.len(), 1);
        assert_eq!(dropped[0].pid, 20);
        assert!(registry.is_paused(10));
        assert!(!registry.is_paused(20));
    }

    #[test]
    fn drain_empties_the_ledger() {
        let mut registry = PausedRegistry::new();
        registry.insert_paused(record(10, "a"));
        let drained = registry.drain();
        assert_eq!(drained.len(), 1);
        assert!(registry.is_empty());
    }
}
