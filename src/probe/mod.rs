//! Process-table capability: the record type, the probe trait the engine
//! consumes, and operator-target resolution. Platform specifics stay in the
//! sysinfo-backed implementation.

mod system;

pub use system::SystemProbe;

use serde::{Deserialize, Serialize};
use std::fmt;

/// One process as seen in a snapshot. `paused` is flipped by the engine once
/// a stop signal succeeds; every other field is fixed at snapshot time.
///
/// Serialized as-is into the state file, so the field set doubles as the
/// on-disk wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessRecord {
    pub pid: u32,
    pub name: String,
    pub memory_mb: f64,
    pub cpu_percent: f32,
    pub paused: bool,
    pub parent_pid: Option<u32>,
}

impl ProcessRecord {
    pub fn new(
        pid: u32,
        name: impl Into<String>,
        memory_mb: f64,
        cpu_percent: f32,
        parent_pid: Option<u32>,
    ) -> Self {
        Self {
            pid,
            name: name.into(),
            memory_mb,
            cpu_percent,
            paused: false,
            parent_pid,
        }
    }
}

impl fmt::Display for ProcessRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.paused { "PAUSED" } else { "RUNNING" };
        write!(
            f,
            "PID: {}, Name: {}, Memory: {:.2} MB, CPU: {:.1}%, Status: {}",
            self.pid, self.name, self.memory_mb, self.cpu_percent, status
        )
    }
}

/// System-wide memory figures for the pressure check and the cycle report.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryStats {
    pub total_mb: f64,
    pub available_mb: f64,
    pub used_mb: f64,
    pub used_percent: f64,
    pub swap_total_mb: f64,
    pub swap_used_mb: f64,
}

/// What the engine needs from the OS process table. Kept narrow so the
/// monitor and the listener can run against scripted tables in tests.
pub trait ProcessProbe: Send {
    /// Fresh snapshot of every process, unsorted.
    fn snapshot(&mut self) -> Vec<ProcessRecord>;
    /// Whether `pid` currently resolves to a live process.
    fn exists(&mut self, pid: u32) -> bool;
    /// Current name of `pid`, if it is alive.
    fn name_of(&mut self, pid: u32) -> Option<String>;
    /// Parent pid of `pid`, if it is alive and has one.
    fn parent_of(&mut self, pid: u32) -> Option<u32>;
    /// Overall memory and swap figures.
    fn memory(&mut self) -> MemoryStats;
}

/// Resolve an operator-supplied target to a live pid. A numeric target is
/// taken as a pid and must exist; anything else matches case-insensitively as
/// a substring of live process names, first match wins.
pub fn resolve_target(probe: &mut dyn ProcessProbe, target: &str) -> Option<(u32, String)> {
    if let Ok(pid) = target.parse::<u32>() {
        return probe.name_of(pid).map(|name| (pid, name));
    }
    let needle = target.to_lowercase();
    probe
        .snapshot()
        .into_iter()
        .find(|p| p.name.to_lowercase().contains(&needle))
        .map(|p| (p.pid, p.name))
}
