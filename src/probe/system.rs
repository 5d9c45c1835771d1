//! sysinfo-backed probe. Each consumer owns its own `System` and refreshes
//! it on use, so the monitor and the listener never contend over one handle.

use super::{MemoryStats, ProcessProbe, ProcessRecord};
use sysinfo::{Pid, System};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

pub struct SystemProbe {
    sys: System,
}

impl SystemProbe {
    pub fn new() -> Self {
        Self {
            sys: System::new_all(),
        }
    }

    fn refreshed(&mut self, pid: u32) -> Option<&sysinfo::Process> {
        let pid = Pid::from_u32(pid);
        if !self.sys.refresh_process(pid) {
            return None;
        }
        self.sys.process(pid)
    }
}

impl Default for SystemProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessProbe for SystemProbe {
    fn snapshot(&mut self) -> Vec<ProcessRecord> {
        self.sys.refresh_processes();
        self.sys
            .processes()
            .iter()
            .map(|(pid, proc_)| ProcessRecord {
                pid: pid.as_u32(),
                name: proc_.name().to_string(),
                memory_mb: proc_.memory() as f64 / BYTES_PER_MB,
                cpu_percent: proc_.cpu_usage(),
                paused: false,
                parent_pid: proc_.parent().map(|p| p.as_u32()),
            })
            .collect()
    }

    fn exists(&mut self, pid: u32) -> bool {
        self.sys.refresh_process(Pid::from_u32(pid))
    }

    fn name_of(&mut self, pid: u32) -> Option<String> {
        self.refreshed(pid).map(|p| p.name().to_string())
    }

    fn parent_of(&mut self, pid: u32) -> Option<u32> {
        self.refreshed(pid).and_then(|p| p.parent()).map(|p| p.as_u32())
    }

    fn memory(&mut self) -> MemoryStats {
        self.sys.refresh_memory();
        let total = self.sys.total_memory() as f64 / BYTES_PER_MB;
        let used = self.sys.used_memory() as f64 / BYTES_PER_MB;
        MemoryStats {
            total_mb: total,
            available_mb: self.sys.available_memory() as f64 / BYTES_PER_MB,
            used_mb: used,
            used_percent: if total > 0.0 { used / total * 100.0 } else { 0.0 },
            swap_total_mb: self.sys.total_swap() as f64 / BYTES_PER_MB,
            swap_used_mb: self.sys.used_swap() as f64 / BYTES_PER_MB,
        }
    }
}
