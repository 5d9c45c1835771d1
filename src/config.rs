//! Engine and store configuration. Built by the CLI layer, consumed by the
//! engine; tests construct these directly.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Knobs for the monitor engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Pid whose memory the engine protects.
    pub priority_pid: u32,
    /// Minimum resident size before a process is a pause candidate.
    pub threshold_mb: f64,
    /// Cap on how many processes the periodic cycle keeps paused at once.
    pub max_pause: usize,
    /// Delay between monitor cycles.
    pub check_interval: Duration,
    /// Push the host toward swapping when memory use is high.
    pub force_swap: bool,
    /// Park in the start gate until the operator types `start`.
    pub wait_for_start: bool,
    /// Pids excluded from suspension before the first cycle.
    pub initial_exclusions: Vec<u32>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            priority_pid: 0,
            threshold_mb: 200.0,
            max_pause: 5,
            check_interval: Duration::from_secs(10),
            force_swap: false,
            wait_for_start: false,
            initial_exclusions: Vec::new(),
        }
    }
}

/// Where the paused-state file lives. The default sits under the system temp
/// directory at a fixed name, so an independent `recover` invocation finds
/// the same file a crashed session left behind.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub dir: PathBuf,
    pub filename: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: env::temp_dir().join("memprio"),
            filename: "paused_processes.json".to_string(),
        }
    }
}

impl StoreConfig {
    pub fn with_dir(dir: PathBuf) -> Self {
        Self {
            dir,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_defaults_match_the_cli_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.threshold_mb, 200.0);
        assert_eq!(config.max_pause, 5);
        assert_eq!(config.check_interval, Duration::from_secs(10));
        assert!(!config.force_swap);
        assert!(!config.wait_for_start);
    }

    #[test]
    fn store_default_is_a_fixed_temp_location() {
        let config = StoreConfig::default();
        assert!(config.dir.starts_with(env::temp_dir()));
        assert_eq!(config.filename, "paused_processes.json");
    }

    #[test]
    fn with_dir_keeps_the_default_filename() {
        let config = StoreConfig::with_dir(PathBuf::from("/var/lib/memprio"));
        assert_eq!(config.dir, PathBuf::from("/var/lib/memprio"));
        assert_eq!(config.filename, "paused_processes.json");
    }
}
