//! memprio — desktop memory priority manager.
//!
//! Keeps one designated process supplied with memory by suspending the
//! heaviest non-essential consumers (SIGSTOP) and resuming them when the
//! session ends. Every pause is recorded in a crash-safe state file, so
//! suspended processes can always be brought back, even after a crash.
//!
//! Modular structure:
//! - [`probe`] — process-table capability and the sysinfo implementation
//! - [`control`] — SIGSTOP/SIGCONT delivery and the swap hint
//! - [`classify`] — suspension policy: which processes are off the table
//! - [`registry`] — ledger of processes currently paused
//! - [`storage`] — crash-safe state file and the recovery routine
//! - [`commands`] — operator command grammar and the stdin listener
//! - [`monitor`] — the periodic engine driving everything above
//! - [`report`] — operator-facing cycle report
//! - [`logging`] — structured logging setup

pub mod classify;
pub mod cli;
pub mod commands;
pub mod config;
pub mod control;
pub mod logging;
pub mod monitor;
pub mod probe;
pub mod registry;
pub mod report;
pub mod shutdown;
pub mod storage;

pub use classify::{is_protected, PolicyContext, ProtectedSet};
pub use commands::{parse_command, EngineCommand, ManualOutcome, ParsedCommand};
pub use config::{EngineConfig, StoreConfig};
pub use control::{ControlError, ProcessControl};
#[cfg(unix)]
pub use control::SignalSender;
pub use logging::StructuredLogger;
pub use monitor::{EngineState, MonitorEngine};
pub use probe::{resolve_target, MemoryStats, ProcessProbe, ProcessRecord, SystemProbe};
pub use registry::PausedRegistry;
pub use shutdown::StopSignal;
pub use storage::{RecoveryReport, StateStore};
