//! Crash-safe persistence of the paused set, plus the recovery routine.

mod state_file;

pub use state_file::{RecoveryReport, StateStore, StoreError};
