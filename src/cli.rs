//! Command-line surface. This layer only builds configuration; behavior
//! lives in the engine modules.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "memprio",
    version,
    about = "Gives one process memory priority by pausing other heavy consumers"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Name of the process to prioritize (case-insensitive fragment)
    #[arg(short = 'n', long, conflicts_with = "pid")]
    pub name: Option<String>,

    /// Pid of the process to prioritize
    #[arg(short = 'p', long)]
    pub pid: Option<u32>,

    /// Minimum memory (MB) before a process is considered for pausing
    #[arg(short = 't', long, default_value_t = 200.0)]
    pub threshold: f64,

    /// Maximum number of processes paused at once
    #[arg(short = 'm', long = "max-pause", default_value_t = 5)]
    pub max_pause: usize,

    /// Seconds between monitoring cycles (0 polls continuously)
    #[arg(short = 'i', long, default_value_t = 10)]
    pub interval: u64,

    /// Try to force swapping in favor of the priority process under memory
    /// pressure (needs root)
    #[arg(short = 's', long)]
    pub swap: bool,

    /// Names or pids to exclude from suspension
    #[arg(short = 'e', long = "exclude", num_args = 1..)]
    pub exclude: Vec<String>,

    /// Wait for the 'start' command before the first monitoring cycle
    #[arg(short = 'w', long)]
    pub wait: bool,

    /// Directory for the paused-state file (default: system temp)
    #[arg(long)]
    pub state_dir: Option<PathBuf>,

    /// Log verbosity (overridden by RUST_LOG)
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resume processes left paused by a crashed session and clear the
    /// state file
    Recover,
}
