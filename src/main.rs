//! memprio entrypoint: resolve the priority target, wire the stop signal,
//! spawn the command listener and drive the monitor engine. The `recover`
//! subcommand runs the state-file cleanup on its own and exits.

use clap::Parser;
use memprio::cli::{Args, Command};
use memprio::commands::{run_listener, EngineCommand};
use memprio::config::{EngineConfig, StoreConfig};
use memprio::control::{running_as_root, SignalSender};
use memprio::logging::StructuredLogger;
use memprio::monitor::MonitorEngine;
use memprio::probe::{resolve_target, ProcessProbe, SystemProbe};
use memprio::shutdown::StopSignal;
use memprio::storage::StateStore;
use std::time::Duration;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Bound on waiting for the listener after the engine stops; a blocked
/// stdin read cannot be interrupted.
const LISTENER_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();
    StructuredLogger::init(args.log_json, args.log_level.as_str());

    let store_config = match &args.state_dir {
        Some(dir) => StoreConfig::with_dir(dir.clone()),
        None => StoreConfig::default(),
    };

    if matches!(args.command, Some(Command::Recover)) {
        let store = StateStore::open(&store_config)?;
        let mut control = SignalSender::new();
        let outcome = store.recover(&mut control);
        println!(
            "Recovery complete: {} recorded, {} resumed, {} failed.",
            outcome.found, outcome.resumed, outcome.failed
        );
        return Ok(());
    }

    if !running_as_root() {
        warn!("not running as root; pausing other users' processes will fail");
    }

    let mut probe = SystemProbe::new();
    let (priority_pid, priority_name) = resolve_priority(&mut probe, &args)?;

    let mut initial_exclusions = Vec::new();
    for target in &args.exclude {
        match resolve_target(&mut probe, target) {
            Some((pid, name)) => {
                info!(pid, name = %name, "excluded from suspension at startup");
                initial_exclusions.push(pid);
            }
            None => warn!(target = %target, "excluded process not found, ignoring"),
        }
    }

    println!("Prioritizing process: PID {priority_pid} ({priority_name})");
    println!("Memory threshold: {} MB", args.threshold);
    println!("Maximum paused processes: {}", args.max_pause);
    println!("Check interval: {} seconds", args.interval);
    println!("Force swap: {}", if args.swap { "yes" } else { "no" });

    let config = EngineConfig {
        priority_pid,
        threshold_mb: args.threshold,
        max_pause: args.max_pause,
        check_interval: Duration::from_secs(args.interval),
        force_swap: args.swap,
        wait_for_start: args.wait,
        initial_exclusions,
    };

    let stop = StopSignal::new();
    {
        let stop = stop.clone();
        ctrlc::set_handler(move || stop.trigger())?;
    }

    let (command_tx, command_rx) = mpsc::channel::<EngineCommand>(64);
    let store = StateStore::open(&store_config)?;
    let engine = MonitorEngine::new(
        config,
        probe,
        SignalSender::new(),
        store,
        command_rx,
        stop.clone(),
    );

    let listener = tokio::spawn(run_listener(
        SystemProbe::new(),
        BufReader::new(tokio::io::stdin()),
        command_tx,
        stop.clone(),
    ));

    engine.run().await;
    stop.trigger();
    if tokio::time::timeout(LISTENER_JOIN_TIMEOUT, listener).await.is_err() {
        debug!("listener still blocked on input, exiting anyway");
    }

    info!("memprio terminated");
    Ok(())
}

fn resolve_priority(
    probe: &mut dyn ProcessProbe,
    args: &Args,
) -> Result<(u32, String), Box<dyn std::error::Error + Send + Sync>> {
    if let Some(pid) = args.pid {
        if let Some(name) = probe.name_of(pid) {
            return Ok((pid, name));
        }
        return Err(format!("no process with pid {pid}").into());
    }
    if let Some(name) = &args.name {
        if let Some(found) = resolve_target(probe, name) {
            return Ok(found);
        }
        return Err(format!("no process matching '{name}'").into());
    }
    Err("a priority process is required: pass --name or --pid".into())
}
