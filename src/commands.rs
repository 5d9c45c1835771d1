//! Operator command surface: the line grammar, the channel messages carried
//! to the engine, and the interactive listener task (stdin in production).
//!
//! The listener never touches engine state directly. Every mutation travels
//! through the command channel and is applied by the engine between cycles,
//! so there is exactly one writer for the exclusion set and the paused
//! ledger.

use crate::probe::{resolve_target, ProcessProbe, ProcessRecord};
use crate::shutdown::StopSignal;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

/// Messages the listener sends into the engine.
#[derive(Debug)]
pub enum EngineCommand {
    /// Open the start gate.
    Start,
    /// Shield a pid from suspension.
    AddExclusion { pid: u32, name: String },
    /// Stop shielding a pid; replies whether it was in the set.
    RemoveExclusion {
        pid: u32,
        reply: oneshot::Sender<bool>,
    },
    /// Pause one process now, outside the periodic cycle.
    PauseOne {
        pid: u32,
        force: bool,
        reply: oneshot::Sender<ManualOutcome>,
    },
    /// Resume one process now.
    ResumeOne {
        pid: u32,
        force: bool,
        reply: oneshot::Sender<ManualOutcome>,
    },
    /// Snapshot of the exclusion set, with live names where available.
    ListExclusions {
        reply: oneshot::Sender<Vec<(u32, Option<String>)>>,
    },
    /// Snapshot of the paused ledger.
    ListPaused {
        reply: oneshot::Sender<Vec<ProcessRecord>>,
    },
}

/// The engine's answer to a manual pause/resume request.
#[derive(Debug)]
pub enum ManualOutcome {
    Paused(ProcessRecord),
    Resumed(u32),
    /// Target is shielded by policy; the caller may retry with `force`.
    Protected { pid: u32, name: String },
    NotFound(u32),
    Failed(String),
}

/// One line of operator input, parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedCommand {
    Start,
    Quit,
    Help,
    List,
    Paused,
    Exclude(String),
    Unexclude(String),
    PauseTarget(String),
    ResumeTarget(String),
    Unknown(String),
    Empty,
}

/// Keywords first, then the sigil prefixes. `++`/`--` are checked before
/// `+`/`-` so a double sigil never parses as an exclusion change.
pub fn parse_command(line: &str) -> ParsedCommand {
    let line = line.trim();
    if line.is_empty() {
        return ParsedCommand::Empty;
    }
    match line.to_lowercase().as_str() {
        "start" => return ParsedCommand::Start,
        "quit" | "exit" | "q" => return ParsedCommand::Quit,
        "help" => return ParsedCommand::Help,
        "list" => return ParsedCommand::List,
        "paused" => return ParsedCommand::Paused,
        _ => {}
    }
    if let Some(target) = line.strip_prefix("++") {
        return target_command(target, ParsedCommand::ResumeTarget);
    }
    if let Some(target) = line.strip_prefix("--") {
        return target_command(target, ParsedCommand::PauseTarget);
    }
    if let Some(target) = line.strip_prefix('+') {
        return target_command(target, ParsedCommand::Exclude);
    }
    if let Some(target) = line.strip_prefix('-') {
        return target_command(target, ParsedCommand::Unexclude);
    }
    ParsedCommand::Unknown(line.to_string())
}

fn target_command(target: &str, build: fn(String) -> ParsedCommand) -> ParsedCommand {
    let target = target.trim();
    if target.is_empty() {
        ParsedCommand::Empty
    } else {
        build(target.to_string())
    }
}

pub fn print_help() {
    println!();
    println!("Available commands:");
    println!("  start             : begin monitoring (when started with --wait)");
    println!("  +<name or pid>    : add a process to the exclusion list");
    println!("  -<name or pid>    : remove a process from the exclusion list");
    println!("  --<name or pid>   : pause a specific process now");
    println!("  ++<name or pid>   : resume a specific process now");
    println!("  list              : show the exclusion list");
    println!("  paused            : show currently paused processes");
    println!("  help              : show this help");
    println!("  quit, exit, q     : stop monitoring and exit");
    println!();
}

#[derive(Clone, Copy)]
enum Operation {
    Pause,
    Resume,
}

/// Read operator commands from `input` until quit, the stop signal, end of
/// input, or the engine going away. Name resolution happens here against
/// this task's own probe; the engine only ever sees resolved pids.
pub async fn run_listener<P, R>(
    mut probe: P,
    input: R,
    commands: mpsc::Sender<EngineCommand>,
    stop: StopSignal,
) where
    P: ProcessProbe,
    R: AsyncBufRead + Unpin + Send,
{
    let mut shutdown = stop.subscribe();
    let mut lines = input.lines();
    print_help();

    loop {
        if stop.is_stopped() {
            break;
        }
        let line = tokio::select! {
            _ = shutdown.changed() => break,
            line = lines.next_line() => match line {
                Ok(Some(line)) => line,
                Ok(None) => {
                    debug!("input stream closed, listener exiting");
                    break;
                }
                Err(err) => {
                    warn!(error = %err, "input read failed, listener exiting");
                    break;
                }
            },
        };

        match parse_command(&line) {
            ParsedCommand::Empty => {}
            ParsedCommand::Help => print_help(),
            ParsedCommand::Start => {
                if commands.send(EngineCommand::Start).await.is_err() {
                    break;
                }
            }
            ParsedCommand::Quit => {
                println!("Shutdown requested...");
                stop.trigger();
                break;
            }
            ParsedCommand::List => {
                let (reply, rx) = oneshot::channel();
                if commands
                    .send(EngineCommand::ListExclusions { reply })
                    .await
                    .is_err()
                {
                    break;
                }
                match rx.await {
                    Ok(entries) if entries.is_empty() => {
                        println!("No processes in the exclusion list.");
                    }
                    Ok(entries) => {
                        println!("\nProcesses in the exclusion list:");
                        for (pid, name) in entries {
                            match name {
                                Some(name) => println!("  PID: {pid}, Name: {name}"),
                                None => println!("  PID: {pid}, Name: unknown (process gone)"),
                            }
                        }
                    }
                    Err(_) => break,
                }
            }
            ParsedCommand::Paused => {
                let (reply, rx) = oneshot::channel();
                if commands
                    .send(EngineCommand::ListPaused { reply })
                    .await
                    .is_err()
                {
                    break;
                }
                match rx.await {
                    Ok(records) if records.is_empty() => {
                        println!("No processes currently paused.");
                    }
                    Ok(records) => {
                        println!("\nCurrently paused processes:");
                        for record in records {
                            println!("  {record}");
                        }
                    }
                    Err(_) => break,
                }
            }
            ParsedCommand::Exclude(target) => {
                match resolve_target(&mut probe, &target) {
                    Some((pid, name)) => {
                        let msg = EngineCommand::AddExclusion {
                            pid,
                            name: name.clone(),
                        };
                        if commands.send(msg).await.is_err() {
                            break;
                        }
                        println!("Added to the exclusion list: PID {pid} ({name})");
                    }
                    None => println!("Process not found: {target}"),
                }
            }
            ParsedCommand::Unexclude(target) => {
                match resolve_target(&mut probe, &target) {
                    Some((pid, _)) => {
                        let (reply, rx) = oneshot::channel();
                        let msg = EngineCommand::RemoveExclusion { pid, reply };
                        if commands.send(msg).await.is_err() {
                            break;
                        }
                        match rx.await {
                            Ok(true) => println!("Removed from the exclusion list: PID {pid}"),
                            Ok(false) => println!("Process not in the exclusion list: {target}"),
                            Err(_) => break,
                        }
                    }
                    None => println!("Process not found: {target}"),
                }
            }
            ParsedCommand::PauseTarget(target) => {
                let keep_going = manual_operation(
                    &mut probe,
                    &commands,
                    &mut lines,
                    &stop,
                    &target,
                    Operation::Pause,
                )
                .await;
                if !keep_going {
                    break;
                }
            }
            ParsedCommand::ResumeTarget(target) => {
                let keep_going = manual_operation(
                    &mut probe,
                    &commands,
                    &mut lines,
                    &stop,
                    &target,
                    Operation::Resume,
                )
                .await;
                if !keep_going {
                    break;
                }
            }
            ParsedCommand::Unknown(cmd) => {
                println!("Unrecognized command: {cmd}. Type 'help' for the command list.");
            }
        }
    }
}

/// Drive one `--`/`++` request, including the override prompt when the
/// engine reports the target as protected. Returns false when the listener
/// should exit.
async fn manual_operation<R: AsyncBufRead + Unpin>(
    probe: &mut dyn ProcessProbe,
    commands: &mpsc::Sender<EngineCommand>,
    lines: &mut Lines<R>,
    stop: &StopSignal,
    target: &str,
    op: Operation,
) -> bool {
    let Some((pid, _)) = resolve_target(probe, target) else {
        println!("Process not found: {target}");
        return true;
    };

    let Some(first) = send_manual(commands, pid, false, op).await else {
        return false;
    };
    let outcome = match first {
        ManualOutcome::Protected { pid, name } => {
            println!("Process {pid} ({name}) is protected or essential.");
            print!("Force the operation anyway? (y/n): ");
            let _ = std::io::stdout().flush();
            let answer = tokio::select! {
                _ = wait_for_stop(stop) => return false,
                line = lines.next_line() => match line {
                    Ok(Some(line)) => line,
                    _ => return false,
                },
            };
            if matches!(answer.trim().to_lowercase().as_str(), "y" | "yes") {
                match send_manual(commands, pid, true, op).await {
                    Some(outcome) => outcome,
                    None => return false,
                }
            } else {
                println!("Operation cancelled.");
                return true;
            }
        }
        other => other,
    };

    match outcome {
        ManualOutcome::Paused(record) => println!("Process paused: {record}"),
        ManualOutcome::Resumed(pid) => println!("Process {pid} resumed."),
        ManualOutcome::NotFound(pid) => println!("Process {pid} no longer exists."),
        ManualOutcome::Failed(err) => println!("Operation failed: {err}"),
        ManualOutcome::Protected { .. } => println!("Operation not performed."),
    }
    true
}

async fn wait_for_stop(stop: &StopSignal) {
    let mut rx = stop.subscribe();
    if stop.is_stopped() {
        return;
    }
    let _ = rx.changed().await;
}

async fn send_manual(
    commands: &mpsc::Sender<EngineCommand>,
    pid: u32,
    force: bool,
    op: Operation,
) -> Option<ManualOutcome> {
    let (reply, rx) = oneshot::channel();
    let cmd = match op {
        Operation::Pause => EngineCommand::PauseOne { pid, force, reply },
        Operation::Resume => EngineCommand::ResumeOne { pid, force, reply },
    };
    commands.send(cmd).await.ok()?;
    rx.await.ok()
}
