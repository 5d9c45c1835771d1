//! The monitor engine: a periodic cycle that pauses the biggest eligible
//! memory consumers while the priority process lives, plus the command
//! handling that shares its state.
//!
//! The engine is the sole owner of the exclusion set, the paused ledger, and
//! the state store. Commands from the listener are applied between cycles,
//! one at a time, in arrival order.

use crate::classify::{is_protected, PolicyContext, ProtectedSet};
use crate::commands::{EngineCommand, ManualOutcome};
use crate::config::EngineConfig;
use crate::control::{memory_pressure_hint, ControlError, ProcessControl};
use crate::probe::{ProcessProbe, ProcessRecord};
use crate::registry::PausedRegistry;
use crate::report;
use crate::shutdown::StopSignal;
use crate::storage::StateStore;
use std::collections::HashMap;
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Overall memory use (percent) above which the swap hint fires.
const MEMORY_PRESSURE_PERCENT: f64 = 80.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Parked behind the start gate; commands work, cycles do not run.
    AwaitingStart,
    Running,
    Stopped,
}

pub struct MonitorEngine<P, C> {
    config: EngineConfig,
    probe: P,
    control: C,
    store: StateStore,
    protected: ProtectedSet,
    foreground_app: Option<String>,
    exclusions: HashSet<u32>,
    registry: PausedRegistry,
    commands: mpsc::Receiver<EngineCommand>,
    commands_open: bool,
    state: EngineState,
    stop: StopSignal,
}

impl<P: ProcessProbe, C: ProcessControl> MonitorEngine<P, C> {
    pub fn new(
        config: EngineConfig,
        mut probe: P,
        control: C,
        store: StateStore,
        commands: mpsc::Receiver<EngineCommand>,
        stop: StopSignal,
    ) -> Self {
        let self_pid = std::process::id();
        let protected = ProtectedSet::compute(&mut probe, self_pid, config.priority_pid);
        let foreground_app = probe.name_of(self_pid);
        let exclusions = config.initial_exclusions.iter().copied().collect();
        let state = if config.wait_for_start {
            EngineState::AwaitingStart
        } else {
            EngineState::Running
        };
        Self {
            config,
            probe,
            control,
            store,
            protected,
            foreground_app,
            exclusions,
            registry: PausedRegistry::new(),
            commands,
            commands_open: true,
            state,
            stop,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn paused_records(&self) -> Vec<ProcessRecord> {
        self.registry.paused_records()
    }

    pub fn excluded_pids(&self) -> Vec<u32> {
        let mut pids: Vec<u32> = self.exclusions.iter().copied().collect();
        pids.sort_unstable();
        pids
    }

    /// Drive the engine until the stop signal fires, the priority process
    /// exits, or the operator quits. A clean exit resumes whatever is still
    /// paused and clears the state file; an aborted process leaves the file
    /// behind for recovery.
    pub async fn run(mut self) {
        self.recover_leftover_state();

        if self.state == EngineState::AwaitingStart {
            println!("\nWaiting for the 'start' command to begin monitoring...");
        } else {
            info!(pid = self.config.priority_pid, "memory monitoring started");
        }

        let mut shutdown = self.stop.subscribe();
        // interval 0 means poll continuously; tokio rejects a zero period
        let period = self.config.check_interval.max(Duration::from_millis(1));
        let mut ticker = time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while self.state != EngineState::Stopped {
            if self.stop.is_stopped() {
                break;
            }
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                maybe_cmd = self.commands.recv(), if self.commands_open => {
                    match maybe_cmd {
                        Some(cmd) => {
                            let was_waiting = self.state == EngineState::AwaitingStart;
                            self.handle_command(cmd);
                            if was_waiting && self.state == EngineState::Running {
                                ticker.reset();
                                self.run_cycle();
                            }
                        }
                        None => self.commands_open = false,
                    }
                }
                _ = ticker.tick() => {
                    if self.state == EngineState::Running {
                        self.run_cycle();
                    }
                }
            }
        }
        self.wind_down();
    }

    /// A state file at startup means a previous session died without
    /// resuming its processes. Clean that up before monitoring anything.
    fn recover_leftover_state(&mut self) {
        let leftover = self.store.load();
        if leftover.is_empty() {
            return;
        }
        warn!(
            count = leftover.len(),
            "state file from a previous session found, resuming its processes"
        );
        let outcome = self.store.recover(&mut self.control);
        info!(
            resumed = outcome.resumed,
            failed = outcome.failed,
            "previous session cleaned up"
        );
    }

    /// Apply one command. Synchronous so tests can drive the engine without
    /// a runtime.
    pub fn handle_command(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::Start => match self.state {
                EngineState::AwaitingStart => {
                    self.state = EngineState::Running;
                    info!("monitoring started by operator");
                    println!("Monitoring started!");
                }
                _ => debug!("start command ignored, gate already open"),
            },
            EngineCommand::AddExclusion { pid, name } => {
                if self.exclusions.insert(pid) {
                    info!(pid, name = %name, "process excluded from suspension");
                }
            }
            EngineCommand::RemoveExclusion { pid, reply } => {
                let removed = self.exclusions.remove(&pid);
                if removed {
                    info!(pid, "process removed from the exclusion set");
                }
                let _ = reply.send(removed);
            }
            EngineCommand::PauseOne { pid, force, reply } => {
                let outcome = self.manual_pause(pid, force);
                let _ = reply.send(outcome);
            }
            EngineCommand::ResumeOne { pid, force, reply } => {
                let outcome = self.manual_resume(pid, force);
                let _ = reply.send(outcome);
            }
            EngineCommand::ListExclusions { reply } => {
                let mut pids: Vec<u32> = self.exclusions.iter().copied().collect();
                pids.sort_unstable();
                let entries: Vec<(u32, Option<String>)> = pids
                    .into_iter()
                    .map(|pid| (pid, self.probe.name_of(pid)))
                    .collect();
                let _ = reply.send(entries);
            }
            EngineCommand::ListPaused { reply } => {
                let _ = reply.send(self.registry.paused_records());
            }
        }
    }

    /// One monitoring pass. Public so tests can drive cycles synchronously.
    pub fn run_cycle(&mut self) {
        if !self.probe.exists(self.config.priority_pid) {
            info!(
                pid = self.config.priority_pid,
                "priority process has exited, stopping"
            );
            println!(
                "\nThe priority process {} is no longer running. Exiting...",
                self.config.priority_pid
            );
            self.state = EngineState::Stopped;
            return;
        }

        let mut processes = self.probe.snapshot();
        // parent-name lookups need the full table, the priority process included
        let names = names_by_pid(&processes);
        let priority = processes
            .iter()
            .find(|p| p.pid == self.config.priority_pid)
            .cloned();
        processes.retain(|p| p.pid != self.config.priority_pid);
        // stable sort keeps equal-memory processes in snapshot order
        processes.sort_by(|a, b| b.memory_mb.total_cmp(&a.memory_mb));

        let dropped = self.registry.retain_live(|pid| self.probe.exists(pid));
        for record in &dropped {
            info!(
                pid = record.pid,
                name = %record.name,
                "paused process no longer exists, dropped from tracking"
            );
        }
        self.persist();

        self.fill_pause_budget(&processes, &names);

        let mem = self.probe.memory();
        if self.config.force_swap && mem.used_percent > MEMORY_PRESSURE_PERCENT {
            debug!(
                used_percent = mem.used_percent,
                "memory pressure high, requesting swap hint"
            );
            memory_pressure_hint(self.config.priority_pid);
        }

        report::print_memory_overview(&mem);
        if let Some(priority) = &priority {
            report::print_priority(priority);
        }
        report::print_paused(&self.registry.paused_records());
        report::print_top_consumers(&self.top_unpaused(&processes, &names));
    }

    /// Pause the biggest eligible consumers until the budget is full.
    /// `processes` is already sorted by descending memory.
    fn fill_pause_budget(&mut self, processes: &[ProcessRecord], names: &HashMap<u32, String>) {
        if self.registry.paused_count() >= self.config.max_pause {
            return;
        }
        let candidates: Vec<ProcessRecord> = {
            let ctx = self.policy_context(names);
            processes
                .iter()
                .filter(|p| p.memory_mb >= self.config.threshold_mb)
                .filter(|p| !self.registry.is_paused(p.pid))
                .filter(|p| !is_protected(p, &ctx))
                .cloned()
                .collect()
        };
        for candidate in candidates {
            if self.registry.paused_count() >= self.config.max_pause || self.stop.is_stopped() {
                break;
            }
            match self.control.pause(candidate.pid) {
                Ok(()) => {
                    info!(
                        pid = candidate.pid,
                        name = %candidate.name,
                        memory_mb = candidate.memory_mb,
                        "process paused"
                    );
                    self.registry.insert_paused(candidate);
                    self.persist();
                }
                Err(err) => {
                    warn!(pid = candidate.pid, error = %err, "pause failed, skipping");
                }
            }
        }
    }

    fn manual_pause(&mut self, pid: u32, force: bool) -> ManualOutcome {
        let snapshot = self.probe.snapshot();
        let Some(mut record) = snapshot.iter().find(|p| p.pid == pid).cloned() else {
            return ManualOutcome::NotFound(pid);
        };
        if !force {
            let names = names_by_pid(&snapshot);
            let ctx = self.policy_context(&names);
            if is_protected(&record, &ctx) {
                return ManualOutcome::Protected {
                    pid,
                    name: record.name,
                };
            }
        }
        match self.control.pause(pid) {
            Ok(()) => {
                record.paused = true;
                info!(pid, name = %record.name, "process paused by operator");
                self.registry.insert_paused(record.clone());
                self.persist();
                ManualOutcome::Paused(record)
            }
            Err(err) => {
                warn!(pid, error = %err, "manual pause failed");
                ManualOutcome::Failed(err.to_string())
            }
        }
    }

    fn manual_resume(&mut self, pid: u32, force: bool) -> ManualOutcome {
        if !force {
            let snapshot = self.probe.snapshot();
            if let Some(record) = snapshot.iter().find(|p| p.pid == pid) {
                let names = names_by_pid(&snapshot);
                let ctx = self.policy_context(&names);
                if is_protected(record, &ctx) {
                    return ManualOutcome::Protected {
                        pid,
                        name: record.name.clone(),
                    };
                }
            }
        }
        match self.control.resume(pid) {
            Ok(()) => {
                self.registry.remove(pid);
                self.persist();
                info!(pid, "process resumed by operator");
                ManualOutcome::Resumed(pid)
            }
            Err(ControlError::NotFound(_)) => {
                self.registry.remove(pid);
                self.persist();
                ManualOutcome::NotFound(pid)
            }
            Err(err) => {
                warn!(pid, error = %err, "manual resume failed");
                ManualOutcome::Failed(err.to_string())
            }
        }
    }

    /// First unpaused entries of the sorted snapshot, flagged with whether
    /// the policy shields them.
    fn top_unpaused(
        &self,
        processes: &[ProcessRecord],
        names: &HashMap<u32, String>,
    ) -> Vec<(ProcessRecord, bool)> {
        let ctx = self.policy_context(names);
        processes
            .iter()
            .filter(|p| !self.registry.is_paused(p.pid))
            .take(report::TOP_CONSUMERS)
            .map(|p| (p.clone(), is_protected(p, &ctx)))
            .collect()
    }

    fn policy_context<'a>(&'a self, names: &'a HashMap<u32, String>) -> PolicyContext<'a> {
        PolicyContext {
            protected: &self.protected,
            exclusions: &self.exclusions,
            foreground_app: self.foreground_app.as_deref(),
            process_names: names,
        }
    }

    fn persist(&mut self) {
        if let Err(err) = self.store.save(&self.registry.paused_records()) {
            warn!(error = %err, "state persistence failed");
        }
    }

    /// Resume everything still paused and clear the state file. Runs only on
    /// the clean exit path.
    fn wind_down(&mut self) {
        self.state = EngineState::Stopped;
        let records = self.registry.drain();
        for record in records.iter().filter(|r| r.paused) {
            match self.control.resume(record.pid) {
                Ok(()) => {
                    info!(pid = record.pid, name = %record.name, "resumed on shutdown");
                }
                Err(err) => {
                    warn!(pid = record.pid, error = %err, "shutdown resume failed");
                }
            }
        }
        self.store.clear();
        info!("monitor stopped");
    }
}

fn names_by_pid(snapshot: &[ProcessRecord]) -> HashMap<u32, String> {
    snapshot.iter().map(|p| (p.pid, p.name.clone())).collect()
}
