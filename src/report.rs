//! Operator-facing cycle report. The report is the program's console
//! display and goes to stdout; diagnostics travel through tracing instead.

use crate::probe::{MemoryStats, ProcessRecord};
use chrono::Local;

/// How many unpaused memory consumers each cycle report lists.
pub const TOP_CONSUMERS: usize = 5;

pub fn print_memory_overview(mem: &MemoryStats) {
    println!("\n[{}] Memory status:", Local::now().format("%H:%M:%S"));
    println!("  Total memory: {:.2} MB", mem.total_mb);
    println!(
        "  Available memory: {:.2} MB ({:.1}% in use)",
        mem.available_mb, mem.used_percent
    );
    let swap_percent = if mem.swap_total_mb > 0.0 {
        mem.swap_used_mb / mem.swap_total_mb * 100.0
    } else {
        0.0
    };
    println!(
        "  Swap: {:.2} MB of {:.2} MB in use ({:.1}%)",
        mem.swap_used_mb, mem.swap_total_mb, swap_percent
    );
}

pub fn print_priority(record: &ProcessRecord) {
    println!("\nPriority process: PID {} ({})", record.pid, record.name);
    println!(
        "  Memory: {:.2} MB, CPU: {:.1}%",
        record.memory_mb, record.cpu_percent
    );
}

pub fn print_paused(paused: &[ProcessRecord]) {
    if paused.is_empty() {
        return;
    }
    println!("\nCurrently paused processes:");
    for record in paused {
        println!("  {record}");
    }
}

/// `top` pairs each record with whether the policy shields it.
pub fn print_top_consumers(top: &[(ProcessRecord, bool)]) {
    if top.is_empty() {
        return;
    }
    println!("\nTop memory consumers (not paused):");
    for (record, protected) in top {
        let marker = if *protected { " (protected)" } else { "" };
        println!("  {record}{marker}");
    }
}
