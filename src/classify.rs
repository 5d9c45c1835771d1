//! Suspension policy: which processes must never be paused.
//!
//! The policy is a conservative allow-list over process names plus two pid
//! sets computed at runtime. Rules run in a fixed order and the first hit
//! wins, so an operator exclusion shields a process before any name check
//! gets a say.

use crate::probe::ProcessProbe;
use crate::probe::ProcessRecord;
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};
use tracing::info;

/// Shells, terminals and REPL hosts. Suspending one of these, or a child it
/// spawned, can wedge the very session driving this program.
pub const SHELL_PROCESSES: &[&str] = &[
    "Terminal", "iTerm2", "iTerm", "bash", "zsh", "sh", "fish", "python",
    "Python", "python3", "ssh", "tmux", "screen",
];

/// IDEs and editors whose processes are spared while the matching
/// application is frontmost.
pub const IDE_PROCESSES: &[&str] = &[
    "PyCharm", "pycharm", "VSCode", "code", "Xcode", "Atom", "Sublime Text",
    "Eclipse", "IntelliJ IDEA", "Vim", "vim", "nvim", "MacVim", "emacs",
];

/// Core OS services: window server, login, security, audio and friends.
/// macOS daemons from the original deployment plus common Linux counterparts.
pub const ESSENTIAL_PROCESSES: &[&str] = &[
    "launchd", "kernel_task", "WindowServer", "SystemUIServer", "Finder",
    "Dock", "loginwindow", "mds", "mds_stores", "opendirectoryd", "securityd",
    "coreaudiod", "syslogd", "configd", "distnoted", "notifyd", "cfprefsd",
    "secd", "networkd", "apsd", "amfid", "cloudkitd", "coreduetd", "usbd",
    "syspolicyd", "powerd", "airportd",
    "bluetoothd", "locationd", "diagnosticd", "Activity Monitor", "systemd",
    "init", "dbus-daemon", "Xorg", "Xwayland", "wayland", "pipewire",
    "pulseaudio", "NetworkManager",
];

static SHELL_TOKENS: Lazy<Vec<String>> = Lazy::new(|| lowered(SHELL_PROCESSES));
static IDE_TOKENS: Lazy<Vec<String>> = Lazy::new(|| lowered(IDE_PROCESSES));
static ESSENTIAL_TOKENS: Lazy<Vec<String>> = Lazy::new(|| lowered(ESSENTIAL_PROCESSES));

fn lowered(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_lowercase()).collect()
}

fn name_matches(name: &str, tokens: &[String]) -> bool {
    let name = name.to_lowercase();
    tokens.iter().any(|t| name.contains(t.as_str()))
}

/// Pids that must never be suspended: this program, the priority process,
/// and the full ancestor chains of both up to (excluding) the init process.
#[derive(Debug, Clone, Default)]
pub struct ProtectedSet {
    pids: Vec<u32>,
}

impl ProtectedSet {
    /// Walk both ancestor chains once at startup. Logged so the operator can
    /// see exactly which pids are off the table.
    pub fn compute(probe: &mut dyn ProcessProbe, self_pid: u32, priority_pid: u32) -> Self {
        let mut set = ProtectedSet::default();
        for (pid, name) in ancestor_chain(probe, self_pid) {
            info!(pid, name = %name, "protected from suspension (supervisor chain)");
            set.push(pid);
        }
        set.push(self_pid);
        for (pid, name) in ancestor_chain(probe, priority_pid) {
            info!(pid, name = %name, "protected from suspension (priority chain)");
            set.push(pid);
        }
        set.push(priority_pid);
        set
    }

    pub fn from_pids(pids: impl IntoIterator<Item = u32>) -> Self {
        let mut set = ProtectedSet::default();
        for pid in pids {
            set.push(pid);
        }
        set
    }

    fn push(&mut self, pid: u32) {
        if !self.pids.contains(&pid) {
            self.pids.push(pid);
        }
    }

    pub fn contains(&self, pid: u32) -> bool {
        self.pids.contains(&pid)
    }

    pub fn pids(&self) -> &[u32] {
        &self.pids
    }
}

/// Ancestors of `start`, inclusive, stopping before pid 1.
pub fn ancestor_chain(probe: &mut dyn ProcessProbe, start: u32) -> Vec<(u32, String)> {
    let mut chain: Vec<(u32, String)> = Vec::new();
    let mut current = start;
    while current > 1 {
        // malformed tables can loop parent pids
        if chain.iter().any(|(pid, _)| *pid == current) {
            break;
        }
        let Some(name) = probe.name_of(current) else {
            break;
        };
        chain.push((current, name));
        let Some(parent) = probe.parent_of(current) else {
            break;
        };
        current = parent;
    }
    chain
}

/// Inputs the policy needs beside the process itself. `process_names` maps
/// live pids to names so the parent-shell rule stays a pure lookup.
pub struct PolicyContext<'a> {
    pub protected: &'a ProtectedSet,
    pub exclusions: &'a HashSet<u32>,
    pub foreground_app: Option<&'a str>,
    pub process_names: &'a HashMap<u32, String>,
}

/// Whether `process` must not be suspended. Checked in order: operator
/// exclusions, the protected pid set, shell names, processes of the
/// frontmost IDE, OS-essential names, children of shells.
pub fn is_protected(process: &ProcessRecord, ctx: &PolicyContext<'_>) -> bool {
    if ctx.exclusions.contains(&process.pid) {
        return true;
    }
    if ctx.protected.contains(process.pid) {
        return true;
    }
    if name_matches(&process.name, &SHELL_TOKENS) {
        return true;
    }
    if let Some(front) = ctx.foreground_app {
        let front = front.to_lowercase();
        let name = process.name.to_lowercase();
        if IDE_TOKENS
            .iter()
            .any(|ide| front.contains(ide.as_str()) && name.contains(ide.as_str()))
        {
            return true;
        }
    }
    if name_matches(&process.name, &ESSENTIAL_TOKENS) {
        return true;
    }
    if let Some(parent) = process.parent_pid {
        if let Some(parent_name) = ctx.process_names.get(&parent) {
            if name_matches(parent_name, &SHELL_TOKENS) {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::MemoryStats;

    struct ChainProbe {
        links: Vec<(u32, &'static str, Option<u32>)>,
    }

    impl ProcessProbe for ChainProbe {
        fn snapshot(&mut self) -> Vec<ProcessRecord> {
            Vec::new()
        }

        fn exists(&mut self, pid: u32) -> bool {
            self.links.iter().any(|(p, _, _)| *p == pid)
        }

        fn name_of(&mut self, pid: u32) -> Option<String> {
            self.links
                .iter()
                .find(|(p, _, _)| *p == pid)
                .map(|(_, name, _)| name.to_string())
        }

        fn parent_of(&mut self, pid: u32) -> Option<u32> {
            self.links
                .iter()
                .find(|(p, _, _)| *p == pid)
                .and_then(|(_, _, parent)| *parent)
        }

        fn memory(&mut self) -> MemoryStats {
            MemoryStats::default()
        }
    }

    fn empty_names() -> HashMap<u32, String> {
        HashMap::new()
    }

    fn plain(pid: u32, name: &str) -> ProcessRecord {
        ProcessRecord::new(pid, name, 100.0, 1.0, Some(400))
    }

    fn ctx_with<'a>(
        protected: &'a ProtectedSet,
        exclusions: &'a HashSet<u32>,
        names: &'a HashMap<u32, String>,
    ) -> PolicyContext<'a> {
        PolicyContext {
            protected,
            exclusions,
            foreground_app: None,
            process_names: names,
        }
    }

    #[test]
    fn exclusion_wins_first() {
        let protected = ProtectedSet::default();
        let exclusions: HashSet<u32> = [77].into_iter().collect();
        let names = empty_names();
        let ctx = ctx_with(&protected, &exclusions, &names);
        assert!(is_protected(&plain(77, "random_worker"), &ctx));
        assert!(!is_protected(&plain(78, "random_worker"), &ctx));
    }

    #[test]
    fn protected_pids_are_untouchable() {
        let protected = ProtectedSet::from_pids([5, 6]);
        let exclusions = HashSet::new();
        let names = empty_names();
        let ctx = ctx_with(&protected, &exclusions, &names);
        assert!(is_protected(&plain(5, "whatever"), &ctx));
    }

    #[test]
    fn shell_names_match_case_insensitive_substring() {
        let protected = ProtectedSet::default();
        let exclusions = HashSet::new();
        let names = empty_names();
        let ctx = ctx_with(&protected, &exclusions, &names);
        assert!(is_protected(&plain(10, "ZSH"), &ctx));
        assert!(is_protected(&plain(11, "iTerm2-helper"), &ctx));
        assert!(!is_protected(&plain(12, "media_indexer"), &ctx));
    }

    #[test]
    fn ide_rule_needs_matching_foreground() {
        let protected = ProtectedSet::default();
        let exclusions = HashSet::new();
        let names = empty_names();
        let mut ctx = ctx_with(&protected, &exclusions, &names);

        let helper = plain(20, "PyCharm Helper");
        assert!(!is_protected(&helper, &ctx));
        ctx.foreground_app = Some("pycharm");
        assert!(is_protected(&helper, &ctx));
        // a different frontmost IDE does not shield it
        ctx.foreground_app = Some("Xcode");
        assert!(!is_protected(&helper, &ctx));
    }

    #[test]
    fn essential_names_are_protected() {
        let protected = ProtectedSet::default();
        let exclusions = HashSet::new();
        let names = empty_names();
        let ctx = ctx_with(&protected, &exclusions, &names);
        assert!(is_protected(&plain(30, "WindowServer"), &ctx));
        assert!(is_protected(&plain(31, "systemd-journald"), &ctx));
        assert!(is_protected(&plain(32, "cloudkitd"), &ctx));
        assert!(is_protected(&plain(33, "coreduetd"), &ctx));
        assert!(is_protected(&plain(34, "usbd"), &ctx));
    }

    #[test]
    fn children_of_shells_are_protected() {
        let protected = ProtectedSet::default();
        let exclusions = HashSet::new();
        let mut names = empty_names();
        names.insert(400, "zsh".to_string());
        let ctx = ctx_with(&protected, &exclusions, &names);
        assert!(is_protected(&plain(40, "long_build"), &ctx));

        let orphan = ProcessRecord::new(41, "long_build", 100.0, 1.0, Some(500));
        assert!(!is_protected(&orphan, &ctx));
    }

    #[test]
    fn ancestor_chain_stops_before_init() {
        let mut probe = ChainProbe {
            links: vec![
                (300, "worker", Some(200)),
                (200, "zsh", Some(100)),
                (100, "login", Some(1)),
                (1, "launchd", None),
            ],
        };
        let chain = ancestor_chain(&mut probe, 300);
        let pids: Vec<u32> = chain.iter().map(|(pid, _)| *pid).collect();
        assert_eq!(pids, vec![300, 200, 100]);
    }

    #[test]
    fn ancestor_chain_survives_parent_loops() {
        let mut probe = ChainProbe {
            links: vec![(300, "a", Some(200)), (200, "b", Some(300))],
        };
        let chain = ancestor_chain(&mut probe, 300);
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn protected_set_computes_both_chains() {
        let mut probe = ChainProbe {
            links: vec![
                (900, "monitor", Some(800)),
                (800, "bash", Some(1)),
                (700, "render_farm", Some(600)),
                (600, "launcher", Some(1)),
                (1, "init", None),
            ],
        };
        let set = ProtectedSet::compute(&mut probe, 900, 700);
        for pid in [900, 800, 700, 600] {
            assert!(set.contains(pid), "pid {pid} should be protected");
        }
        assert!(!set.contains(1));
        assert!(!set.contains(555));
    }
}
