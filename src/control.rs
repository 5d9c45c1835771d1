//! Stop/continue signal delivery and the privileged memory-pressure hint.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ControlError {
    #[error("process {0} no longer exists")]
    NotFound(u32),
    #[error("permission denied signalling process {0}")]
    PermissionDenied(u32),
    #[error("signal to process {pid} failed: {message}")]
    Other { pid: u32, message: String },
}

/// Pause/resume primitive the engine drives. Both operations are idempotent
/// at the OS level; callers own the in-memory `paused` flag and its
/// persistence.
pub trait ProcessControl: Send {
    fn pause(&mut self, pid: u32) -> Result<(), ControlError>;
    fn resume(&mut self, pid: u32) -> Result<(), ControlError>;
}

/// SIGSTOP/SIGCONT delivery via kill(2).
#[cfg(unix)]
pub struct SignalSender;

#[cfg(unix)]
impl SignalSender {
    pub fn new() -> Self {
        Self
    }

    fn send(&self, pid: u32, signal: nix::sys::signal::Signal) -> Result<(), ControlError> {
        use nix::errno::Errno;
        use nix::sys::signal::kill;
        use nix::unistd::Pid;

        kill(Pid::from_raw(pid as i32), signal).map_err(|errno| match errno {
            Errno::ESRCH => ControlError::NotFound(pid),
            Errno::EPERM => ControlError::PermissionDenied(pid),
            other => ControlError::Other {
                pid,
                message: other.to_string(),
            },
        })
    }
}

#[cfg(unix)]
impl Default for SignalSender {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
impl ProcessControl for SignalSender {
    fn pause(&mut self, pid: u32) -> Result<(), ControlError> {
        self.send(pid, nix::sys::signal::Signal::SIGSTOP)
    }

    fn resume(&mut self, pid: u32) -> Result<(), ControlError> {
        self.send(pid, nix::sys::signal::Signal::SIGCONT)
    }
}

/// Whether signals to arbitrary processes will be permitted.
#[cfg(unix)]
pub fn running_as_root() -> bool {
    nix::unistd::geteuid().is_root()
}

#[cfg(not(unix))]
pub fn running_as_root() -> bool {
    true
}

/// Best-effort nudge to push the host toward swapping other pages out in
/// favor of the priority process. Requires root and platform tooling; any
/// failure leaves the cycle untouched.
pub fn memory_pressure_hint(pid: u32) -> bool {
    #[cfg(target_os = "macos")]
    {
        use std::process::Command;
        use tracing::debug;

        if !running_as_root() {
            debug!("memory-pressure hint skipped: not running as root");
            return false;
        }
        let _ = Command::new("purge").output();
        match Command::new("memory_pressure")
            .args(["-l", "warn", "-p", &pid.to_string()])
            .output()
        {
            Ok(out) if out.status.success() => true,
            Ok(out) => {
                debug!(status = %out.status, "memory_pressure exited non-zero");
                false
            }
            Err(err) => {
                debug!(error = %err, "memory_pressure unavailable");
                false
            }
        }
    }
    #[cfg(not(target_os = "macos"))]
    {
        let _ = pid;
        tracing::debug!("memory-pressure hint not supported on this platform");
        false
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn missing_pid_maps_to_not_found() {
        let mut sender = SignalSender::new();
        // far beyond any kernel pid_max, but still positive as an i32
        let err = sender.resume(999_999_999).unwrap_err();
        assert_eq!(err, ControlError::NotFound(999_999_999));
    }

    #[test]
    fn error_messages_name_the_pid() {
        assert_eq!(
            ControlError::NotFound(42).to_string(),
            "process 42 no longer exists"
        );
        assert_eq!(
            ControlError::PermissionDenied(7).to_string(),
            "permission denied signalling process 7"
        );
    }
}
