//! Process liveness probing
//!
//! The launcher only ever asks one question of another process: does it
//! exist? [`LivenessProbe`] is that question as a capability, so the launch
//! flow can be driven by a deterministic oracle in tests.

use crate::pidfile::Pid;

/// Answers whether a process id currently refers to a live process
pub trait LivenessProbe {
    fn is_alive(&self, pid: Pid) -> bool;
}

/// Probe backed by the null signal: `kill(pid, 0)`
///
/// | `kill` result | Meaning                          | Reported |
/// |---------------|----------------------------------|----------|
/// | `0`           | process exists and is signalable | alive    |
/// | `EPERM`       | exists, owned by another user    | alive    |
/// | `ESRCH`       | no such process                  | dead     |
/// | anything else | invalid / unsupported            | dead     |
///
/// On non-Unix platforms every pid is reported dead.
#[derive(Debug, Default, Clone, Copy)]
pub struct SignalProbe;

impl LivenessProbe for SignalProbe {
    #[cfg(unix)]
    fn is_alive(&self, pid: Pid) -> bool {
        // SAFETY: signal 0 performs the permission and existence checks
        // without delivering anything. `Pid` is always > 0, so this never
        // targets a process group.
        let result = unsafe { libc::kill(pid.get(), 0) };
        if result == 0 {
            return true;
        }
        match std::io::Error::last_os_error().raw_os_error() {
            Some(libc::EPERM) => true,
            Some(libc::ESRCH) => false,
            errno => {
                tracing::debug!(%pid, ?errno, "liveness probe failed, treating as dead");
                false
            }
        }
    }

    #[cfg(not(unix))]
    fn is_alive(&self, _pid: Pid) -> bool {
        false
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::process::Command;

    #[test]
    fn test_current_process_is_alive() {
        let pid = Pid::from_u32(std::process::id()).unwrap();
        assert!(SignalProbe.is_alive(pid));
    }

    #[test]
    fn test_pid_beyond_kernel_range_is_dead() {
        // Larger than any pid_max the kernel accepts, so kill() yields ESRCH.
        let pid = Pid::new(i32::MAX).unwrap();
        assert!(!SignalProbe.is_alive(pid));
    }

    #[test]
    fn test_reaped_child_is_dead() {
        let mut child = Command::new("true").spawn().unwrap();
        let pid = Pid::from_u32(child.id()).unwrap();
        child.wait().unwrap();

        assert!(!SignalProbe.is_alive(pid));
    }

    #[test]
    fn test_init_is_alive_even_without_permission() {
        // pid 1 exists everywhere; unprivileged callers get EPERM.
        assert!(SignalProbe.is_alive(Pid::new(1).unwrap()));
    }
}
