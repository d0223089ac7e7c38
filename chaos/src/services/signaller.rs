//! SIGKILL delivery through `nix`

use crate::error::{HarnessError, HarnessResult};
use crate::traits::Signaller;

#[derive(Debug, Clone, Copy, Default)]
pub struct NixSignaller;

#[cfg(unix)]
impl Signaller for NixSignaller {
    fn kill(&self, pid: u32) -> HarnessResult<()> {
        use nix::sys::signal::{self, Signal};
        use nix::unistd::Pid;

        let raw = to_raw(pid)?;
        signal::kill(Pid::from_raw(raw), Signal::SIGKILL).map_err(|e| HarnessError::signal(format!("pid {pid}"), e))
    }

    fn kill_group(&self, pgid: u32) -> HarnessResult<()> {
        use nix::sys::signal::{self, Signal};
        use nix::unistd::Pid;

        let raw = to_raw(pgid)?;
        signal::killpg(Pid::from_raw(raw), Signal::SIGKILL)
            .map_err(|e| HarnessError::signal(format!("process group {pgid}"), e))
    }
}

#[cfg(not(unix))]
impl Signaller for NixSignaller {
    fn kill(&self, pid: u32) -> HarnessResult<()> {
        Err(HarnessError::signal(format!("pid {pid}"), "signals are only supported on unix"))
    }

    fn kill_group(&self, pgid: u32) -> HarnessResult<()> {
        Err(HarnessError::signal(format!("process group {pgid}"), "signals are only supported on unix"))
    }
}

/// Refuse pids that would address "every process" or a whole group by accident
#[cfg(unix)]
fn to_raw(pid: u32) -> HarnessResult<i32> {
    match i32::try_from(pid) {
        Ok(raw) if raw > 1 => Ok(raw),
        _ => Err(HarnessError::signal(format!("pid {pid}"), "refusing to signal reserved pid")),
    }
}
