//! Process-group signalling for Git children.
//!
//! Every Git child is started as the leader of a fresh process group, so
//! its group id equals its pid. Signalling the group reaches any helper
//! processes Git forks (`pack-objects`, hooks, shells) as well.

use std::io;

/// Signal to deliver to a process group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KillSignal {
    /// SIGTERM
    Term,
    /// SIGKILL
    #[default]
    Kill,
}

#[cfg(unix)]
impl KillSignal {
    fn as_libc_signal(self) -> libc::c_int {
        match self {
            KillSignal::Term => libc::SIGTERM,
            KillSignal::Kill => libc::SIGKILL,
        }
    }
}

/// Send `signal` to every process in group `pgid`.
///
/// A group that no longer exists is not an error.
#[cfg(unix)]
pub fn kill_process_group(pgid: u32, signal: KillSignal) -> io::Result<()> {
    let pgid = pgid as libc::pid_t;
    // killpg(0, ..) would signal our own group.
    if pgid <= 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "refusing to signal process group 0",
        ));
    }

    let result = unsafe { libc::killpg(pgid, signal.as_libc_signal()) };
    if result == -1 {
        let err = io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::ESRCH) {
            return Err(err);
        }
    }

    Ok(())
}

/// No-op on non-Unix platforms.
#[cfg(not(unix))]
pub fn kill_process_group(_pgid: u32, _signal: KillSignal) -> io::Result<()> {
    Ok(())
}
