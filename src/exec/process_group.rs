// src/exec/process_group.rs

//! Capability traits for launching and terminating process groups.
//!
//! The supervisor never touches OS signals directly. It launches through a
//! [`ProcessLauncher`] and terminates through a
//! [`TerminatableProcessGroup`], so its escalation policy can be tested
//! against fakes.

use std::fmt::Debug;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;

use tokio::process::Command;
use tracing::debug;

use crate::exec::command::CommandSpec;

/// A running process group that can be asked to stop.
pub trait TerminatableProcessGroup: Send + Sync + Debug {
    /// Process (and group) id, if known.
    fn pid(&self) -> Option<u32>;

    /// Ask every process in the group to stop (SIGINT on unix).
    fn interrupt(&self) -> io::Result<()>;

    /// Forcefully kill every process in the group (SIGKILL on unix).
    fn kill(&self) -> io::Result<()>;
}

/// How a process ended, as observed by its waiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitStatusInfo {
    /// Exit code for a normal exit.
    pub code: Option<i32>,
    /// Terminating signal, if the process was killed by one.
    pub signal: Option<i32>,
}

impl ExitStatusInfo {
    pub fn exited(code: i32) -> Self {
        Self {
            code: Some(code),
            signal: None,
        }
    }

    pub fn signalled(signal: i32) -> Self {
        Self {
            code: None,
            signal: Some(signal),
        }
    }
}

impl From<ExitStatus> for ExitStatusInfo {
    fn from(status: ExitStatus) -> Self {
        #[cfg(unix)]
        let signal = {
            use std::os::unix::process::ExitStatusExt;
            status.signal()
        };
        #[cfg(not(unix))]
        let signal = None;

        Self {
            code: status.code(),
            signal,
        }
    }
}

/// Future resolving once the launched process has exited.
pub type ExitFuture = Pin<Box<dyn Future<Output = io::Result<ExitStatusInfo>> + Send>>;

/// A freshly launched process: its group plus a future for its exit.
pub struct LaunchedProcess {
    pub group: Arc<dyn TerminatableProcessGroup>,
    pub exit: ExitFuture,
}

impl Debug for LaunchedProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LaunchedProcess")
            .field("group", &self.group)
            .finish_non_exhaustive()
    }
}

/// Trait abstracting how commands are launched.
///
/// Production code uses [`OsProcessLauncher`]; tests can provide their own
/// implementation that doesn't spawn real processes.
pub trait ProcessLauncher: Send + Sync {
    fn launch(&self, spec: &CommandSpec) -> io::Result<LaunchedProcess>;
}

/// Launches real OS processes, each in its own process group.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsProcessLauncher;

impl ProcessLauncher for OsProcessLauncher {
    fn launch(&self, spec: &CommandSpec) -> io::Result<LaunchedProcess> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .envs(&spec.env)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        if let Some(dir) = &spec.working_dir {
            cmd.current_dir(dir);
        }

        // New group whose id equals the child's pid; signals sent to the
        // group never reach us.
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn()?;
        let pid = child.id();
        debug!(?pid, program = %spec.program, "spawned child process");

        let exit: ExitFuture = Box::pin(async move {
            let status = child.wait().await?;
            Ok(ExitStatusInfo::from(status))
        });

        Ok(LaunchedProcess {
            group: Arc::new(OsProcessGroup { pid }),
            exit,
        })
    }
}

/// Process group rooted at a child spawned by [`OsProcessLauncher`].
#[derive(Debug, Clone, Copy)]
pub struct OsProcessGroup {
    pid: Option<u32>,
}

impl TerminatableProcessGroup for OsProcessGroup {
    fn pid(&self) -> Option<u32> {
        self.pid
    }

    #[cfg(unix)]
    fn interrupt(&self) -> io::Result<()> {
        signal_group(self.pid, libc::SIGINT)
    }

    #[cfg(unix)]
    fn kill(&self) -> io::Result<()> {
        signal_group(self.pid, libc::SIGKILL)
    }

    // No process-group signals here; terminate the tree forcefully.
    #[cfg(not(unix))]
    fn interrupt(&self) -> io::Result<()> {
        self.kill()
    }

    #[cfg(not(unix))]
    fn kill(&self) -> io::Result<()> {
        let Some(pid) = self.pid else {
            return Ok(());
        };
        let status = std::process::Command::new("taskkill")
            .args(["/T", "/F", "/PID", &pid.to_string()])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()?;
        if status.success() {
            Ok(())
        } else {
            Err(io::Error::other(format!("taskkill exited with {status}")))
        }
    }
}

/// Send `sig` to the whole group. A group that no longer exists counts as
/// success: there is nothing left to stop.
#[cfg(unix)]
fn signal_group(pid: Option<u32>, sig: libc::c_int) -> io::Result<()> {
    let Some(pid) = pid else {
        return Ok(());
    };
    let pgid = libc::pid_t::try_from(pid)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;

    // SAFETY: killpg only reads its integer arguments.
    let rc = unsafe { libc::killpg(pgid, sig) };
    if rc == 0 {
        return Ok(());
    }

    let err = io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::ESRCH) {
        return Ok(());
    }
    Err(err)
}
