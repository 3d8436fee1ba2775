// src/exec/handle.rs

//! Per-run process handle.
//!
//! A handle is shared between the supervisor, the exit waiter of its
//! process and (optionally) a timeout timer. State transitions are
//! `NotStarted -> Running -> Stopped`; nothing goes back.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::errors::ProcessError;
use crate::exec::process_group::{ExitStatusInfo, TerminatableProcessGroup};

/// Lifecycle of a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    NotStarted,
    Running,
    Stopped,
}

/// Final result of a run, available once the handle is `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitOutcome {
    /// Exit code; `128 + signal` for signal deaths, `-1` if unknown.
    pub code: i32,
    /// The supervisor itself signalled the process (stop, restart or
    /// timeout).
    pub killed_by_signal: bool,
    /// The signal was sent because the execution timeout elapsed.
    pub timed_out: bool,
}

impl ExitOutcome {
    pub fn success(&self) -> bool {
        self.code == 0 && !self.killed_by_signal
    }
}

#[derive(Debug)]
struct HandleInner {
    state: RunState,
    pid: Option<u32>,
    group: Option<Arc<dyn TerminatableProcessGroup>>,
    outcome: Option<ExitOutcome>,
    stop_requested: bool,
    timed_out: bool,
}

/// Cheaply cloneable handle to one run of the command.
#[derive(Debug, Clone)]
pub struct ProcessHandle {
    run_id: u64,
    inner: Arc<Mutex<HandleInner>>,
    stopped_tx: Arc<watch::Sender<bool>>,
}

impl ProcessHandle {
    pub fn new(run_id: u64) -> Self {
        let (stopped_tx, _) = watch::channel(false);
        Self {
            run_id,
            inner: Arc::new(Mutex::new(HandleInner {
                state: RunState::NotStarted,
                pid: None,
                group: None,
                outcome: None,
                stop_requested: false,
                timed_out: false,
            })),
            stopped_tx: Arc::new(stopped_tx),
        }
    }

    pub fn run_id(&self) -> u64 {
        self.run_id
    }

    pub fn state(&self) -> RunState {
        self.lock().state
    }

    pub fn pid(&self) -> Option<u32> {
        self.lock().pid
    }

    /// The run's outcome, or [`ProcessError::NotDoneYet`] while it has not
    /// stopped.
    pub fn exit_code(&self) -> Result<ExitOutcome, ProcessError> {
        let inner = self.lock();
        match (inner.state, inner.outcome) {
            (RunState::Stopped, Some(outcome)) => Ok(outcome),
            _ => Err(ProcessError::NotDoneYet),
        }
    }

    /// Wait until the handle is `Stopped`, at most `limit`.
    ///
    /// Returns true if it stopped in time.
    pub async fn wait_stopped(&self, limit: Duration) -> bool {
        let mut rx = self.stopped_tx.subscribe();
        matches!(
            tokio::time::timeout(limit, rx.wait_for(|stopped| *stopped)).await,
            Ok(Ok(_))
        )
    }

    pub(crate) fn mark_running(&self, group: Arc<dyn TerminatableProcessGroup>) {
        let mut inner = self.lock();
        inner.pid = group.pid();
        inner.group = Some(group);
        inner.state = RunState::Running;
    }

    /// Flag the run as timed out. Returns false if it already stopped.
    pub(crate) fn mark_timed_out(&self) -> bool {
        let mut inner = self.lock();
        if inner.state != RunState::Running {
            return false;
        }
        inner.timed_out = true;
        true
    }

    /// Called by the exit waiter once the process is gone.
    ///
    /// `status` is `None` if waiting on the process failed.
    pub(crate) fn record_exit(&self, status: Option<ExitStatusInfo>) -> ExitOutcome {
        let outcome = {
            let mut inner = self.lock();
            let code = match status {
                Some(ExitStatusInfo { code: Some(code), .. }) => code,
                Some(ExitStatusInfo { signal: Some(sig), .. }) => 128 + sig,
                _ => -1,
            };
            let outcome = ExitOutcome {
                code,
                killed_by_signal: inner.stop_requested,
                timed_out: inner.timed_out,
            };
            inner.state = RunState::Stopped;
            inner.outcome = Some(outcome);
            inner.group = None;
            outcome
        };
        self.stopped_tx.send_replace(true);
        outcome
    }

    /// Give up on the process: mark the handle `Stopped` even though the
    /// waiter has not observed an exit. Frees the slot for the next run.
    fn release(&self) {
        {
            let mut inner = self.lock();
            if inner.state == RunState::Stopped {
                return;
            }
            let outcome = ExitOutcome {
                code: -1,
                killed_by_signal: true,
                timed_out: inner.timed_out,
            };
            inner.state = RunState::Stopped;
            inner.outcome = Some(outcome);
        }
        self.stopped_tx.send_replace(true);
    }

    /// Stop the run: interrupt the group, wait up to `grace`, then kill it
    /// and wait up to `grace` again.
    ///
    /// When the leader exits on the interrupt, the rest of the group is
    /// killed anyway: members that ignore SIGINT (background jobs of a
    /// non-interactive shell) would otherwise outlive the run.
    ///
    /// The handle is `Stopped` afterwards in every case. A failure to
    /// deliver the kill is returned after the handle has been released.
    /// No-op unless the handle is `Running`.
    pub async fn terminate(&self, grace: Duration) -> Result<(), ProcessError> {
        let (group, pid) = {
            let mut inner = self.lock();
            if inner.state != RunState::Running {
                return Ok(());
            }
            inner.stop_requested = true;
            (inner.group.clone(), inner.pid)
        };

        let Some(group) = group else {
            self.release();
            return Ok(());
        };

        debug!(run_id = self.run_id, ?pid, "interrupting process group");
        match group.interrupt() {
            Ok(()) => {
                if self.wait_stopped(grace).await {
                    self.kill_leftovers(group.as_ref(), pid);
                    return Ok(());
                }
                warn!(
                    run_id = self.run_id,
                    ?pid,
                    grace_ms = grace.as_millis() as u64,
                    "process did not exit after interrupt; killing process group"
                );
            }
            Err(err) => {
                warn!(run_id = self.run_id, ?pid, error = %err, "interrupt failed; killing process group");
            }
        }

        if let Err(source) = group.kill() {
            self.release();
            return Err(ProcessError::StopFailed { pid, source });
        }

        if !self.wait_stopped(grace).await {
            warn!(run_id = self.run_id, ?pid, "process not reaped after kill; releasing handle");
            self.release();
        }
        Ok(())
    }

    fn kill_leftovers(&self, group: &dyn TerminatableProcessGroup, pid: Option<u32>) {
        debug!(run_id = self.run_id, ?pid, "leader exited; killing remaining group members");
        if let Err(err) = group.kill() {
            warn!(run_id = self.run_id, ?pid, error = %err, "could not kill remaining group members");
        }
    }

    fn lock(&self) -> MutexGuard<'_, HandleInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
