// src/exec/supervisor.rs

//! Single-slot process supervisor.
//!
//! At most one run of the configured command is current. Starting a new
//! run while the current one is still alive is refused; [`restart`]
//! stops the current run first, so the latest request always wins.
//!
//! Each started run gets:
//! - an exit waiter task that moves the handle to `Stopped` and reports a
//!   `RuntimeEvent::ProcessStopped` to the runtime,
//! - optionally a timeout task that stops the run through the same path
//!   as a manual stop.
//!
//! [`restart`]: ProcessSupervisor::restart

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::engine::RuntimeEvent;
use crate::errors::ProcessError;
use crate::exec::command::CommandSpec;
use crate::exec::handle::{ExitOutcome, ProcessHandle, RunState};
use crate::exec::process_group::ProcessLauncher;

pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorOptions {
    /// How long to wait after each signal before escalating or giving up.
    pub grace_period: Duration,
    /// Stop a run that is still alive after this long.
    pub timeout: Option<Duration>,
}

impl Default for SupervisorOptions {
    fn default() -> Self {
        Self {
            grace_period: DEFAULT_GRACE_PERIOD,
            timeout: None,
        }
    }
}

pub struct ProcessSupervisor<L: ProcessLauncher> {
    launcher: Arc<L>,
    options: SupervisorOptions,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    current: Option<ProcessHandle>,
    next_run_id: u64,
}

impl<L: ProcessLauncher> fmt::Debug for ProcessSupervisor<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessSupervisor")
            .field("options", &self.options)
            .field("current", &self.current)
            .field("next_run_id", &self.next_run_id)
            .finish_non_exhaustive()
    }
}

impl<L: ProcessLauncher + 'static> ProcessSupervisor<L> {
    pub fn new(launcher: L, options: SupervisorOptions, runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        Self {
            launcher: Arc::new(launcher),
            options,
            runtime_tx,
            current: None,
            next_run_id: 1,
        }
    }

    /// The most recently started handle, whatever its state.
    pub fn current(&self) -> Option<&ProcessHandle> {
        self.current.as_ref()
    }

    /// Launch `spec` as the new current run.
    ///
    /// Must be called from within a Tokio runtime: the exit waiter and the
    /// timeout timer are spawned as tasks.
    pub fn start(&mut self, spec: &CommandSpec) -> Result<ProcessHandle, ProcessError> {
        if let Some(current) = &self.current
            && current.state() == RunState::Running
        {
            return Err(ProcessError::AlreadyRunning(current.pid()));
        }

        let run_id = self.next_run_id;
        self.next_run_id += 1;

        let launched = self
            .launcher
            .launch(spec)
            .map_err(|source| ProcessError::SpawnFailure {
                program: spec.program.clone(),
                source,
            })?;

        let handle = ProcessHandle::new(run_id);
        handle.mark_running(launched.group);
        info!(run_id, pid = ?handle.pid(), command = %spec, "command started");

        let waiter_handle = handle.clone();
        let runtime_tx = self.runtime_tx.clone();
        let exit = launched.exit;
        tokio::spawn(async move {
            let status = match exit.await {
                Ok(status) => Some(status),
                Err(err) => {
                    warn!(run_id, error = %err, "failed to wait for command");
                    None
                }
            };
            let outcome = waiter_handle.record_exit(status);
            log_outcome(run_id, &outcome);
            let _ = runtime_tx
                .send(RuntimeEvent::ProcessStopped { run_id, outcome })
                .await;
        });

        if let Some(limit) = self.options.timeout {
            let timer_handle = handle.clone();
            let grace = self.options.grace_period;
            tokio::spawn(async move {
                if timer_handle.wait_stopped(limit).await || !timer_handle.mark_timed_out() {
                    return;
                }
                warn!(
                    run_id,
                    timeout_ms = limit.as_millis() as u64,
                    "command exceeded its timeout; stopping it"
                );
                if let Err(err) = timer_handle.terminate(grace).await {
                    warn!(run_id, error = %err, "failed to stop timed out command");
                }
            });
        }

        self.current = Some(handle.clone());
        Ok(handle)
    }

    /// Stop `handle`: interrupt, wait, kill, wait. No-op unless it is
    /// running.
    pub async fn stop(&self, handle: &ProcessHandle) -> Result<(), ProcessError> {
        if handle.state() != RunState::Running {
            debug!(run_id = handle.run_id(), state = ?handle.state(), "stop on a handle that is not running");
            return Ok(());
        }
        info!(run_id = handle.run_id(), pid = ?handle.pid(), "stopping command");
        handle.terminate(self.options.grace_period).await
    }

    /// Stop the current run, if any.
    pub async fn stop_current(&self) -> Result<(), ProcessError> {
        match &self.current {
            Some(handle) => self.stop(handle).await,
            None => Ok(()),
        }
    }

    pub fn exit_code(&self, handle: &ProcessHandle) -> Result<ExitOutcome, ProcessError> {
        handle.exit_code()
    }

    /// Stop whatever is current, then start `spec`.
    ///
    /// Stop failures are only logged: the handle is released either way, so
    /// the new run can always start.
    pub async fn restart(&mut self, spec: &CommandSpec) -> Result<ProcessHandle, ProcessError> {
        if let Err(err) = self.stop_current().await {
            warn!(error = %err, "failed to stop previous run cleanly");
        }
        self.start(spec)
    }
}

fn log_outcome(run_id: u64, outcome: &ExitOutcome) {
    if outcome.timed_out {
        warn!(run_id, exit_code = outcome.code, "command stopped after timeout");
    } else if outcome.killed_by_signal {
        info!(run_id, exit_code = outcome.code, "command stopped");
    } else if outcome.code == 0 {
        info!(run_id, exit_code = outcome.code, "command finished");
    } else {
        error!(run_id, exit_code = outcome.code, "command failed");
    }
}
