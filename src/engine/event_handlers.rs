// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use std::path::{Path, PathBuf};

use tracing::{debug, trace, warn};

use crate::engine::RestartReason;
use crate::exec::ExitOutcome;
use crate::types::{Action, RawEvent};
use crate::watch::classify;
use crate::watch::path_utils::relative_str;
use crate::watch::patterns::{ExclusionRules, MatchRules};

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// Register a newly appeared directory with the watch set.
    WatchDir(PathBuf),
    /// Feed a trigger into the debouncer.
    Debounce(PathBuf),
    /// Stop the current run (if any) and start a new one.
    Restart { reason: RestartReason },
    /// Tell the debouncer the current run ended.
    NotifyStopped(ExitOutcome),
    /// Stop the current run without starting another.
    StopCurrent,
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreStep {
    /// Commands the IO shell should execute, in order.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    pub fn idle() -> Self {
        Self {
            commands: Vec::new(),
            keep_running: true,
        }
    }

    pub fn with(command: CoreCommand) -> Self {
        Self {
            commands: vec![command],
            keep_running: true,
        }
    }

    pub fn exit(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: false,
        }
    }
}

/// Handle a raw filesystem event.
///
/// Classification errors are not fatal: they are logged and the event is
/// dropped. A trigger whose path matches none of the match rules is
/// dropped too.
pub fn handle_file_changed<F>(
    base: &Path,
    exclusions: &ExclusionRules,
    matches: &MatchRules,
    event: RawEvent,
    is_dir: F,
) -> CoreStep
where
    F: Fn(&Path) -> bool,
{
    let action = match classify(&event, base, exclusions, is_dir) {
        Ok(action) => action,
        Err(err) => {
            warn!(event = %event, error = %err, "could not classify event; ignoring");
            return CoreStep::idle();
        }
    };

    match action {
        Action::Ignore => {
            trace!(event = %event, "event ignored");
            CoreStep::idle()
        }
        Action::WatchNewDir(dir) => CoreStep::with(CoreCommand::WatchDir(dir)),
        Action::Trigger(path) => {
            let rel = relative_str(base, &path).unwrap_or_default();
            if !matches.matches(&rel) {
                debug!(path = ?path, "change does not match any pattern; ignoring");
                return CoreStep::idle();
            }
            CoreStep::with(CoreCommand::Debounce(path))
        }
    }
}

/// Handle a settled burst.
pub fn handle_fire(path: PathBuf) -> CoreStep {
    CoreStep::with(CoreCommand::Restart {
        reason: RestartReason::Change(path),
    })
}

/// Handle the end of a run.
pub fn handle_process_stopped(run_id: u64, outcome: ExitOutcome) -> CoreStep {
    trace!(run_id, ?outcome, "process stopped");
    CoreStep::with(CoreCommand::NotifyStopped(outcome))
}
