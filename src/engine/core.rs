// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces a list of "commands" describing
//! what the IO shell should do next.
//!
//! The async/IO-heavy shell (`engine::runtime::Runtime`) is responsible for:
//! - reading events from channels
//! - registering directories, feeding the debouncer, starting processes
//! - handling Ctrl+C / shutdown
//!
//! The core is intended to be extensively unit tested without any Tokio,
//! channels, filesystem, or processes. The only outside knowledge it needs,
//! "is this path a directory?", is passed into [`CoreRuntime::step`].

use std::path::{Path, PathBuf};

use crate::engine::event_handlers::{
    handle_file_changed, handle_fire, handle_process_stopped, CoreCommand, CoreStep,
};
use crate::engine::{ExitReason, RestartReason, RuntimeEvent};
use crate::watch::path_utils::clean_path;
use crate::watch::patterns::{ExclusionRules, MatchRules};

/// Pure core runtime state.
///
/// It has **no** channels, no Tokio types, and does not perform any IO.
#[derive(Debug)]
pub struct CoreRuntime {
    base: PathBuf,
    exclusions: ExclusionRules,
    matches: MatchRules,
    exit_reason: Option<ExitReason>,
}

impl CoreRuntime {
    pub fn new(base: impl AsRef<Path>, exclusions: ExclusionRules, matches: MatchRules) -> Self {
        Self {
            base: clean_path(base.as_ref()),
            exclusions,
            matches,
            exit_reason: None,
        }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Why the core asked the loop to stop, once it has.
    pub fn exit_reason(&self) -> Option<ExitReason> {
        self.exit_reason
    }

    /// Commands for the mandatory run at startup, issued before any event
    /// is consumed.
    pub fn initial_step(&self) -> CoreStep {
        CoreStep::with(CoreCommand::Restart {
            reason: RestartReason::Initial,
        })
    }

    /// Handle a single runtime event, returning the resulting commands for
    /// the IO shell.
    ///
    /// `is_dir` is asked about paths relative to the base directory.
    pub fn step<F>(&mut self, event: RuntimeEvent, is_dir: F) -> CoreStep
    where
        F: Fn(&Path) -> bool,
    {
        if self.exit_reason.is_some() {
            return CoreStep::exit(Vec::new());
        }

        match event {
            RuntimeEvent::FileChanged(raw) => {
                handle_file_changed(&self.base, &self.exclusions, &self.matches, raw, is_dir)
            }
            RuntimeEvent::Fire { path } => handle_fire(path),
            RuntimeEvent::ProcessStopped { run_id, outcome } => {
                handle_process_stopped(run_id, outcome)
            }
            RuntimeEvent::SourceClosed => {
                self.exit_reason = Some(ExitReason::SourceClosed);
                CoreStep::exit(vec![CoreCommand::StopCurrent])
            }
            RuntimeEvent::ShutdownRequested => {
                self.exit_reason = Some(ExitReason::Shutdown);
                CoreStep::exit(vec![CoreCommand::StopCurrent])
            }
        }
    }
}
