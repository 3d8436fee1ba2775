// src/engine/mod.rs

//! Orchestration engine for watchrun.
//!
//! This module ties together:
//! - classification of raw filesystem events
//! - growth of the watch set
//! - the debouncer
//! - the process supervisor
//! - shutdown
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use std::path::PathBuf;

use crate::exec::ExitOutcome;
use crate::types::RawEvent;

/// Why the command is being (re)started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestartReason {
    /// The unconditional run at startup.
    Initial,
    /// A settled burst of changes; carries the last changed path.
    Change(PathBuf),
}

/// Why the runtime loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    Shutdown,
    SourceClosed,
}

/// Events flowing into the runtime from the watcher, debouncer, exit
/// waiters and the host.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// A raw filesystem event from the event source.
    FileChanged(RawEvent),
    /// The debouncer decided a burst has settled.
    Fire { path: PathBuf },
    /// A run of the command ended.
    ProcessStopped { run_id: u64, outcome: ExitOutcome },
    /// The filesystem event source went away.
    SourceClosed,
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub mod core;
pub mod event_handlers;
pub mod runtime;

pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use runtime::{Runtime, RuntimeChannels};
