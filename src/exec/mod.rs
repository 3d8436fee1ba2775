// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`command`] describes what to run and resolves the program on `PATH`.
//! - [`process_group`] holds the launch/terminate capability traits and
//!   their OS implementations.
//! - [`handle`] is the per-run state shared with the exit waiter.
//! - [`supervisor`] owns the current run and its stop escalation.

pub mod command;
pub mod handle;
pub mod process_group;
pub mod supervisor;

pub use command::{resolve_program, CommandSpec};
pub use handle::{ExitOutcome, ProcessHandle, RunState};
pub use process_group::{
    ExitFuture, ExitStatusInfo, LaunchedProcess, OsProcessGroup, OsProcessLauncher,
    ProcessLauncher, TerminatableProcessGroup,
};
pub use supervisor::{ProcessSupervisor, SupervisorOptions, DEFAULT_GRACE_PERIOD};
