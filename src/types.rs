// src/types.rs

//! Small value types shared between the watcher, the engine and the
//! supervisor.

use std::fmt;
use std::path::{Path, PathBuf};

/// What happened to a path, as reported by the notification backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Write,
    Remove,
    Chmod,
    Rename,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operation::Create => "CREATE",
            Operation::Write => "WRITE",
            Operation::Remove => "REMOVE",
            Operation::Chmod => "CHMOD",
            Operation::Rename => "RENAME",
        };
        f.write_str(s)
    }
}

/// A single filesystem event as delivered by the event source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub path: PathBuf,
    pub operation: Operation,
}

impl RawEvent {
    pub fn new(path: impl Into<PathBuf>, operation: Operation) -> Self {
        Self {
            path: path.into(),
            operation,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for RawEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.operation, self.path.display())
    }
}

/// Result of classifying a [`RawEvent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Nothing to do.
    Ignore,
    /// Content changed; should eventually cause a rerun.
    Trigger(PathBuf),
    /// A new directory appeared and must be added to the watch set.
    WatchNewDir(PathBuf),
}

impl Action {
    pub fn is_ignore(&self) -> bool {
        matches!(self, Action::Ignore)
    }
}
