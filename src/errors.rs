// src/errors.rs

//! Crate-wide error aliases and helpers.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WatchrunError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Command not found: {0}")]
    CommandNotFound(String),

    #[error("Cannot watch root {path:?}: {reason}")]
    RootUnavailable { path: PathBuf, reason: String },

    #[error("File watch error: {0}")]
    NotifyError(#[from] notify::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("filesystem event source closed unexpectedly")]
    SourceClosed,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl WatchrunError {
    /// True for failures that happen before the session is running
    /// (bad config, missing command, unreadable root, notify setup).
    pub fn is_setup_error(&self) -> bool {
        matches!(
            self,
            WatchrunError::ConfigError(_)
                | WatchrunError::CommandNotFound(_)
                | WatchrunError::RootUnavailable { .. }
                | WatchrunError::NotifyError(_)
                | WatchrunError::TomlError(_)
        )
    }

    /// Process exit code: 2 for setup failures, 1 for everything else.
    pub fn exit_code(&self) -> u8 {
        if self.is_setup_error() { 2 } else { 1 }
    }
}

/// Why an event could not be classified.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassifyError {
    #[error("event path is not absolute: {0:?}")]
    InvalidPath(PathBuf),

    #[error("event path {path:?} is outside base {base:?}")]
    OutsideBase { path: PathBuf, base: PathBuf },
}

/// Failures reported by the process supervisor.
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("a process is already running (pid {0:?})")]
    AlreadyRunning(Option<u32>),

    #[error("could not spawn '{program}': {source}")]
    SpawnFailure {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("process has not exited yet")]
    NotDoneYet,

    #[error("could not terminate process group (pid {pid:?}): {source}")]
    StopFailed {
        pid: Option<u32>,
        #[source]
        source: std::io::Error,
    },
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, WatchrunError>;
