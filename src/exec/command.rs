// src/exec/command.rs

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::errors::{Result, WatchrunError};

/// Everything needed to launch one run of the configured command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Overrides layered on top of the inherited environment.
    pub env: BTreeMap<String, String>,
    pub working_dir: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            working_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Locate `program` the way a shell would: paths containing a separator
/// are used as-is, bare names are looked up on `PATH`.
pub fn resolve_program(program: &str) -> Result<PathBuf> {
    resolve_in(program, std::env::var_os("PATH").as_deref())
}

/// [`resolve_program`] against an explicit `PATH` value.
pub fn resolve_in(program: &str, path_var: Option<&OsStr>) -> Result<PathBuf> {
    let candidate = Path::new(program);
    if program.is_empty() {
        return Err(WatchrunError::CommandNotFound(program.to_string()));
    }

    if candidate.is_absolute() || candidate.components().count() > 1 {
        if is_executable(candidate) {
            return Ok(candidate.to_path_buf());
        }
        return Err(WatchrunError::CommandNotFound(program.to_string()));
    }

    if let Some(paths) = path_var {
        for dir in std::env::split_paths(paths) {
            let full = dir.join(program);
            if is_executable(&full) {
                return Ok(full);
            }
            #[cfg(windows)]
            {
                let exe = full.with_extension("exe");
                if is_executable(&exe) {
                    return Ok(exe);
                }
            }
        }
    }

    Err(WatchrunError::CommandNotFound(program.to_string()))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
