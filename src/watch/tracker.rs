// src/watch/tracker.rs

//! The set of directories registered with the notification backend.
//!
//! Watches are registered non-recursively, one per directory, so the
//! tracker is the single place that decides which directories are observed:
//! everything found at startup, plus directories that appear later and are
//! reported as [`crate::types::Action::WatchNewDir`]. The set only grows.
//!
//! Hidden and generated directories are never watched, and neither is
//! anything the session's [`ExclusionRules`] exclude.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::errors::WatchrunError;
use crate::fs::FileSystem;
use crate::watch::patterns::ExclusionRules;

/// Directory names that are never traversed or watched.
pub const SKIPPED_DIR_NAMES: &[&str] = &["__pycache__", "node_modules", "target"];

/// Directories whose name starts with this marker are never traversed.
pub const HIDDEN_MARKER: char = '.';

/// Something directories can be registered with (the `notify` watcher in
/// production, a recording fake in tests).
pub trait WatchRegistry: Send {
    fn register(&mut self, dir: &Path) -> Result<()>;
}

/// Outcome of the initial registration pass.
#[derive(Debug, Default)]
pub struct RegistrationReport {
    pub registered: usize,
    pub failed: Vec<(PathBuf, String)>,
}

/// Owner of the watch set.
pub struct DirectoryTracker<R: WatchRegistry> {
    root: PathBuf,
    registry: R,
    exclusions: ExclusionRules,
    watched: HashSet<PathBuf>,
}

impl<R: WatchRegistry> fmt::Debug for DirectoryTracker<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryTracker")
            .field("root", &self.root)
            .field("watched", &self.watched.len())
            .finish_non_exhaustive()
    }
}

impl<R: WatchRegistry> DirectoryTracker<R> {
    pub fn new(root: impl Into<PathBuf>, registry: R) -> Self {
        Self {
            root: root.into(),
            registry,
            exclusions: ExclusionRules::default(),
            watched: HashSet::new(),
        }
    }

    /// Skip directories the given rules exclude, relative to the root.
    pub fn with_exclusions(mut self, exclusions: ExclusionRules) -> Self {
        self.exclusions = exclusions;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn contains(&self, dir: &Path) -> bool {
        self.watched.contains(dir)
    }

    pub fn len(&self) -> usize {
        self.watched.len()
    }

    pub fn is_empty(&self) -> bool {
        self.watched.is_empty()
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Enumerate the tree below the root and register every directory.
    ///
    /// Failing to read the root itself is an error; failures on individual
    /// directories are logged and collected in the report.
    pub fn register_initial(&mut self, fs: &dyn FileSystem) -> crate::errors::Result<RegistrationReport> {
        let dirs = enumerate_dirs_where(fs, &self.root, |dir| !self.is_excluded(dir))?;
        let report = self.add_all(dirs);

        info!(
            root = ?self.root,
            registered = report.registered,
            failed = report.failed.len(),
            "initial watch set registered"
        );
        Ok(report)
    }

    /// Register `dir` unless it is already tracked.
    ///
    /// Returns `Ok(true)` if the directory was newly registered and
    /// `Ok(false)` if it was already tracked or is a skipped directory
    /// name.
    pub fn add(&mut self, dir: &Path) -> Result<bool> {
        if self.watched.contains(dir) {
            return Ok(false);
        }

        if dir != self.root && !should_traverse(dir) {
            debug!(dir = ?dir, "not watching hidden or generated directory");
            return Ok(false);
        }

        if self.is_excluded(dir) {
            debug!(dir = ?dir, "not watching excluded directory");
            return Ok(false);
        }

        self.registry.register(dir)?;
        self.watched.insert(dir.to_path_buf());
        debug!(dir = ?dir, "watching directory");
        Ok(true)
    }

    /// Register a directory that appeared after startup together with
    /// everything already below it, applying the same filters as the
    /// initial pass.
    ///
    /// Failing to read `dir` itself is an error; per-directory
    /// registration failures are collected in the report.
    pub fn add_tree(&mut self, fs: &dyn FileSystem, dir: &Path) -> crate::errors::Result<RegistrationReport> {
        if dir != self.root && (!should_traverse(dir) || self.is_excluded(dir)) {
            debug!(dir = ?dir, "not watching hidden, generated or excluded directory");
            return Ok(RegistrationReport::default());
        }

        let dirs = enumerate_dirs_where(fs, dir, |d| !self.is_excluded(d))?;
        Ok(self.add_all(dirs))
    }

    fn add_all(&mut self, dirs: Vec<PathBuf>) -> RegistrationReport {
        let mut report = RegistrationReport::default();
        for dir in dirs {
            match self.add(&dir) {
                Ok(true) => report.registered += 1,
                Ok(false) => {}
                Err(err) => {
                    warn!(dir = ?dir, error = %err, "could not watch directory; skipping");
                    report.failed.push((dir, err.to_string()));
                }
            }
        }
        report
    }

    /// True if the exclusion rules cover `dir`. The root itself and paths
    /// outside it are never excluded.
    fn is_excluded(&self, dir: &Path) -> bool {
        match dir.strip_prefix(&self.root) {
            Ok(rel) if !rel.as_os_str().is_empty() => self.exclusions.excludes(rel),
            _ => false,
        }
    }
}

/// True if the directory's own name is neither hidden nor on the denylist.
pub fn should_traverse(dir: &Path) -> bool {
    match dir.file_name().and_then(|n| n.to_str()) {
        Some(name) => !name.starts_with(HIDDEN_MARKER) && !SKIPPED_DIR_NAMES.contains(&name),
        None => true,
    }
}

/// Recursively collect `root` and every directory below it, skipping
/// hidden and generated directories entirely.
///
/// The result is sorted, with `root` first.
pub fn enumerate_dirs(fs: &dyn FileSystem, root: &Path) -> crate::errors::Result<Vec<PathBuf>> {
    enumerate_dirs_where(fs, root, |_| true)
}

/// [`enumerate_dirs`], additionally pruning every directory for which
/// `keep` is false (its subtree is not descended).
pub fn enumerate_dirs_where<F>(fs: &dyn FileSystem, root: &Path, keep: F) -> crate::errors::Result<Vec<PathBuf>>
where
    F: Fn(&Path) -> bool,
{
    let traversable = |p: &PathBuf| fs.is_dir(p) && should_traverse(p) && keep(p);

    let top = fs.read_dir(root).map_err(|err| WatchrunError::RootUnavailable {
        path: root.to_path_buf(),
        reason: format!("{err:#}"),
    })?;

    let mut dirs = Vec::new();
    let mut stack: Vec<PathBuf> = top
        .into_iter()
        .filter(|p| traversable(p))
        .collect();

    while let Some(dir) = stack.pop() {
        match fs.read_dir(&dir) {
            Ok(entries) => {
                stack.extend(
                    entries
                        .into_iter()
                        .filter(|p| traversable(p)),
                );
            }
            Err(err) => {
                warn!(dir = ?dir, error = %err, "could not read directory; not descending");
            }
        }
        dirs.push(dir);
    }

    dirs.sort();
    dirs.insert(0, root.to_path_buf());
    Ok(dirs)
}
