// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::config::duration::RawDuration;
use crate::debounce::DebounceSettings;
use crate::exec::{CommandSpec, SupervisorOptions};
use crate::watch::patterns::{ExclusionRules, MatchRules};

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [watch]
/// dir = "."
/// exclude = [".git", "__pycache__"]
/// exclude_paths = ["bin"]
/// match = ["*.rs"]
///
/// [run]
/// cmd = "cargo"
/// args = ["test"]
/// env = { RUST_BACKTRACE = "1" }
/// delay = "100ms"
/// ignore_window = "500ms"
/// timeout = "5m"
/// grace = "2s"
/// cwd = "."
/// ```
///
/// All sections are optional. Command-line flags are layered on top before
/// validation turns this into a [`WatchConfig`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub watch: WatchSection,

    #[serde(default)]
    pub run: RunSection,
}

/// `[watch]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchSection {
    /// Root directory. Relative paths are resolved against the directory
    /// containing the config file.
    #[serde(default)]
    pub dir: Option<PathBuf>,

    /// Path segment names to ignore at any depth.
    ///
    /// If `None`, `.git` and `__pycache__` are used.
    #[serde(default)]
    pub exclude: Option<Vec<String>>,

    /// Prefixes of the root-relative path to ignore.
    #[serde(default)]
    pub exclude_paths: Vec<String>,

    /// Glob patterns a changed file must match to trigger a run.
    #[serde(default, rename = "match")]
    pub match_patterns: Vec<String>,
}

/// `[run]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunSection {
    /// Program to run.
    #[serde(default)]
    pub cmd: Option<String>,

    #[serde(default)]
    pub args: Vec<String>,

    /// Environment overrides on top of the inherited environment.
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Working directory of the command; relative paths are resolved
    /// against the watch root, which is also the default.
    #[serde(default)]
    pub cwd: Option<PathBuf>,

    /// Settle delay.
    #[serde(default)]
    pub delay: Option<RawDuration>,

    #[serde(default)]
    pub ignore_window: Option<RawDuration>,

    /// Stop a run that is still alive after this long.
    #[serde(default)]
    pub timeout: Option<RawDuration>,

    /// Grace period between interrupt and kill.
    #[serde(default)]
    pub grace: Option<RawDuration>,
}

/// Fully validated session configuration.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Absolute, cleaned root directory.
    pub root: PathBuf,
    pub exclusions: ExclusionRules,
    pub matches: MatchRules,
    pub command: CommandSpec,
    pub debounce: DebounceSettings,
    pub supervisor: SupervisorOptions,
}

impl WatchConfig {
    /// Build a config without validation; callers are responsible for an
    /// absolute root and a runnable command. The command runs in the root
    /// unless it already names a working directory.
    pub fn new_unchecked(root: PathBuf, mut command: CommandSpec) -> Self {
        if command.working_dir.is_none() {
            command.working_dir = Some(root.clone());
        }
        Self {
            root,
            exclusions: ExclusionRules::default_parts(),
            matches: MatchRules::any(),
            command,
            debounce: DebounceSettings::default(),
            supervisor: SupervisorOptions::default(),
        }
    }
}
