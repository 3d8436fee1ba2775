// src/config/validate.rs

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::duration::RawDuration;
use crate::config::model::{RawConfigFile, WatchConfig};
use crate::debounce::DebounceSettings;
use crate::errors::{Result, WatchrunError};
use crate::exec::{CommandSpec, SupervisorOptions, DEFAULT_GRACE_PERIOD};
use crate::fs::{FileSystem, RealFileSystem};
use crate::watch::path_utils::clean_path;
use crate::watch::patterns::{ExclusionRules, MatchRules, DEFAULT_EXCLUDED_PARTS};

impl TryFrom<RawConfigFile> for WatchConfig {
    type Error = WatchrunError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_config(raw, &RealFileSystem)
    }
}

/// Validate `raw` and resolve it into a [`WatchConfig`].
///
/// The root directory is looked up through `fs`; an unset root means the
/// current working directory.
pub fn validate_config(raw: RawConfigFile, fs: &dyn FileSystem) -> Result<WatchConfig> {
    let command = validate_command(&raw)?;
    let root = resolve_root(raw.watch.dir.as_deref(), fs)?;
    let command = command.working_dir(resolve_cwd(raw.run.cwd.as_deref(), &root, fs)?);

    let parts: Vec<String> = match &raw.watch.exclude {
        Some(parts) => parts.clone(),
        None => DEFAULT_EXCLUDED_PARTS.iter().map(|s| s.to_string()).collect(),
    };
    let exclusions = ExclusionRules::new(parts, raw.watch.exclude_paths.iter().cloned());

    let matches = MatchRules::new(&raw.watch.match_patterns)
        .map_err(|e| WatchrunError::ConfigError(format!("[watch].match: {e:#}")))?;

    let debounce = DebounceSettings {
        settle_delay: duration_or(&raw.run.delay, "delay", DebounceSettings::default().settle_delay)?,
        ignore_window: duration_or(&raw.run.ignore_window, "ignore_window", Duration::ZERO)?,
    };

    let timeout = raw
        .run
        .timeout
        .as_ref()
        .map(|d| parse_field(d, "timeout"))
        .transpose()?;
    if timeout == Some(Duration::ZERO) {
        return Err(WatchrunError::ConfigError(
            "[run].timeout must be greater than zero".to_string(),
        ));
    }

    let supervisor = SupervisorOptions {
        grace_period: duration_or(&raw.run.grace, "grace", DEFAULT_GRACE_PERIOD)?,
        timeout,
    };

    Ok(WatchConfig {
        root,
        exclusions,
        matches,
        command,
        debounce,
        supervisor,
    })
}

fn validate_command(raw: &RawConfigFile) -> Result<CommandSpec> {
    let program = match raw.run.cmd.as_deref().map(str::trim) {
        Some(cmd) if !cmd.is_empty() => cmd,
        _ => {
            return Err(WatchrunError::ConfigError(
                "no command given; pass one on the command line or set [run].cmd".to_string(),
            ));
        }
    };

    for key in raw.run.env.keys() {
        validate_env_key(key)?;
    }

    let mut spec = CommandSpec::new(program).args(raw.run.args.iter().cloned());
    spec.env = raw.run.env.clone();
    Ok(spec)
}

pub(crate) fn validate_env_key(key: &str) -> Result<()> {
    if key.is_empty() || key.contains('=') || key.contains('\0') {
        return Err(WatchrunError::ConfigError(format!(
            "invalid environment variable name '{key}'"
        )));
    }
    Ok(())
}

fn resolve_root(dir: Option<&Path>, fs: &dyn FileSystem) -> Result<PathBuf> {
    let dir = match dir {
        Some(dir) => dir.to_path_buf(),
        None => std::env::current_dir()?,
    };

    if !fs.is_dir(&dir) {
        return Err(WatchrunError::RootUnavailable {
            path: dir,
            reason: "not an existing directory".to_string(),
        });
    }

    let canonical = fs
        .canonicalize(&dir)
        .map_err(|e| WatchrunError::RootUnavailable {
            path: dir.clone(),
            reason: format!("{e:#}"),
        })?;
    Ok(clean_path(&canonical))
}

fn resolve_cwd(cwd: Option<&Path>, root: &Path, fs: &dyn FileSystem) -> Result<PathBuf> {
    let Some(cwd) = cwd else {
        return Ok(root.to_path_buf());
    };

    let dir = clean_path(&root.join(cwd));
    if !fs.is_dir(&dir) {
        return Err(WatchrunError::ConfigError(format!(
            "[run].cwd: {} is not an existing directory",
            dir.display()
        )));
    }
    Ok(dir)
}

fn duration_or(value: &Option<RawDuration>, field: &str, default: Duration) -> Result<Duration> {
    match value {
        Some(d) => parse_field(d, field),
        None => Ok(default),
    }
}

fn parse_field(value: &RawDuration, field: &str) -> Result<Duration> {
    value
        .to_duration()
        .map_err(|e| WatchrunError::ConfigError(format!("[run].{field}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn raw_with_cmd(cmd: &str) -> RawConfigFile {
        let mut raw = RawConfigFile::default();
        raw.run.cmd = Some(cmd.to_string());
        raw.watch.dir = Some(PathBuf::from("/proj"));
        raw
    }

    fn fs() -> MockFileSystem {
        let fs = MockFileSystem::new();
        fs.add_dir("/proj");
        fs
    }

    #[test]
    fn defaults_apply() {
        let cfg = validate_config(raw_with_cmd("make"), &fs()).unwrap();
        assert_eq!(cfg.root, PathBuf::from("/proj"));
        assert_eq!(cfg.debounce.settle_delay, Duration::from_millis(100));
        assert_eq!(cfg.debounce.ignore_window, Duration::ZERO);
        assert_eq!(cfg.supervisor.grace_period, Duration::from_secs(2));
        assert_eq!(cfg.supervisor.timeout, None);
        assert_eq!(
            cfg.exclusions.part_names().collect::<Vec<_>>(),
            vec![".git", "__pycache__"]
        );
    }

    #[test]
    fn missing_command_is_a_config_error() {
        let raw = raw_with_cmd("  ");
        let err = validate_config(raw, &fs()).unwrap_err();
        assert!(matches!(err, WatchrunError::ConfigError(_)));
    }

    #[test]
    fn bad_env_key_is_rejected() {
        let mut raw = raw_with_cmd("make");
        raw.run.env.insert("A=B".to_string(), "x".to_string());
        assert!(validate_config(raw, &fs()).is_err());
    }

    #[test]
    fn missing_root_is_unavailable() {
        let mut raw = raw_with_cmd("make");
        raw.watch.dir = Some(PathBuf::from("/nope"));
        let err = validate_config(raw, &fs()).unwrap_err();
        assert!(matches!(err, WatchrunError::RootUnavailable { .. }));
        assert!(err.is_setup_error());
    }

    #[test]
    fn bad_duration_names_the_field() {
        let mut raw = raw_with_cmd("make");
        raw.run.delay = Some(RawDuration::Text("soon".to_string()));
        let err = validate_config(raw, &fs()).unwrap_err();
        assert!(err.to_string().contains("[run].delay"));
    }

    #[test]
    fn command_runs_in_the_root_unless_cwd_is_set() {
        let cfg = validate_config(raw_with_cmd("make"), &fs()).unwrap();
        assert_eq!(cfg.command.working_dir, Some(PathBuf::from("/proj")));

        let fs = fs();
        fs.add_dir("/proj/app");
        let mut raw = raw_with_cmd("make");
        raw.run.cwd = Some(PathBuf::from("./app"));
        let cfg = validate_config(raw, &fs).unwrap();
        assert_eq!(cfg.command.working_dir, Some(PathBuf::from("/proj/app")));

        let mut raw = raw_with_cmd("make");
        raw.run.cwd = Some(PathBuf::from("missing"));
        let err = validate_config(raw, &fs).unwrap_err();
        assert!(matches!(err, WatchrunError::ConfigError(ref msg) if msg.contains("[run].cwd")));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let mut raw = raw_with_cmd("make");
        raw.run.timeout = Some(RawDuration::Millis(0));
        assert!(validate_config(raw, &fs()).is_err());
    }
}
