// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::cli::CliArgs;
use crate::config::model::{RawConfigFile, WatchConfig};
use crate::errors::{Result, WatchrunError};

/// Load a configuration file from a given path and return the raw
/// `RawConfigFile`.
///
/// This only performs TOML deserialization, plus anchoring a relative
/// `[watch].dir` at the file's directory. Use [`load_and_validate`] for
/// semantic checks.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| {
        WatchrunError::ConfigError(format!("cannot read config file {}: {e}", path.display()))
    })?;

    let mut config: RawConfigFile = toml::from_str(&contents)?;

    if let Some(dir) = &config.watch.dir
        && dir.is_relative()
    {
        config.watch.dir = Some(config_dir(path).join(dir));
    }

    Ok(config)
}

/// Load a configuration file from path and validate it.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<WatchConfig> {
    let raw_config = load_from_path(&path)?;
    WatchConfig::try_from(raw_config)
}

/// Build the session config for a CLI invocation: the config file (explicit
/// `--config`, or `Watchrun.toml` if present), then the flags on top.
pub fn resolve_cli_config(args: &CliArgs) -> Result<WatchConfig> {
    let cwd = std::env::current_dir()?;

    let mut raw = match &args.config {
        Some(path) => load_from_path(path)?,
        None => {
            let default = cwd.join(default_config_path());
            if default.is_file() {
                debug!(path = ?default, "using default config file");
                load_from_path(&default)?
            } else {
                RawConfigFile::default()
            }
        }
    };

    raw.apply_cli(args, &cwd);
    WatchConfig::try_from(raw)
}

/// Name of the config file picked up from the working directory when
/// `--config` is not given.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Watchrun.toml")
}

/// Directory relative config paths are anchored at.
///
/// A bare file name like `Watchrun.toml` has an empty parent; that means
/// the current working directory.
fn config_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}
