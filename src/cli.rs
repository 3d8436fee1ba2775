// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `watchrun`.
#[derive(Debug, Clone, Default, Parser)]
#[command(
    name = "watchrun",
    version,
    about = "Watch a directory tree and rerun a command when files change.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to a config file (TOML).
    ///
    /// Default: `Watchrun.toml` in the current working directory, if it
    /// exists.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Root directory to watch (default: current directory).
    #[arg(long, value_name = "PATH")]
    pub dir: Option<PathBuf>,

    /// Quiet period after the last change before the command runs
    /// (e.g. `100ms`, `1s`; a bare number is milliseconds). Default: 100ms.
    #[arg(long, value_name = "DURATION")]
    pub delay: Option<String>,

    /// Ignore changes for this long after each run starts. Default: 0ms.
    #[arg(long, value_name = "DURATION")]
    pub ignore_window: Option<String>,

    /// Stop a run that is still alive after this long.
    #[arg(long, value_name = "DURATION")]
    pub timeout: Option<String>,

    /// Time between interrupt and kill when stopping a run. Default: 2s.
    #[arg(long, value_name = "DURATION")]
    pub grace: Option<String>,

    /// Path segment names to ignore at any depth (repeatable,
    /// comma-separated). Added to `.git` and `__pycache__`.
    #[arg(long, value_name = "NAME", value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// Root-relative path prefixes to ignore (repeatable).
    #[arg(long = "exclude-path", value_name = "PREFIX")]
    pub exclude_paths: Vec<String>,

    /// Only changes to files matching one of these globs trigger a run
    /// (repeatable, comma-separated). Default: `*`.
    #[arg(long = "match", value_name = "GLOB", value_delimiter = ',')]
    pub match_patterns: Vec<String>,

    /// Environment override for the command (repeatable).
    #[arg(short = 'e', long = "env", value_name = "KEY=VALUE", value_parser = parse_env_pair)]
    pub env: Vec<(String, String)>,

    /// Verbose logging (debug level).
    #[arg(short, long)]
    pub verbose: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `--verbose`, `WATCHRUN_LOG` or a default level will be
    /// used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the resolved configuration, but don't watch
    /// or run anything.
    #[arg(long)]
    pub dry_run: bool,

    /// The command to run, followed by its arguments.
    #[arg(
        value_name = "COMMAND",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub command: Vec<String>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

fn parse_env_pair(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))?;
    if key.is_empty() {
        return Err(format!("empty variable name in '{s}'"));
    }
    Ok((key.to_string(), value.to_string()))
}
