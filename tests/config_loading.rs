// tests/config_loading.rs

mod common;
use crate::common::TestResult;

use std::fs;
use std::time::Duration;

use watchrun::config::{load_and_validate, load_from_path, RawDuration};
use watchrun::errors::WatchrunError;

#[test]
fn full_config_file_resolves() -> TestResult {
    let tmp = tempfile::tempdir()?;
    let project = tmp.path().join("project");
    fs::create_dir_all(&project)?;

    let path = tmp.path().join("Watchrun.toml");
    fs::write(
        &path,
        r#"
[watch]
dir = "project"
exclude = [".git", "dist"]
exclude_paths = ["bin"]
match = ["*.rs", "Cargo.toml"]

[run]
cmd = "cargo"
args = ["test", "--quiet"]
env = { RUST_BACKTRACE = "1" }
delay = "250ms"
ignore_window = 500
timeout = "5m"
grace = "3s"
"#,
    )?;

    let config = load_and_validate(&path)?;

    assert_eq!(config.root, project.canonicalize()?);
    assert_eq!(config.command.to_string(), "cargo test --quiet");
    assert_eq!(config.command.working_dir.as_deref(), Some(config.root.as_path()));
    assert_eq!(config.command.env.get("RUST_BACKTRACE").map(String::as_str), Some("1"));
    assert_eq!(
        config.exclusions.part_names().collect::<Vec<_>>(),
        vec![".git", "dist"]
    );
    assert_eq!(config.exclusions.subpath_prefixes().collect::<Vec<_>>(), vec!["bin"]);
    assert!(config.matches.matches("main.rs"));
    assert!(!config.matches.matches("README.md"));

    assert_eq!(config.debounce.settle_delay, Duration::from_millis(250));
    assert_eq!(config.debounce.ignore_window, Duration::from_millis(500));
    assert_eq!(config.supervisor.timeout, Some(Duration::from_secs(300)));
    assert_eq!(config.supervisor.grace_period, Duration::from_secs(3));
    Ok(())
}

#[test]
fn relative_dir_is_anchored_at_the_config_file() -> TestResult {
    let tmp = tempfile::tempdir()?;
    fs::create_dir_all(tmp.path().join("nested/src"))?;
    let path = tmp.path().join("nested/Watchrun.toml");
    fs::write(&path, "[watch]\ndir = \"src\"\n[run]\ncmd = \"true\"\n")?;

    let raw = load_from_path(&path)?;
    assert_eq!(raw.watch.dir, Some(tmp.path().join("nested/src")));
    Ok(())
}

#[test]
fn minimal_file_uses_defaults() -> TestResult {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("Watchrun.toml");
    fs::write(
        &path,
        format!("[watch]\ndir = {:?}\n[run]\ncmd = \"make\"\n", tmp.path().display().to_string()),
    )?;

    let config = load_and_validate(&path)?;
    assert_eq!(
        config.exclusions.part_names().collect::<Vec<_>>(),
        vec![".git", "__pycache__"]
    );
    assert!(config.matches.patterns().is_empty());
    assert_eq!(config.debounce.ignore_window, Duration::ZERO);
    assert_eq!(config.supervisor.timeout, None);
    Ok(())
}

#[test]
fn cwd_is_resolved_against_the_root() -> TestResult {
    let tmp = tempfile::tempdir()?;
    let root = tmp.path().canonicalize()?;
    fs::create_dir_all(root.join("app"))?;
    let path = root.join("Watchrun.toml");
    fs::write(&path, "[watch]\ndir = \".\"\n[run]\ncmd = \"make\"\ncwd = \"app\"\n")?;

    let config = load_and_validate(&path)?;
    assert_eq!(config.root, root);
    assert_eq!(config.command.working_dir, Some(root.join("app")));
    Ok(())
}

#[test]
fn integer_durations_are_milliseconds() -> TestResult {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("Watchrun.toml");
    fs::write(&path, "[run]\ncmd = \"make\"\ndelay = 75\n")?;

    let raw = load_from_path(&path)?;
    assert!(matches!(raw.run.delay, Some(RawDuration::Millis(75))));
    Ok(())
}

#[test]
fn unknown_field_is_a_setup_error() -> TestResult {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("Watchrun.toml");
    fs::write(&path, "[run]\ncmd = \"make\"\nretries = 3\n")?;

    let err = load_from_path(&path).unwrap_err();
    assert!(matches!(err, WatchrunError::TomlError(_)));
    assert!(err.is_setup_error());
    assert_eq!(err.exit_code(), 2);
    Ok(())
}

#[test]
fn missing_file_is_a_config_error() -> TestResult {
    let tmp = tempfile::tempdir()?;
    let err = load_from_path(tmp.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, WatchrunError::ConfigError(ref msg) if msg.contains("absent.toml")));
    Ok(())
}

#[test]
fn bad_duration_names_the_field() -> TestResult {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("Watchrun.toml");
    fs::write(
        &path,
        format!(
            "[watch]\ndir = {:?}\n[run]\ncmd = \"make\"\ngrace = \"soon\"\n",
            tmp.path().display().to_string()
        ),
    )?;

    let err = load_and_validate(&path).unwrap_err();
    assert!(matches!(err, WatchrunError::ConfigError(ref msg) if msg.contains("grace")));
    Ok(())
}

#[test]
fn missing_root_directory_is_reported() -> TestResult {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("Watchrun.toml");
    fs::write(&path, "[watch]\ndir = \"gone\"\n[run]\ncmd = \"make\"\n")?;

    let err = load_and_validate(&path).unwrap_err();
    assert!(matches!(err, WatchrunError::RootUnavailable { .. }));
    assert_eq!(err.exit_code(), 2);
    Ok(())
}
