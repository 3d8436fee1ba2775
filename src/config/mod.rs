// src/config/mod.rs

//! Configuration loading and validation for watchrun.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Layer command-line flags on top (`overrides.rs`).
//! - Validate and resolve into a [`WatchConfig`] (`validate.rs`).

pub mod duration;
pub mod loader;
pub mod model;
pub mod overrides;
pub mod validate;

pub use duration::{format_duration, parse_duration, RawDuration};
pub use loader::{default_config_path, load_and_validate, load_from_path, resolve_cli_config};
pub use model::{RawConfigFile, RunSection, WatchConfig, WatchSection};
pub use validate::validate_config;
