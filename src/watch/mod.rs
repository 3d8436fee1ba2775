// src/watch/mod.rs

//! File watching and change classification.
//!
//! This module is responsible for:
//! - Deciding what a raw filesystem event means ([`classify`]).
//! - Holding exclusion and match rules ([`patterns`]).
//! - Owning the set of watched directories ([`tracker`]).
//! - Wiring up a cross-platform filesystem watcher (`notify`) that feeds
//!   raw events into the engine ([`watcher`]).
//!
//! It does **not** know about debouncing or processes; it only turns
//! filesystem changes into [`crate::types::Action`]s.

pub mod classify;
pub mod path_utils;
pub mod patterns;
pub mod tracker;
pub mod watcher;

pub use classify::classify;
pub use patterns::{ExclusionRules, MatchRules, DEFAULT_EXCLUDED_PARTS};
pub use tracker::{enumerate_dirs, enumerate_dirs_where, DirectoryTracker, RegistrationReport, WatchRegistry};
pub use watcher::{open_event_source, NotifyRegistry};
