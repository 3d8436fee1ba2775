// src/debounce/state.rs

//! Pure debounce state machine.
//!
//! Every method takes the current time explicitly, so the whole state
//! machine can be driven with synthetic instants in tests.

use std::path::PathBuf;
use std::time::Duration;

use tokio::time::Instant;

/// Timing knobs for the debouncer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceSettings {
    /// Silence required after the last trigger before a run is fired.
    pub settle_delay: Duration,
    /// Window after a fire during which triggers are discarded.
    pub ignore_window: Duration,
}

impl Default for DebounceSettings {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(100),
            ignore_window: Duration::ZERO,
        }
    }
}

/// What happened to a trigger handed to [`DebounceState::on_trigger`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerDecision {
    /// Recorded; the settle window (re)starts now.
    Accepted,
    /// Dropped because it arrived inside the ignore window.
    Suppressed,
}

/// A decision to (re)run the command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fire {
    /// Path of the most recent trigger that led to this run.
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct DebounceState {
    settings: DebounceSettings,
    pending: bool,
    last_trigger_at: Option<Instant>,
    last_fired_at: Option<Instant>,
    last_path: Option<PathBuf>,
    running: bool,
}

impl DebounceState {
    pub fn new(settings: DebounceSettings) -> Self {
        Self {
            settings,
            pending: false,
            last_trigger_at: None,
            last_fired_at: None,
            last_path: None,
            running: false,
        }
    }

    pub fn settings(&self) -> DebounceSettings {
        self.settings
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn last_fired_at(&self) -> Option<Instant> {
        self.last_fired_at
    }

    /// Record a run that was started outside the debouncer (the initial
    /// run), so the ignore window applies to it as well.
    pub fn mark_fired(&mut self, now: Instant) {
        self.last_fired_at = Some(now);
        self.running = true;
    }

    pub fn on_trigger(&mut self, path: PathBuf, now: Instant) -> TriggerDecision {
        if self.in_ignore_window(now) {
            return TriggerDecision::Suppressed;
        }

        self.last_trigger_at = Some(now);
        self.last_path = Some(path);
        self.pending = true;
        TriggerDecision::Accepted
    }

    /// The command's process exited (or was stopped).
    pub fn on_stopped(&mut self) {
        self.running = false;
    }

    /// When the pending trigger becomes due, if any.
    pub fn deadline(&self) -> Option<Instant> {
        if !self.pending {
            return None;
        }
        self.last_trigger_at.map(|t| t + self.settings.settle_delay)
    }

    /// Fire if a trigger is pending and the settle delay has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<Fire> {
        let deadline = self.deadline()?;
        if now < deadline {
            return None;
        }

        self.pending = false;
        self.last_fired_at = Some(now);
        self.running = true;
        Some(Fire {
            path: self.last_path.take().unwrap_or_default(),
        })
    }

    fn in_ignore_window(&self, now: Instant) -> bool {
        match self.last_fired_at {
            Some(fired) => now.saturating_duration_since(fired) < self.settings.ignore_window,
            None => false,
        }
    }
}
