// src/debounce/mod.rs

//! Coalescing of trigger bursts into single runs.
//!
//! The pure state machine lives in [`state`]; this module wraps it in a
//! single Tokio task that merges "a trigger arrived" and "the settle
//! deadline elapsed" in one `select!`, so the two can never race.

pub mod clock;
pub mod state;

use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::engine::RuntimeEvent;
use crate::exec::ExitOutcome;

pub use clock::{Clock, Sleep, TokioClock};
pub use state::{DebounceSettings, DebounceState, Fire, TriggerDecision};

/// Lower bound on how long the loop sleeps between wakeups.
pub const MIN_TICK: Duration = Duration::from_millis(1);

/// Upper bound used while nothing is pending; any input wakes the loop
/// earlier anyway.
const IDLE_TICK: Duration = Duration::from_secs(3600);

/// Inputs accepted by the debounce loop.
#[derive(Debug, Clone)]
pub enum DebounceInput {
    /// A classified content change.
    Trigger(PathBuf),
    /// The current command exited or was stopped.
    Stopped(ExitOutcome),
}

/// The debounce control loop. Sole owner of its [`DebounceState`].
#[derive(Debug)]
pub struct Debouncer<C: Clock> {
    state: DebounceState,
    clock: C,
    input_rx: mpsc::UnboundedReceiver<DebounceInput>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
}

impl<C: Clock> Debouncer<C> {
    pub fn new(
        settings: DebounceSettings,
        clock: C,
        input_rx: mpsc::UnboundedReceiver<DebounceInput>,
        runtime_tx: mpsc::Sender<RuntimeEvent>,
    ) -> Self {
        Self {
            state: DebounceState::new(settings),
            clock,
            input_rx,
            runtime_tx,
        }
    }

    /// Count the initial, unconditional run as a fire.
    pub fn mark_initial_run(&mut self) {
        let now = self.clock.now();
        self.state.mark_fired(now);
    }

    /// Run until the input channel closes or the runtime goes away.
    pub async fn run(mut self) {
        debug!(settings = ?self.state.settings(), "debounce loop started");

        loop {
            let now = self.clock.now();
            let deadline = self.state.deadline();
            let wake = match deadline {
                Some(d) => d.max(now + MIN_TICK),
                None => now + IDLE_TICK,
            };

            tokio::select! {
                biased;

                input = self.input_rx.recv() => match input {
                    Some(input) => self.handle_input(input),
                    None => break,
                },

                _ = self.clock.sleep_until(wake), if deadline.is_some() => {
                    let now = self.clock.now();
                    if let Some(fire) = self.state.poll(now) {
                        info!(path = ?fire.path, "change settled; running command");
                        if self.runtime_tx.send(RuntimeEvent::Fire { path: fire.path }).await.is_err() {
                            break;
                        }
                    }
                }
            }
        }

        debug!("debounce loop finished");
    }

    fn handle_input(&mut self, input: DebounceInput) {
        let now: Instant = self.clock.now();
        match input {
            DebounceInput::Trigger(path) => {
                match self.state.on_trigger(path.clone(), now) {
                    TriggerDecision::Accepted => {
                        debug!(path = ?path, running = self.state.is_running(), "trigger accepted");
                    }
                    TriggerDecision::Suppressed => {
                        debug!(path = ?path, "trigger inside ignore window; discarded");
                    }
                }
            }
            DebounceInput::Stopped(outcome) => {
                debug!(?outcome, "debouncer saw command stop");
                self.state.on_stopped();
            }
        }
    }
}

/// Spawn the debounce loop, returning its input sender.
///
/// `initial_run` marks a run as having just happened, so the ignore window
/// covers the startup run too.
pub fn spawn_debouncer<C: Clock + 'static>(
    settings: DebounceSettings,
    clock: C,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    initial_run: bool,
) -> (mpsc::UnboundedSender<DebounceInput>, JoinHandle<()>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let mut debouncer = Debouncer::new(settings, clock, rx, runtime_tx);
    if initial_run {
        debouncer.mark_initial_run();
    }
    let handle = tokio::spawn(debouncer.run());
    (tx, handle)
}
