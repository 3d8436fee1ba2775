// src/engine/runtime.rs

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::debounce::{DebounceInput, DebounceSettings, Debouncer, TokioClock};
use crate::errors::{Result, WatchrunError};
use crate::exec::{CommandSpec, ProcessLauncher, ProcessSupervisor};
use crate::fs::FileSystem;
use crate::types::RawEvent;
use crate::watch::tracker::{DirectoryTracker, WatchRegistry};

use super::core::CoreRuntime;
use super::{CoreCommand, ExitReason, RestartReason, RuntimeEvent};

/// Channels the runtime reads from.
///
/// `event_tx` is the sending side of `event_rx`; the runtime hands clones
/// of it to the debouncer. The supervisor must have been built with a
/// clone of it too.
#[derive(Debug)]
pub struct RuntimeChannels {
    pub raw_rx: mpsc::UnboundedReceiver<RawEvent>,
    pub event_tx: mpsc::Sender<RuntimeEvent>,
    pub event_rx: mpsc::Receiver<RuntimeEvent>,
}

/// Drives the core in response to filesystem and runtime events, and
/// executes its commands against the watch set, the debouncer and the
/// process supervisor.
///
/// This is a pure IO shell around `CoreRuntime`, which contains all the
/// event semantics.
pub struct Runtime<L: ProcessLauncher, R: WatchRegistry> {
    core: CoreRuntime,
    tracker: DirectoryTracker<R>,
    supervisor: ProcessSupervisor<L>,
    command: CommandSpec,
    fs: Arc<dyn FileSystem>,
    debouncer: Option<Debouncer<TokioClock>>,
    debounce_tx: mpsc::UnboundedSender<DebounceInput>,
    raw_rx: mpsc::UnboundedReceiver<RawEvent>,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    source_open: bool,
}

impl<L: ProcessLauncher, R: WatchRegistry> fmt::Debug for Runtime<L, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .field("tracker", &self.tracker)
            .field("command", &self.command)
            .finish_non_exhaustive()
    }
}

impl<L: ProcessLauncher + 'static, R: WatchRegistry> Runtime<L, R> {
    pub fn new(
        core: CoreRuntime,
        tracker: DirectoryTracker<R>,
        supervisor: ProcessSupervisor<L>,
        command: CommandSpec,
        fs: Arc<dyn FileSystem>,
        debounce: DebounceSettings,
        channels: RuntimeChannels,
    ) -> Self {
        let (debounce_tx, debounce_rx) = mpsc::unbounded_channel();
        let debouncer = Debouncer::new(debounce, TokioClock, debounce_rx, channels.event_tx);

        Self {
            core,
            tracker,
            supervisor,
            command,
            fs,
            debouncer: Some(debouncer),
            debounce_tx,
            raw_rx: channels.raw_rx,
            event_rx: channels.event_rx,
            source_open: true,
        }
    }

    /// Main event loop.
    ///
    /// - Starts the command once, before any event is consumed.
    /// - Merges raw filesystem events and runtime events.
    /// - Feeds them into the core and executes the returned commands.
    ///
    /// Returns `Ok(())` after a requested shutdown and
    /// [`WatchrunError::SourceClosed`] if the event source went away.
    pub async fn run(mut self) -> Result<()> {
        info!(
            root = ?self.core.base(),
            watched = self.tracker.len(),
            command = %self.command,
            "watchrun runtime started"
        );

        let initial = self.core.initial_step();
        for command in initial.commands {
            self.execute_command(command).await;
        }

        let debounce_task = self.debouncer.take().map(|mut debouncer| {
            debouncer.mark_initial_run();
            tokio::spawn(debouncer.run())
        });

        loop {
            let event = tokio::select! {
                biased;

                event = self.event_rx.recv() => match event {
                    Some(event) => event,
                    None => {
                        info!("runtime event channel closed; shutting down");
                        RuntimeEvent::ShutdownRequested
                    }
                },

                raw = self.raw_rx.recv(), if self.source_open => match raw {
                    Some(raw) => RuntimeEvent::FileChanged(raw),
                    None => {
                        self.source_open = false;
                        RuntimeEvent::SourceClosed
                    }
                },
            };

            if let RuntimeEvent::ProcessStopped { run_id, .. } = &event
                && self.supervisor.current().map(|h| h.run_id()) != Some(*run_id)
            {
                debug!(run_id, "stop report from a superseded run; ignoring");
                continue;
            }

            debug!(?event, "runtime received event");

            let base = self.core.base().to_path_buf();
            let fs = Arc::clone(&self.fs);
            let step = self.core.step(event, |rel| fs.is_dir(&base.join(rel)));

            for command in step.commands {
                self.execute_command(command).await;
            }

            if !step.keep_running {
                info!("core requested exit; stopping runtime");
                break;
            }
        }

        // Closing the input channel ends the debounce loop.
        drop(self.debounce_tx);
        if let Some(task) = debounce_task
            && let Err(err) = task.await
        {
            warn!(error = %err, "debounce task ended abnormally");
        }

        match self.core.exit_reason() {
            Some(ExitReason::SourceClosed) => {
                error!("filesystem event source closed; exiting");
                Err(WatchrunError::SourceClosed)
            }
            _ => {
                info!("runtime exiting");
                Ok(())
            }
        }
    }

    /// Execute a single command from the core.
    ///
    /// Failures here only affect the command at hand; the session keeps
    /// running.
    async fn execute_command(&mut self, command: CoreCommand) {
        match command {
            CoreCommand::WatchDir(dir) => self.watch_new_dir(dir),
            CoreCommand::Debounce(path) => {
                if self.debounce_tx.send(DebounceInput::Trigger(path)).is_err() {
                    warn!("debounce loop is gone; dropping trigger");
                }
            }
            CoreCommand::Restart { reason } => {
                match &reason {
                    RestartReason::Initial => info!(command = %self.command, "initial run"),
                    RestartReason::Change(path) => {
                        info!(path = ?path, command = %self.command, "change detected; restarting")
                    }
                }
                if let Err(err) = self.supervisor.restart(&self.command).await {
                    error!(error = %err, "could not start command; still watching");
                }
            }
            CoreCommand::NotifyStopped(outcome) => {
                let _ = self.debounce_tx.send(DebounceInput::Stopped(outcome));
            }
            CoreCommand::StopCurrent => {
                if let Err(err) = self.supervisor.stop_current().await {
                    warn!(error = %err, "could not stop command cleanly");
                }
            }
        }
    }

    /// Register a directory that appeared after startup, together with
    /// anything already created below it.
    fn watch_new_dir(&mut self, dir: PathBuf) {
        match self.tracker.add_tree(self.fs.as_ref(), &dir) {
            Ok(report) if report.registered > 0 => {
                info!(dir = ?dir, registered = report.registered, "watching new directory")
            }
            Ok(_) => debug!(dir = ?dir, "nothing new to watch"),
            Err(err) => warn!(dir = ?dir, error = %err, "could not read new directory"),
        }
    }
}
