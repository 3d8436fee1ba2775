// src/lib.rs

pub mod cli;
pub mod config;
pub mod debounce;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod types;
pub mod watch;

pub use crate::config::WatchConfig;

use std::sync::Arc;

use anyhow::anyhow;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{format_duration, resolve_cli_config};
use crate::engine::{CoreRuntime, Runtime, RuntimeChannels, RuntimeEvent};
use crate::errors::{Result, WatchrunError};
use crate::exec::{resolve_program, OsProcessLauncher, ProcessLauncher, ProcessSupervisor};
use crate::fs::{FileSystem, RealFileSystem};
use crate::types::RawEvent;
use crate::watch::{open_event_source, DirectoryTracker, WatchRegistry};

/// Capacity of the runtime event channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// The pluggable parts of a session.
///
/// [`start_session`] uses the real process launcher, the `notify` backend
/// and the real filesystem; tests swap in fakes via
/// [`start_session_with`].
pub struct SessionBackends<L: ProcessLauncher, R: WatchRegistry> {
    pub launcher: L,
    pub registry: R,
    pub events: mpsc::UnboundedReceiver<RawEvent>,
    pub fs: Arc<dyn FileSystem>,
}

/// A running watch session.
#[derive(Debug)]
pub struct Session {
    shutdown: ShutdownHandle,
    join: JoinHandle<Result<()>>,
}

/// Cloneable way to ask a [`Session`] to shut down.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: mpsc::Sender<RuntimeEvent>,
}

impl ShutdownHandle {
    pub async fn request(&self) {
        if self.tx.send(RuntimeEvent::ShutdownRequested).await.is_err() {
            debug!("shutdown requested after the runtime already ended");
        }
    }
}

impl Session {
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Stop the current run, stop watching, and wait for the runtime to
    /// finish.
    pub async fn stop(self) -> Result<()> {
        self.shutdown.request().await;
        self.wait().await
    }

    /// Wait for the runtime to end. It only ends on its own on a fatal
    /// error.
    pub async fn wait(self) -> Result<()> {
        match self.join.await {
            Ok(result) => result,
            Err(err) => Err(WatchrunError::Other(anyhow!("runtime task failed: {err}"))),
        }
    }
}

/// Start watching `config.root` and running `config.command`.
///
/// Fails if the command cannot be found, the root cannot be enumerated or
/// the notification backend cannot be opened. Must be called from within
/// a Tokio runtime.
pub fn start_session(config: WatchConfig) -> Result<Session> {
    let program = resolve_program(&config.command.program)?;
    debug!(program = ?program, "resolved command");

    let (registry, events) = open_event_source()?;
    start_session_with(
        config,
        SessionBackends {
            launcher: OsProcessLauncher,
            registry,
            events,
            fs: Arc::new(RealFileSystem),
        },
    )
}

/// [`start_session`] with explicit backends. Does not resolve the command.
pub fn start_session_with<L, R>(config: WatchConfig, backends: SessionBackends<L, R>) -> Result<Session>
where
    L: ProcessLauncher + 'static,
    R: WatchRegistry + 'static,
{
    let mut tracker = DirectoryTracker::new(config.root.clone(), backends.registry)
        .with_exclusions(config.exclusions.clone());
    tracker.register_initial(backends.fs.as_ref())?;

    let (event_tx, event_rx) = mpsc::channel::<RuntimeEvent>(EVENT_CHANNEL_CAPACITY);
    let supervisor = ProcessSupervisor::new(backends.launcher, config.supervisor, event_tx.clone());
    let core = CoreRuntime::new(&config.root, config.exclusions, config.matches);

    let runtime = Runtime::new(
        core,
        tracker,
        supervisor,
        config.command,
        backends.fs,
        config.debounce,
        RuntimeChannels {
            raw_rx: backends.events,
            event_tx: event_tx.clone(),
            event_rx,
        },
    );

    let join = tokio::spawn(runtime.run());
    Ok(Session {
        shutdown: ShutdownHandle { tx: event_tx },
        join,
    })
}

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (file + flags)
/// - the session
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config = resolve_cli_config(&args)?;

    if args.dry_run {
        print_dry_run(&config);
        return Ok(());
    }

    let session = start_session(config)?;

    // Ctrl-C → graceful shutdown.
    let shutdown = session.shutdown_handle();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            return;
        }
        info!("interrupt received; shutting down");
        shutdown.request().await;
    });

    session.wait().await
}

/// Simple dry-run output: print the resolved configuration.
fn print_dry_run(cfg: &WatchConfig) {
    println!("watchrun dry-run");
    println!("  root: {}", cfg.root.display());
    println!("  command: {}", cfg.command);
    if let Some(dir) = &cfg.command.working_dir {
        println!("  cwd: {}", dir.display());
    }
    for (key, value) in &cfg.command.env {
        println!("    env {key}={value}");
    }
    println!("  delay: {}", format_duration(cfg.debounce.settle_delay));
    println!("  ignore_window: {}", format_duration(cfg.debounce.ignore_window));
    println!("  grace: {}", format_duration(cfg.supervisor.grace_period));
    if let Some(timeout) = cfg.supervisor.timeout {
        println!("  timeout: {}", format_duration(timeout));
    }
    println!(
        "  exclude: {:?}",
        cfg.exclusions.part_names().collect::<Vec<_>>()
    );
    let prefixes: Vec<_> = cfg.exclusions.subpath_prefixes().collect();
    if !prefixes.is_empty() {
        println!("  exclude_paths: {prefixes:?}");
    }
    if !cfg.matches.patterns().is_empty() {
        println!("  match: {:?}", cfg.matches.patterns());
    }

    debug!("dry-run complete (no execution)");
}
