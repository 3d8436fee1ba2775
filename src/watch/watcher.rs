// src/watch/watcher.rs

use std::path::Path;

use anyhow::Result;
use notify::event::{ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{trace, warn};

use crate::types::{Operation, RawEvent};
use crate::watch::tracker::WatchRegistry;

/// Handle for the filesystem watcher.
///
/// Directories are registered one at a time (non-recursively) through the
/// [`WatchRegistry`] impl. Dropping this handle stops file watching and
/// closes the event channel returned by [`open_event_source`].
pub struct NotifyRegistry {
    inner: RecommendedWatcher,
}

impl std::fmt::Debug for NotifyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifyRegistry").finish()
    }
}

impl WatchRegistry for NotifyRegistry {
    fn register(&mut self, dir: &Path) -> Result<()> {
        self.inner.watch(dir, RecursiveMode::NonRecursive)?;
        Ok(())
    }
}

/// Open the `notify` backend.
///
/// Returns the registry used to add directories and the stream of
/// [`RawEvent`]s. Nothing is watched until a directory is registered.
pub fn open_event_source() -> crate::errors::Result<(NotifyRegistry, mpsc::UnboundedReceiver<RawEvent>)> {
    // Channel from the blocking notify callback into the async world.
    let (event_tx, event_rx) = mpsc::unbounded_channel::<RawEvent>();

    // Closure called synchronously by notify whenever an event arrives.
    let watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                trace!(?event, "received notify event");
                for raw in raw_events_from(&event) {
                    if event_tx.send(raw).is_err() {
                        // Receiver gone; the session is shutting down.
                        return;
                    }
                }
            }
            Err(err) => {
                warn!(error = %err, "file watch error");
            }
        },
        Config::default(),
    )?;

    Ok((NotifyRegistry { inner: watcher }, event_rx))
}

/// Map a `notify` event kind onto an [`Operation`].
///
/// Access events carry no change and map to `None`.
pub fn operation_of(kind: &EventKind) -> Option<Operation> {
    match kind {
        EventKind::Create(_) => Some(Operation::Create),
        EventKind::Modify(ModifyKind::Metadata(_)) => Some(Operation::Chmod),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => Some(Operation::Create),
        EventKind::Modify(ModifyKind::Name(_)) => Some(Operation::Rename),
        EventKind::Modify(_) => Some(Operation::Write),
        EventKind::Remove(_) => Some(Operation::Remove),
        EventKind::Any => Some(Operation::Write),
        EventKind::Access(_) | EventKind::Other => None,
    }
}

/// Split a `notify` event into one [`RawEvent`] per path.
///
/// For a rename reported with both paths, the old path is a `Rename` and
/// the new one a `Create`: something appeared there.
pub fn raw_events_from(event: &Event) -> Vec<RawEvent> {
    if let EventKind::Modify(ModifyKind::Name(RenameMode::Both)) = event.kind {
        return event
            .paths
            .iter()
            .enumerate()
            .map(|(i, path)| {
                let op = if i == 0 { Operation::Rename } else { Operation::Create };
                RawEvent::new(path.clone(), op)
            })
            .collect();
    }

    match operation_of(&event.kind) {
        Some(op) => event
            .paths
            .iter()
            .map(|path| RawEvent::new(path.clone(), op))
            .collect(),
        None => Vec::new(),
    }
}
