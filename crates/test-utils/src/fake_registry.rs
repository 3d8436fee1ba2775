use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use watchrun::watch::WatchRegistry;

/// A watch registry that records registrations instead of talking to the
/// OS. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct FakeRegistry {
    registered: Arc<Mutex<Vec<PathBuf>>>,
    failing: Arc<Mutex<HashSet<PathBuf>>>,
}

impl FakeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make registering `dir` fail.
    pub fn fail_on(&self, dir: impl Into<PathBuf>) {
        self.failing.lock().unwrap().insert(dir.into());
    }

    /// Directories registered so far, in registration order.
    pub fn registered(&self) -> Vec<PathBuf> {
        self.registered.lock().unwrap().clone()
    }

    pub fn contains(&self, dir: impl AsRef<Path>) -> bool {
        self.registered
            .lock()
            .unwrap()
            .iter()
            .any(|d| d == dir.as_ref())
    }
}

impl WatchRegistry for FakeRegistry {
    fn register(&mut self, dir: &Path) -> Result<()> {
        if self.failing.lock().unwrap().contains(dir) {
            bail!("fake registration failure for {}", dir.display());
        }
        self.registered.lock().unwrap().push(dir.to_path_buf());
        Ok(())
    }
}
