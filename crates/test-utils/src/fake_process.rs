use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::oneshot;
use watchrun::exec::{
    CommandSpec, ExitStatusInfo, LaunchedProcess, ProcessLauncher, TerminatableProcessGroup,
};

const SIGINT: i32 = 2;
const SIGKILL: i32 = 9;

/// A fake process group.
///
/// Its process "exits" when the test calls [`FakeGroup::finish`], or when
/// it is interrupted (unless stubborn) or killed.
#[derive(Debug)]
pub struct FakeGroup {
    pid: u32,
    stubborn: bool,
    interrupts: AtomicUsize,
    kills: AtomicUsize,
    exit_tx: Mutex<Option<oneshot::Sender<ExitStatusInfo>>>,
}

impl FakeGroup {
    fn new(pid: u32, stubborn: bool) -> (Arc<Self>, oneshot::Receiver<ExitStatusInfo>) {
        let (tx, rx) = oneshot::channel();
        let group = Arc::new(Self {
            pid,
            stubborn,
            interrupts: AtomicUsize::new(0),
            kills: AtomicUsize::new(0),
            exit_tx: Mutex::new(Some(tx)),
        });
        (group, rx)
    }

    /// Let the process exit on its own with `code`.
    pub fn finish(&self, code: i32) {
        self.exit(ExitStatusInfo::exited(code));
    }

    pub fn interrupts(&self) -> usize {
        self.interrupts.load(Ordering::SeqCst)
    }

    pub fn kills(&self) -> usize {
        self.kills.load(Ordering::SeqCst)
    }

    pub fn has_exited(&self) -> bool {
        self.exit_tx.lock().unwrap().is_none()
    }

    fn exit(&self, status: ExitStatusInfo) {
        if let Some(tx) = self.exit_tx.lock().unwrap().take() {
            let _ = tx.send(status);
        }
    }
}

impl TerminatableProcessGroup for FakeGroup {
    fn pid(&self) -> Option<u32> {
        Some(self.pid)
    }

    fn interrupt(&self) -> io::Result<()> {
        self.interrupts.fetch_add(1, Ordering::SeqCst);
        if !self.stubborn {
            self.exit(ExitStatusInfo::signalled(SIGINT));
        }
        Ok(())
    }

    fn kill(&self) -> io::Result<()> {
        self.kills.fetch_add(1, Ordering::SeqCst);
        self.exit(ExitStatusInfo::signalled(SIGKILL));
        Ok(())
    }
}

#[derive(Debug, Default)]
struct LauncherState {
    launches: Vec<(CommandSpec, Arc<FakeGroup>)>,
    fail_spawn: bool,
    stubborn: bool,
}

/// A fake launcher that:
/// - records every launched command
/// - hands out [`FakeGroup`]s the test can finish, inspect or leave hanging.
///
/// Clones share state, so a test can keep one clone while the supervisor
/// owns another.
#[derive(Debug, Clone, Default)]
pub struct FakeLauncher {
    state: Arc<Mutex<LauncherState>>,
}

impl FakeLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every launch fails as if the program did not exist.
    pub fn failing() -> Self {
        let launcher = Self::default();
        launcher.lock().fail_spawn = true;
        launcher
    }

    /// Launched processes ignore interrupts and only die when killed.
    pub fn stubborn() -> Self {
        let launcher = Self::default();
        launcher.lock().stubborn = true;
        launcher
    }

    pub fn launch_count(&self) -> usize {
        self.lock().launches.len()
    }

    /// Group of the `index`-th launch.
    pub fn group(&self, index: usize) -> Arc<FakeGroup> {
        Arc::clone(&self.lock().launches[index].1)
    }

    pub fn specs(&self) -> Vec<CommandSpec> {
        self.lock().launches.iter().map(|(s, _)| s.clone()).collect()
    }

    fn lock(&self) -> MutexGuard<'_, LauncherState> {
        self.state.lock().unwrap()
    }
}

impl ProcessLauncher for FakeLauncher {
    fn launch(&self, spec: &CommandSpec) -> io::Result<LaunchedProcess> {
        let mut state = self.lock();
        if state.fail_spawn {
            return Err(io::Error::new(io::ErrorKind::NotFound, "fake spawn failure"));
        }

        let pid = 1000 + state.launches.len() as u32;
        let (group, rx) = FakeGroup::new(pid, state.stubborn);
        state.launches.push((spec.clone(), Arc::clone(&group)));

        Ok(LaunchedProcess {
            group,
            exit: Box::pin(async move {
                rx.await
                    .map_err(|_| io::Error::other("fake process dropped without exiting"))
            }),
        })
    }
}
