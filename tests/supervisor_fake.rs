// tests/supervisor_fake.rs

mod common;
use crate::common::{init_tracing, FakeLauncher, TestResult};

use tokio::sync::mpsc;
use tokio::time::{timeout, Duration, Instant};

use watchrun::engine::RuntimeEvent;
use watchrun::errors::ProcessError;
use watchrun::exec::{
    CommandSpec, ExitOutcome, ProcessHandle, ProcessSupervisor, RunState, SupervisorOptions,
};

fn supervisor(
    launcher: FakeLauncher,
    options: SupervisorOptions,
) -> (ProcessSupervisor<FakeLauncher>, mpsc::Receiver<RuntimeEvent>) {
    let (tx, rx) = mpsc::channel(16);
    (ProcessSupervisor::new(launcher, options, tx), rx)
}

fn grace(ms: u64) -> SupervisorOptions {
    SupervisorOptions {
        grace_period: Duration::from_millis(ms),
        timeout: None,
    }
}

async fn next_stop(rx: &mut mpsc::Receiver<RuntimeEvent>) -> (u64, ExitOutcome) {
    match timeout(Duration::from_secs(10), rx.recv()).await {
        Ok(Some(RuntimeEvent::ProcessStopped { run_id, outcome })) => (run_id, outcome),
        other => panic!("expected ProcessStopped, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn natural_exit_is_reported_with_its_code() -> TestResult {
    init_tracing();

    let launcher = FakeLauncher::new();
    let (mut sup, mut rx) = supervisor(launcher.clone(), SupervisorOptions::default());

    let handle = sup.start(&CommandSpec::new("build").arg("--all"))?;
    assert_eq!(handle.state(), RunState::Running);
    assert_eq!(handle.pid(), Some(1000));
    assert!(matches!(sup.exit_code(&handle), Err(ProcessError::NotDoneYet)));
    assert_eq!(launcher.specs()[0].to_string(), "build --all");

    launcher.group(0).finish(3);
    let (run_id, outcome) = next_stop(&mut rx).await;

    let expected = ExitOutcome {
        code: 3,
        killed_by_signal: false,
        timed_out: false,
    };
    assert_eq!(run_id, handle.run_id());
    assert_eq!(outcome, expected);
    assert_eq!(sup.exit_code(&handle)?, expected);
    assert_eq!(handle.state(), RunState::Stopped);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn second_start_while_running_is_refused() -> TestResult {
    let launcher = FakeLauncher::new();
    let (mut sup, _rx) = supervisor(launcher.clone(), SupervisorOptions::default());

    sup.start(&CommandSpec::new("serve"))?;
    let err = sup.start(&CommandSpec::new("serve")).unwrap_err();
    assert!(matches!(err, ProcessError::AlreadyRunning(Some(1000))));
    assert_eq!(launcher.launch_count(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn stop_interrupts_the_group_and_marks_it_killed() -> TestResult {
    let launcher = FakeLauncher::new();
    let (mut sup, mut rx) = supervisor(launcher.clone(), grace(500));

    let handle = sup.start(&CommandSpec::new("serve"))?;
    sup.stop(&handle).await?;

    let group = launcher.group(0);
    assert_eq!(group.interrupts(), 1);
    // Whatever is left of the group after the leader exits is killed too.
    assert_eq!(group.kills(), 1);
    assert_eq!(handle.state(), RunState::Stopped);

    let outcome = sup.exit_code(&handle)?;
    assert!(outcome.killed_by_signal);
    assert!(!outcome.timed_out);
    assert_eq!(outcome.code, 130);

    let (_, reported) = next_stop(&mut rx).await;
    assert_eq!(reported, outcome);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn stubborn_process_is_killed_after_grace_period() -> TestResult {
    let launcher = FakeLauncher::stubborn();
    let (mut sup, _rx) = supervisor(launcher.clone(), grace(200));

    let handle = sup.start(&CommandSpec::new("serve"))?;
    let start = Instant::now();
    sup.stop(&handle).await?;

    let group = launcher.group(0);
    assert_eq!(group.interrupts(), 1);
    assert_eq!(group.kills(), 1);
    assert!(start.elapsed() >= Duration::from_millis(200));

    let outcome = sup.exit_code(&handle)?;
    assert!(outcome.killed_by_signal);
    assert_eq!(outcome.code, 137);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn stopping_a_handle_that_never_ran_is_a_noop() -> TestResult {
    let (sup, _rx) = supervisor(FakeLauncher::new(), SupervisorOptions::default());

    let handle = ProcessHandle::new(42);
    sup.stop(&handle).await?;
    assert_eq!(handle.state(), RunState::NotStarted);
    assert!(matches!(handle.exit_code(), Err(ProcessError::NotDoneYet)));

    // Nothing current either.
    sup.stop_current().await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn stopping_twice_is_harmless() -> TestResult {
    let launcher = FakeLauncher::new();
    let (mut sup, _rx) = supervisor(launcher.clone(), grace(100));

    let handle = sup.start(&CommandSpec::new("serve"))?;
    sup.stop(&handle).await?;
    sup.stop(&handle).await?;
    assert_eq!(launcher.group(0).interrupts(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn restart_stops_the_previous_run_first() -> TestResult {
    let launcher = FakeLauncher::new();
    let (mut sup, _rx) = supervisor(launcher.clone(), grace(100));

    let first = sup.start(&CommandSpec::new("serve"))?;
    let second = sup.restart(&CommandSpec::new("serve")).await?;

    assert_eq!(first.state(), RunState::Stopped);
    assert_eq!(launcher.group(0).interrupts(), 1);
    assert_eq!(launcher.launch_count(), 2);
    assert_ne!(first.run_id(), second.run_id());
    assert_eq!(sup.current().map(|h| h.run_id()), Some(second.run_id()));
    assert_eq!(second.state(), RunState::Running);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn natural_nonzero_exit_is_not_a_kill() -> TestResult {
    let launcher = FakeLauncher::new();
    let (mut sup, mut rx) = supervisor(launcher.clone(), SupervisorOptions::default());

    let handle = sup.start(&CommandSpec::new("test"))?;
    launcher.group(0).finish(1);
    next_stop(&mut rx).await;

    // Stopping after the fact changes nothing.
    sup.stop(&handle).await?;
    let outcome = sup.exit_code(&handle)?;
    assert_eq!(outcome.code, 1);
    assert!(!outcome.killed_by_signal);
    assert_eq!(launcher.group(0).interrupts(), 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn spawn_failure_leaves_nothing_running() -> TestResult {
    let (mut sup, _rx) = supervisor(FakeLauncher::failing(), SupervisorOptions::default());

    let err = sup.start(&CommandSpec::new("nope")).unwrap_err();
    assert!(matches!(err, ProcessError::SpawnFailure { ref program, .. } if program == "nope"));
    assert!(sup.current().is_none());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn timeout_stops_the_run_and_flags_it() -> TestResult {
    let launcher = FakeLauncher::new();
    let options = SupervisorOptions {
        grace_period: Duration::from_millis(100),
        timeout: Some(Duration::from_millis(300)),
    };
    let (mut sup, mut rx) = supervisor(launcher.clone(), options);

    let start = Instant::now();
    let handle = sup.start(&CommandSpec::new("slow"))?;
    let (_, outcome) = next_stop(&mut rx).await;

    assert!(start.elapsed() >= Duration::from_millis(300));
    assert!(outcome.timed_out);
    assert!(outcome.killed_by_signal);
    assert_eq!(launcher.group(0).interrupts(), 1);
    assert_eq!(sup.exit_code(&handle)?, outcome);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn finishing_before_the_timeout_is_not_a_timeout() -> TestResult {
    let launcher = FakeLauncher::new();
    let options = SupervisorOptions {
        grace_period: Duration::from_millis(100),
        timeout: Some(Duration::from_millis(300)),
    };
    let (mut sup, mut rx) = supervisor(launcher.clone(), options);

    sup.start(&CommandSpec::new("quick"))?;
    launcher.group(0).finish(0);
    let (_, outcome) = next_stop(&mut rx).await;
    assert!(!outcome.timed_out);
    assert!(outcome.success());

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(launcher.group(0).interrupts(), 0);
    Ok(())
}
