// tests/supervisor_os.rs
#![cfg(unix)]

mod common;
use crate::common::{init_tracing, TestResult};

use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};

use watchrun::engine::RuntimeEvent;
use watchrun::exec::{
    CommandSpec, ExitOutcome, OsProcessLauncher, ProcessSupervisor, RunState, SupervisorOptions,
};

const SIGKILL: i32 = 9;

fn sh(script: &str) -> CommandSpec {
    CommandSpec::new("sh").args(["-c", script])
}

fn supervisor(grace_ms: u64) -> (ProcessSupervisor<OsProcessLauncher>, mpsc::Receiver<RuntimeEvent>) {
    let (tx, rx) = mpsc::channel(16);
    let options = SupervisorOptions {
        grace_period: Duration::from_millis(grace_ms),
        timeout: None,
    };
    (ProcessSupervisor::new(OsProcessLauncher, options, tx), rx)
}

async fn next_outcome(rx: &mut mpsc::Receiver<RuntimeEvent>) -> ExitOutcome {
    match timeout(Duration::from_secs(10), rx.recv()).await {
        Ok(Some(RuntimeEvent::ProcessStopped { outcome, .. })) => outcome,
        other => panic!("expected ProcessStopped, got {other:?}"),
    }
}

#[tokio::test]
async fn exit_code_of_a_real_process() -> TestResult {
    init_tracing();

    let (mut sup, mut rx) = supervisor(1000);
    let handle = sup.start(&sh("exit 7"))?;
    let outcome = next_outcome(&mut rx).await;

    assert_eq!(
        outcome,
        ExitOutcome {
            code: 7,
            killed_by_signal: false,
            timed_out: false
        }
    );
    assert_eq!(sup.exit_code(&handle)?, outcome);
    Ok(())
}

#[tokio::test]
async fn env_overrides_win_over_inherited_values() -> TestResult {
    let (mut sup, mut rx) = supervisor(1000);
    let spec = sh(r#"test "$HOME" = /watchrun-home && test "$WATCHRUN_MARKER" = yes"#)
        .env("HOME", "/watchrun-home")
        .env("WATCHRUN_MARKER", "yes");

    sup.start(&spec)?;
    assert_eq!(next_outcome(&mut rx).await.code, 0);
    Ok(())
}

#[tokio::test]
async fn working_directory_is_applied() -> TestResult {
    let tmp = tempfile::tempdir()?;
    let dir = tmp.path().canonicalize()?;
    let (mut sup, mut rx) = supervisor(1000);

    let spec = sh(&format!(r#"test "$(pwd -P)" = "{}""#, dir.display())).working_dir(&dir);
    sup.start(&spec)?;
    assert_eq!(next_outcome(&mut rx).await.code, 0);
    Ok(())
}

#[tokio::test]
async fn stop_terminates_a_long_running_process() -> TestResult {
    let (mut sup, mut rx) = supervisor(500);
    let handle = sup.start(&sh("sleep 30"))?;
    assert_eq!(handle.state(), RunState::Running);

    timeout(Duration::from_secs(5), sup.stop(&handle)).await??;
    assert_eq!(handle.state(), RunState::Stopped);
    assert!(sup.exit_code(&handle)?.killed_by_signal);
    assert!(next_outcome(&mut rx).await.killed_by_signal);
    Ok(())
}

#[tokio::test]
async fn process_ignoring_interrupt_is_killed() -> TestResult {
    let (mut sup, mut rx) = supervisor(300);
    let handle = sup.start(&sh("trap '' INT; sleep 30"))?;

    // Give the shell a moment to install the trap.
    tokio::time::sleep(Duration::from_millis(200)).await;
    timeout(Duration::from_secs(5), sup.stop(&handle)).await??;

    let outcome = next_outcome(&mut rx).await;
    assert!(outcome.killed_by_signal);
    assert_eq!(outcome.code, 128 + SIGKILL);
    Ok(())
}

/// True while `pid` exists and is not a zombie waiting to be reaped.
#[cfg(target_os = "linux")]
fn is_running(pid: u32) -> bool {
    match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
        // The state follows the parenthesised command name.
        Ok(stat) => stat
            .rsplit_once(')')
            .and_then(|(_, rest)| rest.split_whitespace().next())
            .is_some_and(|state| state != "Z"),
        Err(_) => false,
    }
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn stop_kills_background_jobs_of_the_command() -> TestResult {
    let tmp = tempfile::tempdir()?;
    let pid_file = tmp.path().join("job.pid");
    let (mut sup, mut rx) = supervisor(500);

    // A non-interactive shell starts background jobs with SIGINT ignored.
    let script = format!("sleep 30 & echo $! > '{}'; wait", pid_file.display());
    let handle = sup.start(&sh(&script))?;

    let mut job = None;
    for _ in 0..100 {
        if let Ok(text) = std::fs::read_to_string(&pid_file)
            && let Ok(pid) = text.trim().parse::<u32>()
        {
            job = Some(pid);
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let job = job.ok_or("background job never reported its pid")?;
    assert!(is_running(job));

    timeout(Duration::from_secs(5), sup.stop(&handle)).await??;
    assert!(next_outcome(&mut rx).await.killed_by_signal);

    for _ in 0..100 {
        if !is_running(job) {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("background job {job} survived the stop");
}

#[tokio::test]
async fn timeout_kills_and_is_reported() -> TestResult {
    let (tx, mut rx) = mpsc::channel(16);
    let options = SupervisorOptions {
        grace_period: Duration::from_millis(500),
        timeout: Some(Duration::from_millis(200)),
    };
    let mut sup = ProcessSupervisor::new(OsProcessLauncher, options, tx);

    sup.start(&sh("sleep 30"))?;
    let outcome = next_outcome(&mut rx).await;
    assert!(outcome.timed_out);
    assert!(outcome.killed_by_signal);
    Ok(())
}

#[tokio::test]
async fn missing_program_is_a_spawn_failure() -> TestResult {
    let (mut sup, _rx) = supervisor(100);
    let err = sup
        .start(&CommandSpec::new("/definitely/not/a/real/binary"))
        .unwrap_err();
    assert!(err.to_string().contains("/definitely/not/a/real/binary"));
    Ok(())
}
