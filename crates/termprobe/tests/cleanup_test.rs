//! Children must not outlive the test that spawned them, however it ends.

#![cfg(unix)]

mod common;

use std::panic::{self, AssertUnwindSafe};
use std::process::Command;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use common::{init_tracing, process_alive};
use termprobe::{SyncSession, install_exit_guard, live_children};

const CHILD_MODE: &str = "TERMPROBE_CLEANUP_CHILD";

fn wait_until_gone(pid: u32) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if !process_alive(pid) {
            return true;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    false
}

#[test]
fn panic_inside_a_session_kills_the_child() {
    init_tracing();
    let pid = AtomicU32::new(0);

    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        let session = SyncSession::spawn("sleep", &["30"]).expect("spawn");
        pid.store(session.pid(), Ordering::SeqCst);
        assert!(process_alive(session.pid()));
        panic!("assertion failed inside the test body");
    }));

    assert!(result.is_err());
    let pid = pid.load(Ordering::SeqCst);
    assert_ne!(pid, 0);
    assert!(wait_until_gone(pid), "child {pid} survived the panic");
    assert!(!live_children().contains(&pid));
}

#[test]
fn error_return_kills_the_child() {
    init_tracing();

    fn body(pid: &AtomicU32) -> termprobe::Result<()> {
        let mut session = SyncSession::spawn("sleep", &["30"])?;
        pid.store(session.pid(), Ordering::SeqCst);
        session.expect_strict(
            &termprobe::PatternSet::from("never-printed"),
            Some(Duration::from_millis(50)),
        )?;
        Ok(())
    }

    let pid = AtomicU32::new(0);
    assert!(body(&pid).is_err());

    let pid = pid.load(Ordering::SeqCst);
    assert!(wait_until_gone(pid), "child {pid} survived the error");
}

#[test]
fn closed_session_unregisters_its_child() {
    init_tracing();
    let mut session = SyncSession::spawn("sleep", &["30"]).expect("spawn");
    let pid = session.pid();
    assert!(live_children().contains(&pid));

    session.close().expect("close");
    assert!(!live_children().contains(&pid));
    assert!(!process_alive(pid));
}

/// Runs only inside the re-executed test binary: spawn a child, report its
/// pid, then leave through `process::exit`, which skips destructors.
#[test]
fn abrupt_exit_child() {
    if std::env::var_os(CHILD_MODE).is_none() {
        return;
    }

    install_exit_guard().expect("install guard");
    let session = SyncSession::spawn("sleep", &["30"]).expect("spawn");
    println!("CHILD_PID={}", session.pid());
    std::mem::forget(session);
    std::process::exit(0);
}

#[test]
fn exit_guard_kills_children_on_process_exit() {
    init_tracing();
    let exe = std::env::current_exe().expect("test binary path");
    let output = Command::new(exe)
        .args(["--exact", "abrupt_exit_child", "--nocapture", "--test-threads=1", "--quiet"])
        .env(CHILD_MODE, "1")
        .output()
        .expect("run child harness");
    assert!(output.status.success(), "child harness failed: {output:?}");

    let stdout = String::from_utf8_lossy(&output.stdout);
    let pid: u32 = stdout
        .lines()
        .find_map(|line| line.strip_prefix("CHILD_PID="))
        .and_then(|pid| pid.trim().parse().ok())
        .expect("child pid in harness output");

    assert!(wait_until_gone(pid), "child {pid} outlived the harness");
}
