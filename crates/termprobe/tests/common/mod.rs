//! Shared helpers for termprobe integration tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::time::Duration;

use termprobe::{PatternSet, QuickSession, Session};

/// Generous ceiling for any single expect against a real shell.
pub const TIMEOUT: Duration = Duration::from_secs(10);

/// Route `tracing` output through the test harness.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// The fixed prompt of [`QuickSession::shell`].
pub fn prompt() -> PatternSet {
    PatternSet::from(QuickSession::SHELL_PROMPT)
}

/// Spawn a shell and wait for its first prompt.
pub async fn shell() -> Session {
    let mut session = Session::spawn_with_config(QuickSession::shell())
        .await
        .expect("spawn shell");
    session
        .expect_strict(&prompt(), Some(TIMEOUT))
        .await
        .expect("first prompt");
    session
}

/// A fresh, empty scratch directory unique to this process and `name`.
pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("termprobe-{name}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).expect("create scratch dir");
    dir
}

/// Whether `pid` still names a process that has not been reaped.
pub fn process_alive(pid: u32) -> bool {
    match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
        // Field 3 is the state; a zombie has exited and only awaits reaping.
        Ok(stat) => stat
            .rsplit_once(')')
            .and_then(|(_, rest)| rest.split_whitespace().next())
            .is_some_and(|state| state != "Z"),
        Err(_) => false,
    }
}
