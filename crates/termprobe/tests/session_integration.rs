//! Sessions against real children on real pseudo-terminals.

#![cfg(unix)]

mod common;

use std::time::{Duration, Instant};

use common::{TIMEOUT, init_tracing, prompt, shell};
use termprobe::{
    ControlChar, ExpectError, ExpectOutcome, OutcomeKind, Pattern, PatternSet, ProcessExitStatus,
    Session, SessionBuilder, SessionState, ShutdownStrategy, SpawnError,
};

#[tokio::test]
async fn shell_evaluates_a_line() {
    init_tracing();
    let mut session = shell().await;

    // The echoed command line cannot match: `$((` is not a digit.
    session.send_line("echo result-$((40 + 2))").await.expect("send");
    let captures = session
        .expect_captures(r"result-(\d+)")
        .await
        .expect("captures");
    assert_eq!(captures, ["42"]);

    session.expect_strict(&prompt(), Some(TIMEOUT)).await.expect("prompt");
    session.close().await.expect("close");
}

#[tokio::test]
async fn earliest_of_several_patterns_wins() {
    init_tracing();
    let mut session = shell().await;

    session.send_line("echo al''pha; echo be''ta").await.expect("send");
    let patterns = PatternSet::from(vec![Pattern::literal("beta"), Pattern::literal("alpha")]);
    let first = session
        .expect_strict(&patterns, Some(TIMEOUT))
        .await
        .expect("first");
    assert_eq!(first.pattern_index, 1);
    assert_eq!(first.as_str(), "alpha");

    let second = session
        .expect_strict(&patterns, Some(TIMEOUT))
        .await
        .expect("second");
    assert_eq!(second.pattern_index, 0);

    session.close().await.expect("close");
}

#[tokio::test]
async fn timeout_returns_after_deadline_and_leaves_child_running() {
    init_tracing();
    let mut session = shell().await;

    let wait = Duration::from_millis(300);
    let start = Instant::now();
    let outcome = session
        .expect(&PatternSet::from("never-printed"), Some(wait))
        .await
        .expect("expect");
    assert!(start.elapsed() >= wait);
    assert_eq!(outcome.kind(), OutcomeKind::TimedOut);
    assert!(session.is_alive());

    session.send_line("echo af''ter").await.expect("send");
    session
        .expect_strict(&PatternSet::from("after\r\n"), Some(TIMEOUT))
        .await
        .expect("still usable after timeout");

    session.close().await.expect("close");
}

#[tokio::test]
async fn strict_timeout_reports_patterns_and_buffer() {
    init_tracing();
    let mut session = shell().await;

    session.send_line("echo some''thing-else").await.expect("send");
    session
        .expect_strict(&PatternSet::from("something-else"), Some(TIMEOUT))
        .await
        .expect("output");

    let err = session
        .expect_strict(&PatternSet::from("missing-prompt>"), Some(Duration::from_millis(200)))
        .await
        .expect_err("no match");
    match err {
        ExpectError::ExpectationFailed {
            kind,
            patterns,
            buffer,
            ..
        } => {
            assert_eq!(kind, OutcomeKind::TimedOut);
            assert_eq!(patterns, ["missing-prompt>"]);
            assert!(buffer.contains(termprobe::QuickSession::SHELL_PROMPT));
        }
        other => panic!("unexpected error: {other}"),
    }

    session.close().await.expect("close");
}

#[tokio::test]
async fn exited_child_ends_the_expect() {
    init_tracing();
    let mut session = Session::spawn("/bin/sh", ["-c", "echo bye; exit 3"])
        .await
        .expect("spawn");

    let outcome = session
        .expect(&PatternSet::from("never-printed"), Some(TIMEOUT))
        .await
        .expect("expect");
    // The exit can be noticed a moment before end of stream.
    assert!(
        matches!(
            outcome,
            ExpectOutcome::StreamClosed { .. } | ExpectOutcome::ProcessDied { .. }
        ),
        "unexpected outcome: {outcome:?}"
    );
    assert!(outcome.buffer().is_some_and(|b| b.contains("bye")));

    let deadline = Instant::now() + TIMEOUT;
    let status = loop {
        if let Some(status) = session.exit_status().expect("status") {
            break status;
        }
        assert!(Instant::now() < deadline, "child never reaped");
        tokio::time::sleep(Duration::from_millis(20)).await;
    };
    assert_eq!(status, ProcessExitStatus::Exited(3));
    assert!(!session.is_alive());
}

#[tokio::test]
async fn close_is_idempotent_and_blocks_further_use() {
    init_tracing();
    let mut session = shell().await;
    let pid = session.pid();

    let report = session.close().await.expect("close").expect("first close reports");
    assert!(report.exited);
    assert_eq!(session.state(), SessionState::Closed);
    assert!(!common::process_alive(pid));

    assert!(session.close().await.expect("second close").is_none());
    assert!(session.send_line("echo hi").await.expect_err("send").is_closed());
    assert!(
        session
            .expect(&prompt(), None)
            .await
            .expect_err("expect")
            .is_closed()
    );
}

#[tokio::test]
async fn escalating_shutdown_kills_a_child_ignoring_signals() {
    init_tracing();
    let mut session = SessionBuilder::new()
        .command("/bin/sh")
        .args(["-c", "trap '' HUP TERM; while :; do sleep 1; done"])
        .shutdown(ShutdownStrategy::Escalating)
        .terminate_grace(Duration::from_millis(200))
        .spawn()
        .await
        .expect("spawn");
    let pid = session.pid();

    let report = session.close().await.expect("close").expect("report");
    assert!(report.exited);
    assert!(report.forced);
    assert_eq!(report.status, Some(ProcessExitStatus::Signaled(libc::SIGKILL)));
    assert!(!common::process_alive(pid));
}

#[tokio::test]
async fn control_characters_reach_the_child() {
    init_tracing();
    let mut session = Session::spawn("cat", std::iter::empty::<&str>())
        .await
        .expect("spawn cat");

    session.send_line("ping").await.expect("send");
    session
        .expect_strict(&PatternSet::from("ping"), Some(TIMEOUT))
        .await
        .expect("echo");

    session.send_control(ControlChar::CtrlD).await.expect("eof");
    let outcome = session
        .expect(&PatternSet::from("never-printed"), Some(TIMEOUT))
        .await
        .expect("expect");
    assert!(matches!(
        outcome.kind(),
        OutcomeKind::StreamClosed | OutcomeKind::ProcessDied
    ));
}

#[tokio::test]
async fn transcript_file_captures_the_exchange() {
    init_tracing();
    let dir = common::scratch_dir("transcript");
    let path = dir.join("session.log");

    let mut session = SessionBuilder::new()
        .command("/bin/sh")
        .env("PS1", termprobe::QuickSession::SHELL_PROMPT)
        .env("ENV", "/dev/null")
        .transcript(&path)
        .spawn()
        .await
        .expect("spawn");
    session.expect_strict(&prompt(), Some(TIMEOUT)).await.expect("prompt");
    session.send_line("echo logged-$((1 + 1))").await.expect("send");
    session
        .expect_strict(&PatternSet::from("logged-2"), Some(TIMEOUT))
        .await
        .expect("output");
    session.close().await.expect("close");
    drop(session);

    let text = std::fs::read_to_string(&path).expect("read transcript");
    assert!(text.contains("echo logged-$((1 + 1))"));
    assert!(text.contains("logged-2"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn missing_program_is_a_spawn_error() {
    init_tracing();
    let err = Session::spawn("/nonexistent/termprobe-program", std::iter::empty::<&str>())
        .await
        .expect_err("spawn");
    assert!(matches!(
        err,
        ExpectError::Spawn(SpawnError::CommandNotFound { .. })
    ));
}

#[tokio::test]
async fn resize_is_visible_to_the_child() {
    init_tracing();
    let mut session = shell().await;

    session.resize(132, 43).expect("resize");
    session.send_line("stty size").await.expect("send");
    session
        .expect_strict(&PatternSet::from("43 132"), Some(TIMEOUT))
        .await
        .expect("new size");

    session.close().await.expect("close");
}
