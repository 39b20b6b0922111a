//! Test definitions loaded from disk and run against a real child.

#![cfg(unix)]

mod common;

use std::time::Duration;

use common::{TIMEOUT, init_tracing};
use termprobe::{ExpectError, LineEnding, PatternSet, Session, TestDefinition};

#[tokio::test]
async fn definition_drives_a_session() {
    init_tracing();
    let dir = common::scratch_dir("definition");
    std::fs::write(dir.join("marker.txt"), b"").expect("fixture");
    let file = dir.join("listing.toml");
    std::fs::write(
        &file,
        r#"
command = ["/bin/sh", "-c", "ls; echo done-$((2 * 3))"]
transcript = "listing.log"
timeout_ms = 5000
working_dir = "."

[env]
LC_ALL = "C"
"#,
    )
    .expect("write definition");

    let definition = TestDefinition::load(&file).expect("load");
    let config = definition.into_session_config();
    assert_eq!(config.timeout.default, Duration::from_millis(5000));
    assert_eq!(config.working_dir.as_deref(), Some(dir.join(".").as_path()));

    let mut session = Session::spawn_with_config(config).await.expect("spawn");
    let m = session
        .expect_strict(&PatternSet::from("done-6"), Some(TIMEOUT))
        .await
        .expect("done marker");
    assert!(m.before.contains("marker.txt"));
    session.close().await.expect("close");
    drop(session);

    let transcript = std::fs::read_to_string(dir.join("listing.log")).expect("transcript");
    assert!(transcript.contains("done-6"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn missing_definition_file_names_the_path() {
    let err = TestDefinition::load("/nonexistent/termprobe/def.toml").expect_err("missing");
    assert!(matches!(err, ExpectError::IoWithContext { .. }));
    assert!(err.to_string().contains("/nonexistent/termprobe/def.toml"));
}

#[test]
fn defaults_fill_unset_fields() {
    let config = TestDefinition::from_toml_str(r#"command = "cat""#)
        .expect("parse")
        .into_session_config();
    assert_eq!(config.command, "cat");
    assert!(config.args.is_empty());
    assert_eq!(config.line_ending, LineEnding::Lf);
    assert!(config.transcript.is_none());
}
