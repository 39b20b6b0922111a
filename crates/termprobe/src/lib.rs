//! termprobe: drive interactive programs through a pseudo-terminal
//!
//! A test spawns a command-line program on a pseudo-terminal, sends it
//! lines, and waits for its output to match regular expressions, pulling
//! capture groups out of free-form text. Partial reads, buffering, timeouts
//! and cleanup of the child are handled for it.
//!
//! - [`Session`] owns one child. `send_line` writes input; `expect` waits
//!   for the earliest match among a [`PatternSet`] and consumes it.
//! - [`ExpectOutcome`] reports a match, a timeout, end of stream or child
//!   exit as plain values. The strict variants turn non-matches into
//!   [`ExpectError::ExpectationFailed`] with the unmatched output attached.
//! - Dropping a session kills its child, including during a panic.
//!   [`install_exit_guard`] covers abrupt exits that skip destructors.
//! - [`oracle`] compares extracted items against ground truth computed by
//!   the test.
//!
//! # Example
//!
//! ```no_run
//! use termprobe::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let mut session = Session::spawn_with_config(QuickSession::shell()).await?;
//!     session
//!         .expect_strict(&PatternSet::from(QuickSession::SHELL_PROMPT), None)
//!         .await?;
//!
//!     session.send_line("echo $((6 * 7))").await?;
//!     let answer = session.expect_captures(r"\n(\d+)\r\n").await?;
//!     assert_eq!(answer, ["42"]);
//!
//!     session.close().await?;
//!     Ok(())
//! }
//! ```

#![cfg(unix)]

pub mod channel;
pub mod config;
pub mod error;
pub mod expect;
pub mod oracle;
pub mod prelude;
pub mod session;
pub mod sync;
pub mod transcript;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use channel::{Channel, PtyChannel, ReadStatus};
pub use config::{
    CommandLine, EnvConfig, LineEnding, SessionConfig, TestDefinition, TimeoutConfig,
};
pub use error::{ExpectError, Result, SpawnError};
pub use expect::{ExpectEngine, Pattern, PatternBuffer, PatternSet};
pub use oracle::{FileFilter, OracleMismatch, OracleReport};
pub use session::{QuickSession, Session, SessionBuilder, ShutdownReport, ShutdownStrategy};
pub use sync::SyncSession;
pub use termprobe_pty::{install_exit_guard, live_children};
pub use transcript::{Recorder, Transcript, TranscriptEvent, TranscriptSink, WriterSink};
pub use types::{
    ControlChar, Dimensions, ExpectOutcome, Match, OutcomeKind, ProcessExitStatus, SessionId,
    SessionState,
};
