//! Blocking wrapper around [`Session`].
//!
//! For tests that are not async: each call drives the async session to
//! completion on a private current-thread runtime.

use std::time::Duration;

use tokio::runtime::{Builder, Runtime};

use crate::config::SessionConfig;
use crate::error::{ExpectError, Result};
use crate::expect::PatternSet;
use crate::session::{Session, ShutdownReport};
use crate::types::{ControlChar, ExpectOutcome, Match, ProcessExitStatus, SessionState};

/// A blocking session.
pub struct SyncSession {
    // Declared before the runtime so the child and its PTY are released
    // while the runtime still exists.
    inner: Session,
    runtime: Runtime,
}

fn runtime() -> Result<Runtime> {
    Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| ExpectError::io_context("creating tokio runtime", e))
}

impl SyncSession {
    /// Spawn `command` with `args` in a new pseudo-terminal.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime or the child cannot be created.
    pub fn spawn(command: &str, args: &[&str]) -> Result<Self> {
        let runtime = runtime()?;
        let inner = runtime.block_on(Session::spawn(command, args.iter().copied()))?;
        Ok(Self { inner, runtime })
    }

    /// Spawn with a full configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime or the child cannot be created.
    pub fn spawn_with_config(config: SessionConfig) -> Result<Self> {
        let runtime = runtime()?;
        let inner = runtime.block_on(Session::spawn_with_config(config))?;
        Ok(Self { inner, runtime })
    }

    /// Get the session configuration.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        self.inner.config()
    }

    /// Get the child process ID.
    #[must_use]
    pub fn pid(&self) -> u32 {
        self.inner.pid()
    }

    /// Get the current session state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.inner.state()
    }

    /// Output received but not yet consumed.
    #[must_use]
    pub fn buffer(&self) -> String {
        self.inner.buffer()
    }

    /// Check whether the child is still running.
    pub fn is_alive(&mut self) -> bool {
        self.inner.is_alive()
    }

    /// The child's exit status, once reaped.
    ///
    /// # Errors
    ///
    /// Returns an error if the status cannot be queried.
    pub fn exit_status(&mut self) -> Result<Option<ProcessExitStatus>> {
        self.inner.exit_status()
    }

    /// Send bytes to the child.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn send(&mut self, data: &[u8]) -> Result<()> {
        self.runtime.block_on(self.inner.send(data))
    }

    /// Send a string to the child.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn send_str(&mut self, s: &str) -> Result<()> {
        self.runtime.block_on(self.inner.send_str(s))
    }

    /// Send a line to the child.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn send_line(&mut self, line: &str) -> Result<()> {
        self.runtime.block_on(self.inner.send_line(line))
    }

    /// Send a control character.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn send_control(&mut self, ctrl: ControlChar) -> Result<()> {
        self.runtime.block_on(self.inner.send_control(ctrl))
    }

    /// Wait for any of `patterns`; see [`Session::expect`].
    ///
    /// # Errors
    ///
    /// Returns an error if the session is closed or reading fails.
    pub fn expect(
        &mut self,
        patterns: &PatternSet,
        timeout: Option<Duration>,
    ) -> Result<ExpectOutcome> {
        self.runtime.block_on(self.inner.expect(patterns, timeout))
    }

    /// Wait for a single regex with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the regex is invalid or reading fails.
    pub fn expect_regex(&mut self, regex: &str) -> Result<ExpectOutcome> {
        self.runtime.block_on(self.inner.expect_regex(regex))
    }

    /// Wait for any of `patterns`, failing on anything but a match.
    ///
    /// # Errors
    ///
    /// Returns an error if no pattern matched.
    pub fn expect_strict(
        &mut self,
        patterns: &PatternSet,
        timeout: Option<Duration>,
    ) -> Result<Match> {
        self.runtime.block_on(self.inner.expect_strict(patterns, timeout))
    }

    /// Wait for `regex` and return its capture groups.
    ///
    /// # Errors
    ///
    /// Returns an error if the regex is invalid or does not match.
    pub fn expect_captures(&mut self, regex: &str) -> Result<Vec<String>> {
        self.runtime.block_on(self.inner.expect_captures(regex))
    }

    /// Close the session.
    ///
    /// # Errors
    ///
    /// Returns an error if shutting the child down fails.
    pub fn close(&mut self) -> Result<Option<ShutdownReport>> {
        self.runtime.block_on(self.inner.close())
    }

    /// Terminate the child; see [`Session::terminate`].
    ///
    /// # Errors
    ///
    /// Returns an error if signalling or reaping fails.
    pub fn terminate(&mut self, force: bool) -> Result<bool> {
        self.runtime.block_on(self.inner.terminate(force))
    }
}

impl std::fmt::Debug for SyncSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncSession")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::QuickSession;

    #[test]
    fn blocking_echo_round_trip() {
        let mut session = SyncSession::spawn("echo", &["sync output"]).expect("spawn");
        let m = session
            .expect_strict(&PatternSet::from("sync output"), Some(Duration::from_secs(5)))
            .expect("match");
        assert_eq!(m.as_str(), "sync output");
        session.close().expect("close");
    }

    #[test]
    fn blocking_shell_captures() {
        let mut config = QuickSession::shell();
        config.timeout.default = Duration::from_secs(5);
        let mut session = SyncSession::spawn_with_config(config).expect("spawn");

        session
            .expect_strict(&PatternSet::from(QuickSession::SHELL_PROMPT), None)
            .expect("prompt");
        session.send_line("echo value=$((6 * 7))").expect("send");
        let captures = session.expect_captures(r"value=(\d+)\r\n").expect("captures");
        assert_eq!(captures, vec!["42"]);

        session.close().expect("close");
        assert!(session.send_line("echo late").expect_err("closed").is_closed());
    }
}
