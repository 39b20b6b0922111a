//! Session builder for constructing sessions with custom configuration.

use std::path::PathBuf;
use std::time::Duration;

use super::handle::Session;
use super::lifecycle::ShutdownStrategy;
use crate::config::{LineEnding, SessionConfig};
use crate::error::Result;

/// Builder for session configurations.
#[derive(Debug, Clone, Default)]
pub struct SessionBuilder {
    config: SessionConfig,
}

impl SessionBuilder {
    /// Create a new session builder with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the command to execute.
    #[must_use]
    pub fn command(mut self, command: impl Into<String>) -> Self {
        self.config.command = command.into();
        self
    }

    /// Set the command arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Add a single argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.config.args.push(arg.into());
        self
    }

    /// Add an environment variable.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.env.insert(key.into(), value.into());
        self
    }

    /// Set whether to inherit the parent environment.
    #[must_use]
    pub const fn inherit_env(mut self, inherit: bool) -> Self {
        self.config.inherit_env = inherit;
        self
    }

    /// Set the working directory.
    #[must_use]
    pub fn working_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.working_dir = Some(path.into());
        self
    }

    /// Set the terminal dimensions.
    #[must_use]
    pub const fn dimensions(mut self, cols: u16, rows: u16) -> Self {
        self.config.dimensions = crate::types::Dimensions::new(cols, rows);
        self
    }

    /// Set the default expect timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout.default = timeout;
        self
    }

    /// Set how long a polite termination may take.
    #[must_use]
    pub const fn terminate_grace(mut self, grace: Duration) -> Self {
        self.config.timeout.terminate_grace = grace;
        self
    }

    /// Set the upper bound on one blocking read.
    #[must_use]
    pub const fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.timeout.poll_interval = interval;
        self
    }

    /// Set the line ending used by `send_line`.
    #[must_use]
    pub const fn line_ending(mut self, line_ending: LineEnding) -> Self {
        self.config.line_ending = line_ending;
        self
    }

    /// Set the shutdown strategy used by `close`.
    #[must_use]
    pub const fn shutdown(mut self, strategy: ShutdownStrategy) -> Self {
        self.config.shutdown = strategy;
        self
    }

    /// Write a raw transcript to `path`.
    #[must_use]
    pub fn transcript(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.transcript = Some(path.into());
        self
    }

    /// Apply `TERMPROBE_*` overrides from the process environment.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        self.config = self.config.with_env_overrides();
        self
    }

    /// Build the session configuration.
    #[must_use]
    pub fn build(self) -> SessionConfig {
        self.config
    }

    /// Spawn the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the child cannot be spawned.
    pub async fn spawn(self) -> Result<Session> {
        Session::spawn_with_config(self.config).await
    }
}

/// Ready-made configurations.
pub struct QuickSession;

impl QuickSession {
    /// Prompt used by [`QuickSession::shell`].
    pub const SHELL_PROMPT: &'static str = "termprobe$ ";

    /// A POSIX shell with a fixed prompt and no startup files, so tests
    /// can wait for [`QuickSession::SHELL_PROMPT`].
    #[must_use]
    pub fn shell() -> SessionConfig {
        SessionBuilder::new()
            .command("/bin/sh")
            .env("PS1", Self::SHELL_PROMPT)
            .env("ENV", "/dev/null")
            .build()
    }

    /// Create a session config for a custom command.
    #[must_use]
    pub fn command(cmd: impl Into<String>) -> SessionConfig {
        SessionBuilder::new().command(cmd).build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_every_field() {
        let config = SessionBuilder::new()
            .command("/bin/sh")
            .arg("-i")
            .env("LANG", "C")
            .dimensions(100, 40)
            .timeout(Duration::from_secs(3))
            .terminate_grace(Duration::from_millis(100))
            .poll_interval(Duration::from_millis(10))
            .line_ending(LineEnding::Cr)
            .shutdown(ShutdownStrategy::Kill)
            .transcript("/tmp/t.log")
            .build();

        assert_eq!(config.command, "/bin/sh");
        assert_eq!(config.args, vec!["-i"]);
        assert_eq!(config.env.get("LANG").map(String::as_str), Some("C"));
        assert_eq!(config.timeout.terminate_grace, Duration::from_millis(100));
        assert_eq!(config.timeout.poll_interval, Duration::from_millis(10));
        assert_eq!(config.line_ending, LineEnding::Cr);
        assert_eq!(config.shutdown, ShutdownStrategy::Kill);
        assert_eq!(config.transcript, Some(PathBuf::from("/tmp/t.log")));
    }

    #[test]
    fn quick_shell_has_fixed_prompt() {
        let config = QuickSession::shell();
        assert_eq!(config.command, "/bin/sh");
        assert_eq!(
            config.env.get("PS1").map(String::as_str),
            Some(QuickSession::SHELL_PROMPT)
        );
    }
}
