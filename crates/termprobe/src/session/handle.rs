//! Session handle for driving a spawned process.

use std::time::Duration;

use super::lifecycle::{self, ShutdownReport};
use crate::channel::{Channel, PtyChannel};
use crate::config::SessionConfig;
use crate::error::{ExpectError, Result};
use crate::expect::{ExpectEngine, Pattern, PatternSet};
use crate::transcript::{TranscriptSink, WriterSink};
use crate::types::{ControlChar, ExpectOutcome, Match, ProcessExitStatus, SessionId, SessionState};

/// A session with one child process.
///
/// Every mutating call takes `&mut self`, so a session is driven by one
/// task at a time. Dropping a session kills its child if it is still
/// running, including while unwinding from a panic.
pub struct Session<C: Channel = PtyChannel> {
    channel: C,
    engine: ExpectEngine,
    config: SessionConfig,
    state: SessionState,
    id: SessionId,
}

impl Session<PtyChannel> {
    /// Spawn `command` with `args` in a new pseudo-terminal, using the
    /// default configuration plus any `TERMPROBE_*` overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ExpectError::Spawn`] if the child cannot be created.
    pub async fn spawn<I, S>(command: &str, args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let config = SessionConfig::new(command).args(args).with_env_overrides();
        Self::spawn_with_config(config).await
    }

    /// Spawn a session from a full configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ExpectError::Spawn`] if the child cannot be created, or an
    /// I/O error if the configured transcript file cannot be opened.
    pub async fn spawn_with_config(config: SessionConfig) -> Result<Self> {
        let transcript = config
            .transcript
            .as_ref()
            .map(|path| {
                ExpectError::with_io_context(
                    WriterSink::create(path),
                    format!("opening transcript {}", path.display()),
                )
            })
            .transpose()?;

        let channel = PtyChannel::spawn(&config.command, &config.args, &config.pty_config()).await?;
        let mut session = Self::with_channel(channel, config);
        if let Some(sink) = transcript {
            session.engine.set_transcript(Box::new(sink));
        }
        Ok(session)
    }

    /// Resize the terminal.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is closed or the size cannot be set.
    pub fn resize(&mut self, cols: u16, rows: u16) -> Result<()> {
        self.ensure_open()?;
        self.channel.resize(cols, rows)?;
        self.config.dimensions = crate::types::Dimensions::new(cols, rows);
        Ok(())
    }
}

impl<C: Channel> Session<C> {
    /// Wrap an already spawned channel.
    #[must_use]
    pub fn with_channel(channel: C, config: SessionConfig) -> Self {
        let engine = ExpectEngine::new()
            .poll_interval(config.timeout.poll_interval)
            .read_chunk(config.read_chunk);
        let id = SessionId::new();

        tracing::debug!(%id, pid = channel.pid(), command = %config.command, "session started");

        Self {
            channel,
            engine,
            config,
            state: SessionState::Running,
            id,
        }
    }

    /// Record everything sent and received to `sink`.
    #[must_use]
    pub fn with_transcript(mut self, sink: impl TranscriptSink + 'static) -> Self {
        self.engine.set_transcript(Box::new(sink));
        self
    }

    /// Get the session ID.
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// Process ID of the child.
    #[must_use]
    pub fn pid(&self) -> u32 {
        self.channel.pid()
    }

    /// Get the current session state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Get the session configuration.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Output received but not yet consumed by a match.
    #[must_use]
    pub fn buffer(&self) -> String {
        self.engine.buffer().as_str_lossy()
    }

    /// The underlying channel.
    #[must_use]
    pub const fn channel(&self) -> &C {
        &self.channel
    }

    /// Check whether the child is still running.
    pub fn is_alive(&mut self) -> bool {
        if self.state.is_closed() {
            return false;
        }
        match self.channel.exit_status() {
            Ok(None) => true,
            Ok(Some(status)) => {
                self.mark_exited(status);
                false
            }
            Err(e) => {
                tracing::debug!(id = %self.id, error = %e, "exit status check failed");
                false
            }
        }
    }

    /// The child's exit status, once it has been reaped.
    ///
    /// # Errors
    ///
    /// Returns an error if the status cannot be queried.
    pub fn exit_status(&mut self) -> Result<Option<ProcessExitStatus>> {
        if let SessionState::Exited(status) = self.state {
            return Ok(Some(status));
        }
        self.channel.exit_status()
    }

    fn ensure_open(&self) -> Result<()> {
        match self.state {
            SessionState::Closing | SessionState::Closed => Err(ExpectError::ChannelClosed),
            SessionState::Running | SessionState::Exited(_) => Ok(()),
        }
    }

    fn mark_exited(&mut self, status: ProcessExitStatus) {
        if self.state == SessionState::Running {
            tracing::debug!(id = %self.id, %status, "child exited");
            self.state = SessionState::Exited(status);
        }
    }

    /// Send bytes to the child, verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`ExpectError::ChannelClosed`] if the session was closed or
    /// the child has exited.
    pub async fn send(&mut self, data: &[u8]) -> Result<()> {
        self.ensure_open()?;

        match self.channel.write_all(data).await {
            Ok(()) => {
                self.engine.record_input(data);
                Ok(())
            }
            Err(e) => {
                if e.is_closed()
                    && let Ok(Some(status)) = self.channel.exit_status()
                {
                    self.mark_exited(status);
                }
                Err(e)
            }
        }
    }

    /// Send a string to the child.
    ///
    /// # Errors
    ///
    /// See [`Session::send`].
    pub async fn send_str(&mut self, text: &str) -> Result<()> {
        self.send(text.as_bytes()).await
    }

    /// Send `line` followed by the configured line ending.
    ///
    /// # Errors
    ///
    /// See [`Session::send`].
    pub async fn send_line(&mut self, line: &str) -> Result<()> {
        let ending = self.config.line_ending.as_bytes();
        let mut data = Vec::with_capacity(line.len() + ending.len());
        data.extend_from_slice(line.as_bytes());
        data.extend_from_slice(ending);
        tracing::debug!(id = %self.id, line, "send line");
        self.send(&data).await
    }

    /// Send a control character.
    ///
    /// # Errors
    ///
    /// See [`Session::send`].
    pub async fn send_control(&mut self, ctrl: ControlChar) -> Result<()> {
        self.send(&[ctrl.as_byte()]).await
    }

    /// Wait for any of `patterns` to appear in the output.
    ///
    /// `timeout` defaults to the session's configured timeout. A timeout, end
    /// of stream or child exit is an [`ExpectOutcome`], not an error; a
    /// timeout leaves the child running.
    ///
    /// # Errors
    ///
    /// Returns [`ExpectError::ChannelClosed`] after [`Session::close`], or an
    /// error if reading from the terminal fails.
    pub async fn expect(
        &mut self,
        patterns: &PatternSet,
        timeout: Option<Duration>,
    ) -> Result<ExpectOutcome> {
        self.ensure_open()?;
        let timeout = timeout.unwrap_or(self.config.timeout.default);

        let outcome = self.engine.expect(&mut self.channel, patterns, timeout).await?;
        match &outcome {
            ExpectOutcome::ProcessDied { status, .. } => self.mark_exited(*status),
            ExpectOutcome::StreamClosed { .. } => {
                if let Some(status) = self.channel.exit_status()? {
                    self.mark_exited(status);
                }
            }
            ExpectOutcome::Matched(_) | ExpectOutcome::TimedOut { .. } => {}
        }
        Ok(outcome)
    }

    /// Wait for a single regular expression, with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ExpectError::Regex`] if `regex` does not compile, otherwise
    /// as [`Session::expect`].
    pub async fn expect_regex(&mut self, regex: &str) -> Result<ExpectOutcome> {
        let patterns = PatternSet::from(Pattern::regex(regex)?);
        self.expect(&patterns, None).await
    }

    /// Like [`Session::expect`], but anything other than a match is an
    /// [`ExpectError::ExpectationFailed`] describing what was expected and
    /// what arrived.
    ///
    /// # Errors
    ///
    /// Returns an error if no pattern matched.
    pub async fn expect_strict(
        &mut self,
        patterns: &PatternSet,
        timeout: Option<Duration>,
    ) -> Result<Match> {
        self.expect(patterns, timeout).await?.into_match(patterns)
    }

    /// Wait for `regex` and return its capture groups, in order.
    ///
    /// A group that did not take part in the match is an empty string.
    ///
    /// # Errors
    ///
    /// Returns an error if the regex is invalid or does not match.
    pub async fn expect_captures(&mut self, regex: &str) -> Result<Vec<String>> {
        let patterns = PatternSet::from(Pattern::regex(regex)?);
        Ok(self.expect_strict(&patterns, None).await?.captures)
    }

    /// Stop the child using the configured [`ShutdownStrategy`](super::ShutdownStrategy)
    /// and release the terminal.
    ///
    /// Later sends and expects fail with [`ExpectError::ChannelClosed`].
    /// Closing again does nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if signalling or reaping the child fails. The child
    /// is still killed when the session is dropped.
    pub async fn close(&mut self) -> Result<Option<ShutdownReport>> {
        if self.state == SessionState::Closed {
            return Ok(None);
        }

        self.state = SessionState::Closing;
        let result = lifecycle::shutdown(
            &mut self.channel,
            self.config.shutdown,
            self.config.timeout.terminate_grace,
        )
        .await;

        self.engine.flush_transcript();
        self.state = SessionState::Closed;
        tracing::debug!(id = %self.id, "session closed");
        result.map(Some)
    }

    /// Stop the child directly: politely with a grace period, or with
    /// SIGKILL when `force` is set. Returns whether the child is gone.
    ///
    /// Terminating a child that already exited succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if signalling or reaping the child fails.
    pub async fn terminate(&mut self, force: bool) -> Result<bool> {
        let gone = self
            .channel
            .terminate(force, self.config.timeout.terminate_grace)
            .await?;
        if gone && let Some(status) = self.channel.exit_status()? {
            self.mark_exited(status);
        }
        Ok(gone)
    }
}

impl<C: Channel> Drop for Session<C> {
    fn drop(&mut self) {
        self.engine.flush_transcript();
        if self.state != SessionState::Closed {
            tracing::debug!(
                id = %self.id,
                pid = self.channel.pid(),
                state = %self.state,
                panicking = std::thread::panicking(),
                "session dropped without close"
            );
        }
    }
}

impl<C: Channel> std::fmt::Debug for Session<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("pid", &self.channel.pid())
            .field("state", &self.state)
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}
