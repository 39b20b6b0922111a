//! Channel backed by a Unix pseudo-terminal.

use std::io;
use std::time::Duration;

use termprobe_pty::{PtyConfig, PtyError, PtySignal, UnixPtyChild, UnixPtyMaster, WindowSize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use super::{Channel, ReadStatus};
use crate::error::{ExpectError, Result, SpawnError};
use crate::types::ProcessExitStatus;

/// Upper bound on reaping a child after SIGKILL.
const KILL_REAP_TIMEOUT: Duration = Duration::from_secs(5);

/// A child process running on the slave side of a PTY.
///
/// Dropping the channel kills the child's process group if it is still
/// running and releases the master descriptor.
pub struct PtyChannel {
    child: UnixPtyChild,
    master: UnixPtyMaster,
    command: String,
    closed: bool,
}

impl std::fmt::Debug for PtyChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PtyChannel")
            .field("command", &self.command)
            .field("pid", &self.child.pid())
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

fn check_argument(kind: &str, value: &str) -> std::result::Result<(), SpawnError> {
    if value.contains('\0') {
        return Err(SpawnError::InvalidArgument {
            kind: kind.to_string(),
            value: value.replace('\0', "\\0"),
            reason: "contains a NUL byte".to_string(),
        });
    }
    Ok(())
}

impl PtyChannel {
    /// Allocate a PTY and spawn `command` with `args` on its slave side.
    ///
    /// `command` is looked up on `PATH` unless it contains a slash.
    ///
    /// # Errors
    ///
    /// Returns a [`SpawnError`] classifying why the child could not be
    /// created.
    pub async fn spawn(
        command: &str,
        args: &[String],
        config: &PtyConfig,
    ) -> std::result::Result<Self, SpawnError> {
        if command.is_empty() {
            return Err(SpawnError::InvalidArgument {
                kind: "command".to_string(),
                value: String::new(),
                reason: "command is empty".to_string(),
            });
        }
        check_argument("command", command)?;
        for arg in args {
            check_argument("argument", arg)?;
        }
        if let Some(dir) = &config.working_directory
            && !dir.is_dir()
        {
            return Err(SpawnError::invalid_working_dir(dir.display().to_string()));
        }

        let (master, child) = termprobe_pty::spawn(command, args, config)
            .map_err(|e| SpawnError::from_pty(e, command))?;

        tracing::debug!(pid = child.pid(), command, ?args, "spawned child in PTY");

        Ok(Self {
            child,
            master,
            command: command.to_string(),
            closed: false,
        })
    }

    /// The command this channel was spawned with.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Resize the terminal; the child receives SIGWINCH.
    ///
    /// # Errors
    ///
    /// Returns an error if the window size cannot be set.
    pub fn resize(&self, cols: u16, rows: u16) -> Result<()> {
        if self.closed {
            return Err(ExpectError::ChannelClosed);
        }
        self.master
            .set_window_size(WindowSize { cols, rows })
            .map_err(ExpectError::from)
    }

    fn release(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.master.close() {
            tracing::warn!(pid = self.child.pid(), error = %e, "failed to close PTY master");
        }
    }

    fn send_polite_signals(&self) -> Result<()> {
        for signal in [PtySignal::Hangup, PtySignal::Continue, PtySignal::Terminate] {
            match self.child.signal(signal) {
                Ok(()) | Err(PtyError::ProcessExited) => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

fn write_error(e: io::Error) -> ExpectError {
    match (e.raw_os_error(), e.kind()) {
        (Some(libc::EIO | libc::EPIPE), _) | (_, io::ErrorKind::BrokenPipe) => {
            ExpectError::ChannelClosed
        }
        _ => ExpectError::io_context("writing to terminal", e),
    }
}

impl Channel for PtyChannel {
    fn pid(&self) -> u32 {
        self.child.pid()
    }

    async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        if self.closed || self.child.try_wait()?.is_some() {
            return Err(ExpectError::ChannelClosed);
        }

        self.master.write_all(data).await.map_err(write_error)?;
        self.master.flush().await.map_err(write_error)?;
        tracing::trace!(pid = self.child.pid(), bytes = data.len(), "wrote to terminal");
        Ok(())
    }

    async fn read_available(&mut self, buf: &mut [u8], wait: Duration) -> Result<ReadStatus> {
        match tokio::time::timeout(wait, self.master.read(buf)).await {
            Err(_) => Ok(ReadStatus::Pending),
            Ok(Ok(0)) => {
                tracing::debug!(pid = self.child.pid(), "end of stream");
                Ok(ReadStatus::EndOfStream)
            }
            Ok(Ok(n)) => {
                tracing::trace!(pid = self.child.pid(), bytes = n, "read from terminal");
                Ok(ReadStatus::Data(n))
            }
            Ok(Err(e)) => Err(ExpectError::io_context("reading from terminal", e)),
        }
    }

    fn exit_status(&mut self) -> Result<Option<ProcessExitStatus>> {
        Ok(self.child.try_wait()?.map(Into::into))
    }

    async fn terminate(&mut self, force: bool, grace: Duration) -> Result<bool> {
        if self.child.try_wait()?.is_some() {
            self.release();
            return Ok(true);
        }

        let pid = self.child.pid();
        let gone = if force {
            tracing::debug!(pid, "killing child");
            match self.child.kill() {
                Ok(()) | Err(PtyError::ProcessExited) => {}
                Err(e) => return Err(e.into()),
            }
            match tokio::time::timeout(KILL_REAP_TIMEOUT.max(grace), self.child.wait()).await {
                Ok(status) => {
                    status?;
                    true
                }
                Err(_) => false,
            }
        } else {
            tracing::debug!(pid, ?grace, "asking child to terminate");
            self.send_polite_signals()?;
            match tokio::time::timeout(grace, self.child.wait()).await {
                Ok(status) => {
                    status?;
                    true
                }
                Err(_) => false,
            }
        };

        if gone {
            self.release();
        } else {
            tracing::debug!(pid, force, "child still running after termination request");
        }
        Ok(gone)
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}
