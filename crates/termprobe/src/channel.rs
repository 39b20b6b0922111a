//! Byte channels to a child process.
//!
//! The expect engine and the session never touch file descriptors directly;
//! they drive a [`Channel`]. [`PtyChannel`] is the real implementation, and
//! the test utilities provide a scripted one.

mod pty;

use std::future::Future;
use std::time::Duration;

pub use pty::PtyChannel;

use crate::error::Result;
use crate::types::ProcessExitStatus;

/// Result of one bounded read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// This many bytes were read into the buffer.
    Data(usize),
    /// Nothing arrived within the wait bound. Not an error.
    Pending,
    /// The child closed its side of the terminal.
    EndOfStream,
}

/// A bidirectional byte stream attached to a child process.
///
/// Implementations kill their child (if it is still running) when dropped.
pub trait Channel: Send {
    /// Process ID of the child.
    fn pid(&self) -> u32;

    /// Write all of `data` to the child, verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`ExpectError::ChannelClosed`](crate::ExpectError::ChannelClosed)
    /// if the channel was closed or the child has exited.
    fn write_all(&mut self, data: &[u8]) -> impl Future<Output = Result<()>> + Send;

    /// Read whatever is available, blocking for at most `wait`.
    fn read_available(
        &mut self,
        buf: &mut [u8],
        wait: Duration,
    ) -> impl Future<Output = Result<ReadStatus>> + Send;

    /// The child's exit status if it has exited, without blocking.
    fn exit_status(&mut self) -> Result<Option<ProcessExitStatus>>;

    /// Stop the child.
    ///
    /// With `force` unset the child is asked to stop and given `grace` to
    /// do so; with `force` set it is killed. Returns whether the child is
    /// gone. Terminating a child that already exited succeeds.
    fn terminate(
        &mut self,
        force: bool,
        grace: Duration,
    ) -> impl Future<Output = Result<bool>> + Send;

    /// Whether the channel has been released.
    fn is_closed(&self) -> bool;
}
