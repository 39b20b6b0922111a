//! Error types for the termprobe-pty crate.
//!
//! [`PtyError`] covers allocation of the terminal pair, spawning the child
//! inside it, and the I/O and signalling that follows.

use std::io;

/// The error type for PTY operations.
#[derive(Debug, thiserror::Error)]
pub enum PtyError {
    /// Failed to allocate a new PTY pair.
    #[error("failed to create PTY: {0}")]
    Create(#[source] io::Error),

    /// Failed to spawn a child process.
    #[error("failed to spawn process: {0}")]
    Spawn(#[source] io::Error),

    /// An I/O error occurred during PTY operations.
    #[error("PTY I/O error: {0}")]
    Io(#[from] io::Error),

    /// Failed to read terminal attributes.
    #[error("failed to get terminal attributes: {0}")]
    GetAttributes(#[source] io::Error),

    /// Failed to resize the PTY.
    #[error("failed to resize PTY: {0}")]
    Resize(#[source] io::Error),

    /// The PTY has been closed.
    #[error("PTY has been closed")]
    Closed,

    /// The child process has already exited.
    #[error("child process has already exited")]
    ProcessExited,

    /// Failed to send a signal to the child process.
    #[error("failed to send signal: {0}")]
    Signal(#[source] io::Error),

    /// Failed to wait for the child process.
    #[error("failed to wait for child: {0}")]
    Wait(#[source] io::Error),

    /// The operation timed out.
    #[error("operation timed out")]
    Timeout,
}

impl PtyError {
    /// The OS error code behind this error, if there is one.
    #[must_use]
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Self::Create(e)
            | Self::Spawn(e)
            | Self::Io(e)
            | Self::GetAttributes(e)
            | Self::Resize(e)
            | Self::Signal(e)
            | Self::Wait(e) => e.raw_os_error(),
            Self::Closed | Self::ProcessExited | Self::Timeout => None,
        }
    }
}

/// A specialized Result type for PTY operations.
pub type Result<T> = std::result::Result<T, PtyError>;

impl From<rustix::io::Errno> for PtyError {
    fn from(errno: rustix::io::Errno) -> Self {
        Self::Io(errno_to_io(errno))
    }
}

/// Convert a rustix errno into a `std::io::Error`.
pub(crate) fn errno_to_io(errno: rustix::io::Errno) -> io::Error {
    io::Error::from_raw_os_error(errno.raw_os_error())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = PtyError::Closed;
        assert_eq!(err.to_string(), "PTY has been closed");
    }

    #[test]
    fn error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "not found");
        let pty_err: PtyError = io_err.into();
        assert!(matches!(pty_err, PtyError::Io(_)));
    }

    #[test]
    fn raw_os_error_passthrough() {
        let err = PtyError::Spawn(io::Error::from_raw_os_error(libc::EAGAIN));
        assert_eq!(err.raw_os_error(), Some(libc::EAGAIN));
        assert_eq!(PtyError::Timeout.raw_os_error(), None);
    }

    #[test]
    fn errno_conversion() {
        let err: PtyError = rustix::io::Errno::NOENT.into();
        assert_eq!(err.raw_os_error(), Some(libc::ENOENT));
    }
}
