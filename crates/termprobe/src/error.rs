//! Error types for termprobe.
//!
//! Expect outcomes other than a match are values, not errors (see
//! [`ExpectOutcome`](crate::ExpectOutcome)). They become
//! [`ExpectError::ExpectationFailed`] only through the strict conversions, which
//! render a readable expected-versus-actual report for the test log.

use std::time::Duration;

use thiserror::Error;

use crate::types::{OutcomeKind, ProcessExitStatus};

/// Maximum length of buffer content to display in error messages.
const MAX_BUFFER_DISPLAY: usize = 500;

/// Lines of tail context kept when a buffer is truncated.
const CONTEXT_LINES: usize = 3;

/// Make carriage returns and other control bytes visible.
fn visible(line: &str) -> String {
    line.chars()
        .map(|c| match c {
            '\r' => "\\r".to_string(),
            '\t' => "\\t".to_string(),
            c if c.is_control() => format!("\\x{:02x}", u32::from(c)),
            c => c.to_string(),
        })
        .collect()
}

/// Format buffer content for display, keeping the tail if it is large.
pub(crate) fn format_buffer_snippet(buffer: &str) -> String {
    if buffer.is_empty() {
        return "(empty buffer)".to_string();
    }

    let lines: Vec<String> = buffer.split('\n').map(visible).collect();
    let total_lines = lines.len();

    if buffer.len() <= MAX_BUFFER_DISPLAY || total_lines <= CONTEXT_LINES * 2 {
        return format!(
            "┌─ buffer ({} bytes, {} lines) ─────────────\n│ {}\n└────────────────────────────────────────",
            buffer.len(),
            total_lines,
            lines.join("\n│ ")
        );
    }

    let tail_lines = &lines[total_lines - CONTEXT_LINES * 2..];
    let hidden = total_lines - tail_lines.len();

    format!(
        "┌─ buffer ({} bytes, {} lines) ─────────────\n│ ... ({} lines hidden)\n│ {}\n└────────────────────────────────────────",
        buffer.len(),
        total_lines,
        hidden,
        tail_lines.join("\n│ ")
    )
}

fn format_expectation_failure(
    kind: OutcomeKind,
    patterns: &[String],
    buffer: &str,
    detail: Option<&str>,
) -> String {
    let expected = patterns
        .iter()
        .enumerate()
        .map(|(i, p)| format!("  [{i}] {p}"))
        .collect::<Vec<_>>()
        .join("\n");
    let detail = detail.map(|d| format!(" ({d})")).unwrap_or_default();

    format!(
        "expectation failed: {kind}{detail}\n\
         \n\
         Expected one of:\n\
         {expected}\n\
         \n\
         Actual output:\n\
         {}",
        format_buffer_snippet(buffer)
    )
}

/// The main error type for termprobe operations.
#[derive(Debug, Error)]
pub enum ExpectError {
    /// The child could not be spawned.
    #[error("failed to spawn process: {0}")]
    Spawn(#[from] SpawnError),

    /// The session or its channel was already closed, or the child is gone.
    #[error("channel is closed")]
    ChannelClosed,

    /// A strict expect did not match.
    #[error("{}", format_expectation_failure(*kind, patterns, buffer, detail.as_deref()))]
    ExpectationFailed {
        /// What happened instead of a match.
        kind: OutcomeKind,
        /// The patterns that were expected, in order.
        patterns: Vec<String>,
        /// The unmatched output.
        buffer: String,
        /// Timeout or exit status, when relevant.
        detail: Option<String>,
    },

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An I/O error occurred with additional context.
    #[error("{context}: {source}")]
    IoWithContext {
        /// What operation was being performed.
        context: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Invalid regex pattern.
    #[error("invalid regex pattern: {0}")]
    Regex(#[from] regex::Error),

    /// Invalid pattern.
    #[error("invalid pattern: {message}")]
    InvalidPattern {
        /// Description of what's wrong with the pattern.
        message: String,
    },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Error from the PTY layer after spawn.
    #[error("PTY error: {0}")]
    Pty(#[source] termprobe_pty::PtyError),

    /// Extracted output did not cover the ground truth.
    #[error(transparent)]
    Oracle(#[from] crate::oracle::OracleMismatch),
}

/// Errors related to process spawning.
///
/// Spawn failures are fatal for the test that triggered them and are never
/// retried.
#[derive(Debug, Error)]
pub enum SpawnError {
    /// Command not found.
    #[error("command not found: {command}")]
    CommandNotFound {
        /// The command that was not found.
        command: String,
    },

    /// Permission denied.
    #[error("permission denied: {path}")]
    PermissionDenied {
        /// The path that could not be executed.
        path: String,
    },

    /// The system refused to create another process.
    #[error("cannot create process for {command}: resources exhausted")]
    ResourceExhausted {
        /// The command being spawned.
        command: String,
    },

    /// PTY allocation failed.
    #[error("failed to allocate PTY: {reason}")]
    PtyAllocation {
        /// The reason for the failure.
        reason: String,
    },

    /// Working directory error.
    #[error("invalid working directory: {path}")]
    InvalidWorkingDir {
        /// The invalid working directory path.
        path: String,
    },

    /// General I/O error during spawn.
    #[error("I/O error during spawn: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid command or argument.
    #[error("invalid {kind}: {reason}")]
    InvalidArgument {
        /// The kind of invalid input (e.g., "command", "argument").
        kind: String,
        /// The value that was invalid.
        value: String,
        /// The reason it's invalid.
        reason: String,
    },
}

/// Result type alias for termprobe operations.
pub type Result<T> = std::result::Result<T, ExpectError>;

impl ExpectError {
    /// Create an expectation failure.
    pub fn expectation_failed(
        kind: OutcomeKind,
        patterns: Vec<String>,
        buffer: impl Into<String>,
    ) -> Self {
        Self::ExpectationFailed {
            kind,
            patterns,
            buffer: buffer.into(),
            detail: None,
        }
    }

    /// Attach detail (timeout, exit status) to an expectation failure.
    #[must_use]
    pub fn with_detail(self, text: impl Into<String>) -> Self {
        match self {
            Self::ExpectationFailed {
                kind,
                patterns,
                buffer,
                ..
            } => Self::ExpectationFailed {
                kind,
                patterns,
                buffer,
                detail: Some(text.into()),
            },
            other => other,
        }
    }

    /// Create an invalid pattern error.
    pub fn invalid_pattern(message: impl Into<String>) -> Self {
        Self::InvalidPattern {
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an I/O error with context.
    pub fn io_context(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::IoWithContext {
            context: context.into(),
            source,
        }
    }

    /// Wrap an I/O result with context.
    pub fn with_io_context<T>(result: std::io::Result<T>, context: impl Into<String>) -> Result<T> {
        result.map_err(|e| Self::io_context(context, e))
    }

    /// Check if this is a strict-mode timeout.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::ExpectationFailed {
                kind: OutcomeKind::TimedOut,
                ..
            }
        )
    }

    /// Check if the channel is closed.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self, Self::ChannelClosed)
    }

    /// Get the unmatched output if this error carries it.
    #[must_use]
    pub fn buffer(&self) -> Option<&str> {
        match self {
            Self::ExpectationFailed { buffer, .. } => Some(buffer),
            _ => None,
        }
    }
}

impl From<termprobe_pty::PtyError> for ExpectError {
    fn from(err: termprobe_pty::PtyError) -> Self {
        match err {
            termprobe_pty::PtyError::Closed | termprobe_pty::PtyError::ProcessExited => {
                Self::ChannelClosed
            }
            other => Self::Pty(other),
        }
    }
}

impl SpawnError {
    /// Create a command not found error.
    pub fn command_not_found(command: impl Into<String>) -> Self {
        Self::CommandNotFound {
            command: command.into(),
        }
    }

    /// Create a permission denied error.
    pub fn permission_denied(path: impl Into<String>) -> Self {
        Self::PermissionDenied { path: path.into() }
    }

    /// Create a resource exhaustion error.
    pub fn resource_exhausted(command: impl Into<String>) -> Self {
        Self::ResourceExhausted {
            command: command.into(),
        }
    }

    /// Create a PTY allocation error.
    pub fn pty_allocation(reason: impl Into<String>) -> Self {
        Self::PtyAllocation {
            reason: reason.into(),
        }
    }

    /// Create an invalid working directory error.
    pub fn invalid_working_dir(path: impl Into<String>) -> Self {
        Self::InvalidWorkingDir { path: path.into() }
    }

    /// Classify a PTY-layer failure raised while spawning `command`.
    #[must_use]
    pub fn from_pty(err: termprobe_pty::PtyError, command: &str) -> Self {
        use termprobe_pty::PtyError;

        match err {
            PtyError::Create(e) => Self::pty_allocation(e.to_string()),
            PtyError::Spawn(e) => match e.raw_os_error() {
                Some(libc::ENOENT) => Self::command_not_found(command),
                Some(libc::EACCES | libc::EPERM) => Self::permission_denied(command),
                Some(libc::EAGAIN | libc::ENOMEM) => Self::resource_exhausted(command),
                _ => Self::Io(e),
            },
            other => Self::Io(std::io::Error::other(other)),
        }
    }
}

/// Format the detail shown for an outcome that carries a timeout or status.
pub(crate) fn outcome_detail(
    timeout: Option<Duration>,
    status: Option<ProcessExitStatus>,
) -> Option<String> {
    match (timeout, status) {
        (Some(t), _) => Some(format!("after {t:?}")),
        (None, Some(s)) => Some(s.to_string()),
        (None, None) => None,
    }
}
