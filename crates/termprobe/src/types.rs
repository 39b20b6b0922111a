//! Common types for termprobe.
//!
//! Matches and expect outcomes, session state, exit status and the other
//! small value types shared across the crate.

use std::fmt;
use std::time::Duration;

use crate::error::{ExpectError, Result, outcome_detail};
use crate::expect::PatternSet;

/// A successful match from an expect operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    /// The index of the pattern that matched, in the order it was given.
    pub pattern_index: usize,

    /// The full text that matched.
    pub matched: String,

    /// Capture groups, left to right as written in the pattern.
    ///
    /// `captures[0]` is group 1. A group that did not take part in the
    /// match is an empty string, so positions stay stable.
    pub captures: Vec<String>,

    /// Text between the previous consumption point and the match.
    pub before: String,
}

impl Match {
    /// Create a new match result.
    #[must_use]
    pub fn new(pattern_index: usize, matched: impl Into<String>, before: impl Into<String>) -> Self {
        Self {
            pattern_index,
            matched: matched.into(),
            captures: Vec::new(),
            before: before.into(),
        }
    }

    /// Create a match with captures.
    #[must_use]
    pub fn with_captures(mut self, captures: Vec<String>) -> Self {
        self.captures = captures;
        self
    }

    /// Get a capture by position in [`Match::captures`].
    #[must_use]
    pub fn capture(&self, index: usize) -> Option<&str> {
        self.captures.get(index).map(String::as_str)
    }

    /// Get a group by regex numbering: 0 is the whole match, 1 the first group.
    #[must_use]
    pub fn group(&self, n: usize) -> Option<&str> {
        match n {
            0 => Some(&self.matched),
            n => self.capture(n - 1),
        }
    }

    /// Get the full matched text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.matched
    }

    /// Everything this match removed from the buffer.
    #[must_use]
    pub fn consumed(&self) -> String {
        let mut text = String::with_capacity(self.before.len() + self.matched.len());
        text.push_str(&self.before);
        text.push_str(&self.matched);
        text
    }
}

impl fmt::Display for Match {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.matched)
    }
}

/// The result of one expect call.
///
/// Only [`ExpectOutcome::Matched`] consumes buffered output. The other
/// variants are ordinary values carrying whatever was left unmatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpectOutcome {
    /// A pattern matched.
    Matched(Match),

    /// The deadline passed without a match. The child is left running.
    TimedOut {
        /// The timeout that elapsed.
        timeout: Duration,
        /// Unmatched output at the deadline.
        buffer: String,
    },

    /// The child closed its side of the terminal before any pattern matched.
    StreamClosed {
        /// Unmatched output at end of stream.
        buffer: String,
    },

    /// The child exited before any pattern matched.
    ProcessDied {
        /// How the child exited.
        status: ProcessExitStatus,
        /// Unmatched output when the exit was noticed.
        buffer: String,
    },
}

impl ExpectOutcome {
    /// Which variant this is, without its payload.
    #[must_use]
    pub const fn kind(&self) -> OutcomeKind {
        match self {
            Self::Matched(_) => OutcomeKind::Matched,
            Self::TimedOut { .. } => OutcomeKind::TimedOut,
            Self::StreamClosed { .. } => OutcomeKind::StreamClosed,
            Self::ProcessDied { .. } => OutcomeKind::ProcessDied,
        }
    }

    /// Check if this is a successful match.
    #[must_use]
    pub const fn is_match(&self) -> bool {
        matches!(self, Self::Matched(_))
    }

    /// Check if this is a timeout.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }

    /// Borrow the match, if there is one.
    #[must_use]
    pub const fn as_match(&self) -> Option<&Match> {
        match self {
            Self::Matched(m) => Some(m),
            _ => None,
        }
    }

    /// Get the match if this is a successful match.
    #[must_use]
    pub fn matched(self) -> Option<Match> {
        match self {
            Self::Matched(m) => Some(m),
            _ => None,
        }
    }

    /// Strict mode: turn anything but a match into
    /// [`ExpectError::ExpectationFailed`](crate::ExpectError::ExpectationFailed),
    /// listing `patterns` against the unmatched output.
    ///
    /// # Errors
    ///
    /// Returns an error for every variant except [`ExpectOutcome::Matched`].
    pub fn into_match(self, patterns: &PatternSet) -> Result<Match> {
        let kind = self.kind();
        let (buffer, detail) = match self {
            Self::Matched(m) => return Ok(m),
            Self::TimedOut { timeout, buffer } => (buffer, outcome_detail(Some(timeout), None)),
            Self::StreamClosed { buffer } => (buffer, None),
            Self::ProcessDied { status, buffer } => (buffer, outcome_detail(None, Some(status))),
        };

        let err = ExpectError::expectation_failed(kind, patterns.describe(), buffer);
        Err(match detail {
            Some(detail) => err.with_detail(detail),
            None => err,
        })
    }

    /// Unmatched output, for the non-match variants.
    #[must_use]
    pub fn buffer(&self) -> Option<&str> {
        match self {
            Self::TimedOut { buffer, .. }
            | Self::StreamClosed { buffer }
            | Self::ProcessDied { buffer, .. } => Some(buffer),
            Self::Matched(_) => None,
        }
    }
}

/// Payload-free name of an [`ExpectOutcome`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeKind {
    /// A pattern matched.
    Matched,
    /// The deadline passed.
    TimedOut,
    /// End of stream.
    StreamClosed,
    /// The child exited.
    ProcessDied,
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Matched => "matched",
            Self::TimedOut => "timed out",
            Self::StreamClosed => "stream closed",
            Self::ProcessDied => "process died",
        })
    }
}

/// The state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Child is running and the session accepts operations.
    Running,

    /// A shutdown is in progress.
    Closing,

    /// The session was closed by the caller.
    Closed,

    /// The child exited on its own.
    Exited(ProcessExitStatus),
}

impl SessionState {
    /// Check if the session is closed or exited.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self, Self::Closed | Self::Exited(_))
    }

    /// Get the exit status if the session has exited.
    #[must_use]
    pub const fn exit_status(&self) -> Option<&ProcessExitStatus> {
        if let Self::Exited(status) = self {
            Some(status)
        } else {
            None
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Closing => write!(f, "closing"),
            Self::Closed => write!(f, "closed"),
            Self::Exited(status) => write!(f, "exited ({status})"),
        }
    }
}

/// Exit status of a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessExitStatus {
    /// Process exited with a code.
    Exited(i32),

    /// Process was terminated by a signal.
    Signaled(i32),
}

impl ProcessExitStatus {
    /// Check if the process exited successfully (code 0).
    #[must_use]
    pub const fn success(self) -> bool {
        matches!(self, Self::Exited(0))
    }

    /// Get the exit code if the process exited normally.
    #[must_use]
    pub const fn code(self) -> Option<i32> {
        match self {
            Self::Exited(code) => Some(code),
            Self::Signaled(_) => None,
        }
    }

    /// Get the signal number if the process was signaled.
    #[must_use]
    pub const fn signal(self) -> Option<i32> {
        match self {
            Self::Signaled(sig) => Some(sig),
            Self::Exited(_) => None,
        }
    }
}

impl fmt::Display for ProcessExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exited(code) => write!(f, "exited with code {code}"),
            Self::Signaled(sig) => write!(f, "terminated by signal {sig}"),
        }
    }
}

impl From<termprobe_pty::ExitStatus> for ProcessExitStatus {
    fn from(status: termprobe_pty::ExitStatus) -> Self {
        match status {
            termprobe_pty::ExitStatus::Exited(code) => Self::Exited(code),
            termprobe_pty::ExitStatus::Signaled(sig) => Self::Signaled(sig),
        }
    }
}

/// Terminal dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Dimensions {
    /// Width in columns.
    pub cols: u16,

    /// Height in rows.
    pub rows: u16,
}

impl Dimensions {
    /// Create new dimensions.
    #[must_use]
    pub const fn new(cols: u16, rows: u16) -> Self {
        Self { cols, rows }
    }

    /// Standard 80x24 terminal.
    pub const STANDARD: Self = Self::new(80, 24);
}

impl Default for Dimensions {
    fn default() -> Self {
        Self::STANDARD
    }
}

impl From<Dimensions> for (u16, u16) {
    fn from(dim: Dimensions) -> Self {
        (dim.cols, dim.rows)
    }
}

/// Control characters a test may send to the child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlChar {
    /// Ctrl+C (ETX), interrupt.
    CtrlC,
    /// Ctrl+D (EOT), end of input on an empty line.
    CtrlD,
    /// Ctrl+Z (SUB), suspend.
    CtrlZ,
    /// Ctrl+\ (FS), quit.
    CtrlBackslash,
}

impl ControlChar {
    /// The byte the terminal line discipline interprets.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        match self {
            Self::CtrlC => 0x03,
            Self::CtrlD => 0x04,
            Self::CtrlZ => 0x1A,
            Self::CtrlBackslash => 0x1C,
        }
    }
}

/// A unique identifier for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl SessionId {
    /// Allocate the next session ID.
    #[must_use]
    pub fn new() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the inner value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_accessors() {
        let m = Match::new(1, "a.c", "ls *.c\r\n")
            .with_captures(vec!["a".to_string(), String::new()]);

        assert_eq!(m.pattern_index, 1);
        assert_eq!(m.as_str(), "a.c");
        assert_eq!(m.group(0), Some("a.c"));
        assert_eq!(m.group(1), Some("a"));
        assert_eq!(m.group(2), Some(""));
        assert_eq!(m.group(3), None);
        assert_eq!(m.consumed(), "ls *.c\r\na.c");
    }

    #[test]
    fn outcome_kinds() {
        let timed_out = ExpectOutcome::TimedOut {
            timeout: Duration::from_millis(10),
            buffer: "partial".into(),
        };
        assert_eq!(timed_out.kind(), OutcomeKind::TimedOut);
        assert!(timed_out.is_timeout());
        assert_eq!(timed_out.buffer(), Some("partial"));
        assert!(timed_out.matched().is_none());

        let matched = ExpectOutcome::Matched(Match::new(0, "x", ""));
        assert!(matched.is_match());
        assert_eq!(matched.buffer(), None);
        assert_eq!(matched.as_match().map(Match::as_str), Some("x"));
    }

    #[test]
    fn strict_conversion_reports_patterns_and_buffer() {
        let patterns = PatternSet::regexes([r"(\S+\.c)"]).expect("regex");

        let died = ExpectOutcome::ProcessDied {
            status: ProcessExitStatus::Exited(2),
            buffer: "ls: cannot access".into(),
        };
        let err = died.into_match(&patterns).expect_err("not a match");
        let msg = err.to_string();
        assert!(msg.contains("process died (exited with code 2)"));
        assert!(msg.contains(r"/(\S+\.c)/"));
        assert_eq!(err.buffer(), Some("ls: cannot access"));

        let m = ExpectOutcome::Matched(Match::new(0, "a.c", ""))
            .into_match(&patterns)
            .expect("match");
        assert_eq!(m.as_str(), "a.c");
    }

    #[test]
    fn session_state_checks() {
        assert!(!SessionState::Running.is_closed());
        assert!(!SessionState::Closing.is_closed());
        assert!(SessionState::Closed.is_closed());

        let exited = SessionState::Exited(ProcessExitStatus::Exited(0));
        assert!(exited.is_closed());
        assert_eq!(exited.exit_status(), Some(&ProcessExitStatus::Exited(0)));
        assert_eq!(exited.to_string(), "exited (exited with code 0)");
    }

    #[test]
    fn exit_status_from_pty() {
        let status: ProcessExitStatus = termprobe_pty::ExitStatus::Signaled(9).into();
        assert_eq!(status.signal(), Some(9));
        assert!(!status.success());
    }

    #[test]
    fn session_ids_are_unique() {
        let a = SessionId::new();
        let b = SessionId::new();
        assert_ne!(a, b);
        assert!(a.to_string().starts_with("session-"));
    }
}
