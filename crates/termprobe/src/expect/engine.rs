//! The expect loop.
//!
//! An [`ExpectEngine`] owns the pending output of one session and drives a
//! [`Channel`] until a pattern matches or the call ends some other way:
//!
//! ```text
//! Waiting ──match──────────▶ Matched
//!    │ ───end of stream────▶ StreamClosed
//!    │ ───deadline─────────▶ TimedOut
//!    └────child reaped─────▶ ProcessDied
//! ```
//!
//! The pending buffer is searched before every read, so output left over
//! from an earlier call can satisfy a later one without touching the child.

use std::time::Duration;

use tokio::time::Instant;

use super::buffer::PatternBuffer;
use super::pattern::PatternSet;
use crate::channel::{Channel, ReadStatus};
use crate::config::{DEFAULT_POLL_INTERVAL, DEFAULT_READ_CHUNK};
use crate::error::{ExpectError, Result};
use crate::transcript::{Direction, TranscriptSink};
use crate::types::ExpectOutcome;

/// Pattern matching state for one session.
pub struct ExpectEngine {
    buffer: PatternBuffer,
    eof: bool,
    poll_interval: Duration,
    read_chunk: usize,
    transcript: Option<Box<dyn TranscriptSink>>,
}

impl ExpectEngine {
    /// Create an engine with the default poll interval and read size.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: PatternBuffer::new(),
            eof: false,
            poll_interval: DEFAULT_POLL_INTERVAL,
            read_chunk: DEFAULT_READ_CHUNK,
            transcript: None,
        }
    }

    /// Bound a single blocking read. Between reads the child's exit status
    /// is checked.
    #[must_use]
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(Duration::from_millis(1));
        self
    }

    /// Set the size of a single read.
    #[must_use]
    pub fn read_chunk(mut self, size: usize) -> Self {
        self.read_chunk = size.max(1);
        self
    }

    /// Send every byte read or written to `sink`.
    #[must_use]
    pub fn transcript(mut self, sink: Box<dyn TranscriptSink>) -> Self {
        self.set_transcript(sink);
        self
    }

    /// Replace the transcript sink.
    pub fn set_transcript(&mut self, sink: Box<dyn TranscriptSink>) {
        self.flush_transcript();
        self.transcript = Some(sink);
    }

    /// The pending, unconsumed output.
    #[must_use]
    pub const fn buffer(&self) -> &PatternBuffer {
        &self.buffer
    }

    /// Whether the child's end of the terminal has closed.
    #[must_use]
    pub const fn at_eof(&self) -> bool {
        self.eof
    }

    /// Log bytes written to the child.
    pub fn record_input(&mut self, data: &[u8]) {
        self.record(Direction::Input, data);
    }

    fn record(&mut self, direction: Direction, data: &[u8]) {
        if let Some(sink) = self.transcript.as_mut()
            && let Err(e) = sink.record(direction, data)
        {
            tracing::warn!(error = %e, ?direction, "transcript write failed");
        }
    }

    /// Flush the transcript sink, if any.
    pub fn flush_transcript(&mut self) {
        if let Some(sink) = self.transcript.as_mut()
            && let Err(e) = sink.flush()
        {
            tracing::warn!(error = %e, "transcript flush failed");
        }
    }

    /// Wait until one of `patterns` matches the child's output.
    ///
    /// The earliest match in the pending output wins; a tie goes to the
    /// pattern listed first. On a match, the matched text and everything
    /// before it are consumed. The other outcomes leave the buffer as it is.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty pattern set, or if reading from the
    /// channel fails. Timeouts, end of stream and child exit are outcomes,
    /// not errors.
    pub async fn expect<C: Channel>(
        &mut self,
        channel: &mut C,
        patterns: &PatternSet,
        timeout: Duration,
    ) -> Result<ExpectOutcome> {
        if patterns.is_empty() {
            return Err(ExpectError::invalid_pattern("no patterns to expect"));
        }

        let started = Instant::now();
        let deadline = started + timeout;
        let mut chunk = vec![0u8; self.read_chunk];

        tracing::debug!(
            pid = channel.pid(),
            patterns = ?patterns.describe(),
            ?timeout,
            "expect"
        );

        loop {
            if let Some(found) = self.buffer.search(patterns) {
                let m = self.buffer.consume_match(&found);
                tracing::debug!(
                    pattern_index = m.pattern_index,
                    matched = %m.matched,
                    elapsed = ?started.elapsed(),
                    "matched"
                );
                return Ok(ExpectOutcome::Matched(m));
            }

            if self.eof {
                tracing::debug!(elapsed = ?started.elapsed(), pending = self.buffer.len(), "stream closed before match");
                return Ok(ExpectOutcome::StreamClosed {
                    buffer: self.buffer.as_str_lossy(),
                });
            }

            let now = Instant::now();
            if now >= deadline {
                tracing::debug!(?timeout, pending = self.buffer.len(), "timed out");
                return Ok(ExpectOutcome::TimedOut {
                    timeout,
                    buffer: self.buffer.as_str_lossy(),
                });
            }

            let wait = (deadline - now).min(self.poll_interval);
            match channel.read_available(&mut chunk, wait).await? {
                ReadStatus::Data(n) => {
                    self.buffer.append(&chunk[..n]);
                    self.record(Direction::Output, &chunk[..n]);
                }
                ReadStatus::EndOfStream => self.eof = true,
                ReadStatus::Pending => {
                    if let Some(status) = channel.exit_status()? {
                        tracing::debug!(%status, pending = self.buffer.len(), "child exited before match");
                        return Ok(ExpectOutcome::ProcessDied {
                            status,
                            buffer: self.buffer.as_str_lossy(),
                        });
                    }
                }
            }
        }
    }
}

impl Default for ExpectEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ExpectEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpectEngine")
            .field("buffer", &self.buffer)
            .field("eof", &self.eof)
            .field("poll_interval", &self.poll_interval)
            .field("transcript", &self.transcript.is_some())
            .finish_non_exhaustive()
    }
}
