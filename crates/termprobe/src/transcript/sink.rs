//! Transcript sinks.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use super::format::Direction;

/// Destination for the bytes a session exchanges with its child.
///
/// Sinks are best effort: the session logs a failed `record` and carries on.
pub trait TranscriptSink: Send {
    /// Record bytes travelling in `direction`.
    fn record(&mut self, direction: Direction, data: &[u8]) -> io::Result<()>;

    /// Flush buffered data.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Raw byte log.
///
/// Output is written exactly as received; input is written too unless
/// disabled, so the file reads like a terminal scrollback.
#[derive(Debug)]
pub struct WriterSink<W: Write + Send> {
    writer: W,
    include_input: bool,
}

impl<W: Write + Send> WriterSink<W> {
    /// Log both directions to `writer`.
    pub const fn new(writer: W) -> Self {
        Self {
            writer,
            include_input: true,
        }
    }

    /// Log only what the child wrote.
    #[must_use]
    pub const fn output_only(mut self) -> Self {
        self.include_input = false;
        self
    }

    /// Get the inner writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl WriterSink<BufWriter<File>> {
    /// Create (or truncate) a log file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created.
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path.as_ref())?;
        tracing::debug!(path = %path.as_ref().display(), "writing transcript");
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write + Send> TranscriptSink for WriterSink<W> {
    fn record(&mut self, direction: Direction, data: &[u8]) -> io::Result<()> {
        if direction == Direction::Input && !self.include_input {
            return Ok(());
        }
        self.writer.write_all(data)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}
