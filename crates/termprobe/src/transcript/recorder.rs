//! In-memory session recording.

use std::io;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use super::format::{Direction, Transcript, TranscriptEvent, TranscriptMetadata};
use super::sink::TranscriptSink;

/// A session recorder.
///
/// Clones share one transcript, so a test can keep a handle while the
/// session owns another as its sink.
#[derive(Debug, Clone)]
pub struct Recorder {
    start: Instant,
    transcript: Arc<Mutex<Transcript>>,
    max_events: Option<usize>,
}

impl Recorder {
    /// Create a new recorder.
    #[must_use]
    pub fn new(metadata: TranscriptMetadata) -> Self {
        Self {
            start: Instant::now(),
            transcript: Arc::new(Mutex::new(Transcript::new(metadata))),
            max_events: None,
        }
    }

    /// Stop recording after `count` events.
    #[must_use]
    pub const fn with_max_events(mut self, count: usize) -> Self {
        self.max_events = Some(count);
        self
    }

    /// Time since the recorder was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Record an output event.
    pub fn record_output(&self, data: &[u8]) {
        self.push(TranscriptEvent::output(self.elapsed(), data));
    }

    /// Record an input event.
    pub fn record_input(&self, data: &[u8]) {
        self.push(TranscriptEvent::input(self.elapsed(), data));
    }

    fn push(&self, event: TranscriptEvent) {
        let mut transcript = self.transcript.lock().unwrap_or_else(PoisonError::into_inner);
        if self
            .max_events
            .is_some_and(|max| transcript.events.len() >= max)
        {
            return;
        }
        transcript.push(event);
    }

    /// A snapshot of everything recorded so far.
    #[must_use]
    pub fn transcript(&self) -> Transcript {
        self.transcript
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Get event count.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.transcript
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .events
            .len()
    }
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new(TranscriptMetadata::default())
    }
}

impl TranscriptSink for Recorder {
    fn record(&mut self, direction: Direction, data: &[u8]) -> io::Result<()> {
        match direction {
            Direction::Input => self.record_input(data),
            Direction::Output => self.record_output(data),
        }
        Ok(())
    }
}
