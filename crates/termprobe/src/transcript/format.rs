//! Transcript format definitions.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Which way bytes travelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Written by the test to the child.
    Input,
    /// Read from the child's terminal.
    Output,
}

/// A transcript event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEvent {
    /// Time since recording started.
    #[serde(with = "millis")]
    pub timestamp: Duration,
    /// Event direction.
    pub direction: Direction,
    /// The bytes, lossily decoded.
    pub data: String,
}

impl TranscriptEvent {
    /// Create an output event.
    #[must_use]
    pub fn output(timestamp: Duration, data: &[u8]) -> Self {
        Self::new(timestamp, Direction::Output, data)
    }

    /// Create an input event.
    #[must_use]
    pub fn input(timestamp: Duration, data: &[u8]) -> Self {
        Self::new(timestamp, Direction::Input, data)
    }

    fn new(timestamp: Duration, direction: Direction, data: &[u8]) -> Self {
        Self {
            timestamp,
            direction,
            data: String::from_utf8_lossy(data).into_owned(),
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// Transcript metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptMetadata {
    /// Command that was run.
    pub command: Option<String>,
    /// Terminal width.
    pub width: u16,
    /// Terminal height.
    pub height: u16,
}

impl TranscriptMetadata {
    /// Create new metadata with dimensions.
    #[must_use]
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    /// Set the command.
    #[must_use]
    pub fn with_command(mut self, cmd: impl Into<String>) -> Self {
        self.command = Some(cmd.into());
        self
    }
}

/// A complete transcript.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    /// Metadata.
    pub metadata: TranscriptMetadata,
    /// Events, oldest first.
    pub events: Vec<TranscriptEvent>,
}

impl Transcript {
    /// Create a new transcript.
    #[must_use]
    pub const fn new(metadata: TranscriptMetadata) -> Self {
        Self {
            metadata,
            events: Vec::new(),
        }
    }

    /// Add an event.
    pub fn push(&mut self, event: TranscriptEvent) {
        self.events.push(event);
    }

    /// Time of the last event.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.events.last().map_or(Duration::ZERO, |e| e.timestamp)
    }

    fn text(&self, direction: Direction) -> String {
        self.events
            .iter()
            .filter(|e| e.direction == direction)
            .map(|e| e.data.as_str())
            .collect()
    }

    /// Everything the child wrote, concatenated.
    #[must_use]
    pub fn output_text(&self) -> String {
        self.text(Direction::Output)
    }

    /// Everything sent to the child, concatenated.
    #[must_use]
    pub fn input_text(&self) -> String {
        self.text(Direction::Input)
    }

    /// Serialise as newline-delimited JSON: the metadata first, then one
    /// line per event.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation fails.
    pub fn to_ndjson(&self) -> serde_json::Result<String> {
        let mut out = serde_json::to_string(&self.metadata)?;
        out.push('\n');
        for event in &self.events {
            out.push_str(&serde_json::to_string(event)?);
            out.push('\n');
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Transcript {
        let mut transcript = Transcript::new(TranscriptMetadata::new(80, 24).with_command("sh"));
        transcript.push(TranscriptEvent::input(Duration::from_millis(5), b"ls *.c\n"));
        transcript.push(TranscriptEvent::output(Duration::from_millis(20), b"a.c "));
        transcript.push(TranscriptEvent::output(Duration::from_millis(21), b"b.c\r\n"));
        transcript
    }

    #[test]
    fn text_by_direction() {
        let transcript = sample();
        assert_eq!(transcript.output_text(), "a.c b.c\r\n");
        assert_eq!(transcript.input_text(), "ls *.c\n");
        assert_eq!(transcript.duration(), Duration::from_millis(21));
    }

    #[test]
    fn ndjson_has_metadata_then_events() {
        let ndjson = sample().to_ndjson().expect("serialise");
        let lines: Vec<&str> = ndjson.lines().collect();
        assert_eq!(lines.len(), 4);

        let meta: serde_json::Value = serde_json::from_str(lines[0]).expect("metadata");
        assert_eq!(meta["command"], "sh");

        let first: TranscriptEvent = serde_json::from_str(lines[1]).expect("event");
        assert_eq!(first.direction, Direction::Input);
        assert_eq!(first.timestamp, Duration::from_millis(5));
        assert_eq!(first.data, "ls *.c\n");
    }
}
