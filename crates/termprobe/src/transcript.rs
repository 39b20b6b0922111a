//! Session transcripts.
//!
//! A session hands every byte it sends and receives to an optional
//! [`TranscriptSink`]. [`WriterSink`] writes a raw terminal log to a file or
//! any writer; [`Recorder`] keeps timestamped events in memory for
//! assertions and failure reports.

pub mod format;
pub mod recorder;
pub mod sink;

pub use format::{Direction, Transcript, TranscriptEvent, TranscriptMetadata};
pub use recorder::Recorder;
pub use sink::{TranscriptSink, WriterSink};
