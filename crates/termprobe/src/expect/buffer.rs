//! Accumulator for output that has been read but not yet consumed by a match.

use std::fmt;

use bytes::{Bytes, BytesMut};

use super::pattern::{PatternMatch, PatternSet};
use crate::types::Match;

/// Initial allocation for a pattern buffer.
pub const INITIAL_CAPACITY: usize = 8 * 1024;

/// A match located in a [`PatternBuffer`], not yet consumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferMatch {
    /// Index of the matching pattern in its set.
    pub pattern_index: usize,
    /// Location of the match within the pending bytes.
    pub location: PatternMatch,
}

/// Unconsumed output from the child.
///
/// Bytes are only ever appended at the tail and removed from the head by
/// [`PatternBuffer::consume`]; nothing is reordered and nothing is dropped
/// for size. A match may span any number of appends.
pub struct PatternBuffer {
    data: BytesMut,
    total_appended: usize,
    /// Set id and length of the last search that found nothing.
    scanned: Option<(u64, usize)>,
}

impl PatternBuffer {
    /// Create an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: BytesMut::with_capacity(INITIAL_CAPACITY),
            total_appended: 0,
            scanned: None,
        }
    }

    /// Append output at the tail.
    pub fn append(&mut self, data: &[u8]) {
        self.data.extend_from_slice(data);
        self.total_appended += data.len();
    }

    /// The pending bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// The pending bytes as text, with invalid UTF-8 replaced.
    #[must_use]
    pub fn as_str_lossy(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }

    /// Number of pending bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Total bytes ever appended.
    #[must_use]
    pub const fn total_appended(&self) -> usize {
        self.total_appended
    }

    /// Discard everything pending.
    pub fn clear(&mut self) {
        self.data.clear();
        self.scanned = None;
    }

    /// Find the earliest match of any pattern in the pending bytes.
    ///
    /// If the same set was searched before without success, literal patterns
    /// resume near where that search stopped instead of rescanning.
    pub fn search(&mut self, patterns: &PatternSet) -> Option<BufferMatch> {
        let scanned = match self.scanned {
            Some((id, len)) if id == patterns.id() => len,
            _ => 0,
        };

        match patterns.find_match_resuming(&self.data, scanned) {
            Some((pattern_index, location)) => Some(BufferMatch {
                pattern_index,
                location,
            }),
            None => {
                self.scanned = Some((patterns.id(), self.data.len()));
                None
            }
        }
    }

    /// Remove and return everything up to `end`.
    ///
    /// `end` is clamped to the pending length.
    pub fn consume(&mut self, end: usize) -> Bytes {
        self.scanned = None;
        let end = end.min(self.data.len());
        self.data.split_to(end).freeze()
    }

    /// Consume a match found by [`PatternBuffer::search`], producing the
    /// caller-facing [`Match`].
    pub fn consume_match(&mut self, found: &BufferMatch) -> Match {
        let location = &found.location;
        let captures = location.capture_texts(&self.data);
        let taken = self.consume(location.end);

        let before = String::from_utf8_lossy(&taken[..location.start]).into_owned();
        let matched = String::from_utf8_lossy(&taken[location.start..]).into_owned();

        Match::new(found.pattern_index, matched, before).with_captures(captures)
    }
}

impl Default for PatternBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PatternBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternBuffer")
            .field("len", &self.data.len())
            .field("total_appended", &self.total_appended)
            .finish()
    }
}
