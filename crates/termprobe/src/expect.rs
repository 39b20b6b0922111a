//! Pattern matching over child output.
//!
//! [`Pattern`] and [`PatternSet`] describe what to wait for,
//! [`PatternBuffer`] holds output that has not been consumed yet, and
//! [`ExpectEngine`] runs the read/search loop against a channel.

mod buffer;
mod engine;
mod pattern;

pub use buffer::{BufferMatch, INITIAL_CAPACITY, PatternBuffer};
pub use engine::ExpectEngine;
pub use pattern::{CompiledRegex, NamedPattern, Pattern, PatternMatch, PatternSet};
