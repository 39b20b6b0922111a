//! Convenient re-exports for common termprobe usage.
//!
//! ```
//! use termprobe::prelude::*;
//! ```

// Sessions
pub use crate::session::{QuickSession, Session, SessionBuilder, ShutdownStrategy};
pub use crate::sync::SyncSession;

// Configuration
pub use crate::config::{LineEnding, SessionConfig, TestDefinition, TimeoutConfig};

// Patterns and results
pub use crate::expect::{Pattern, PatternSet};
pub use crate::types::{ControlChar, ExpectOutcome, Match, OutcomeKind, ProcessExitStatus};

// Error handling
pub use crate::error::{ExpectError, Result, SpawnError};

// Ground truth
pub use crate::oracle::{FileFilter, compare, extract_all, list_directory};

// Cleanup
pub use termprobe_pty::install_exit_guard;
