//! Configuration types for PTY creation.
//!
//! [`PtyConfig`] describes the environment a child is spawned into, and
//! [`PtySignal`] names the signals the harness sends to it.

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::PathBuf;

/// Configuration for spawning a child inside a new PTY.
///
/// # Example
///
/// ```
/// use termprobe_pty::PtyConfig;
///
/// let config = PtyConfig::builder()
///     .working_directory("/tmp")
///     .env("TERM", "dumb")
///     .window_size(120, 40)
///     .build();
/// assert_eq!(config.window_size, (120, 40));
/// ```
#[derive(Debug, Clone)]
pub struct PtyConfig {
    /// Working directory for the child process.
    pub working_directory: Option<PathBuf>,

    /// Complete environment for the child.
    /// If None, the parent environment is inherited.
    pub env: Option<HashMap<OsString, OsString>>,

    /// Additional environment variables (merged over the base environment).
    pub env_add: HashMap<OsString, OsString>,

    /// Environment variables to remove from the base environment.
    pub env_remove: Vec<OsString>,

    /// Initial window size (columns, rows).
    pub window_size: (u16, u16),

    /// Whether the child starts a new session (`setsid`).
    ///
    /// The child then leads its own process group, so the whole group can be
    /// signalled at once during cleanup.
    pub new_session: bool,

    /// Whether the slave becomes the child's controlling terminal.
    /// Requires `new_session`.
    pub controlling_terminal: bool,

    /// Signal delivered to the child if the spawning thread dies first.
    ///
    /// Only honoured on Linux (`PR_SET_PDEATHSIG`). The kernel ties this to
    /// the spawning *thread*, so leave it unset when spawning from short-lived
    /// worker threads.
    pub parent_death_signal: Option<PtySignal>,
}

impl Default for PtyConfig {
    fn default() -> Self {
        Self {
            working_directory: None,
            env: None,
            env_add: HashMap::new(),
            env_remove: Vec::new(),
            window_size: (80, 24),
            new_session: true,
            controlling_terminal: true,
            parent_death_signal: None,
        }
    }
}

impl PtyConfig {
    /// Create a new builder for `PtyConfig`.
    #[must_use]
    pub fn builder() -> PtyConfigBuilder {
        PtyConfigBuilder::new()
    }

    /// Create a new `PtyConfig` with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The environment the child will actually see.
    #[must_use]
    pub fn effective_env(&self) -> HashMap<OsString, OsString> {
        let mut env = self
            .env
            .clone()
            .unwrap_or_else(|| std::env::vars_os().collect());

        env.extend(self.env_add.clone());

        for key in &self.env_remove {
            env.remove(key);
        }

        env
    }
}

/// Builder for [`PtyConfig`].
#[derive(Debug, Clone, Default)]
pub struct PtyConfigBuilder {
    config: PtyConfig,
}

impl PtyConfigBuilder {
    /// Create a new builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the working directory for the child process.
    #[must_use]
    pub fn working_directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.working_directory = Some(path.into());
        self
    }

    /// Start from an empty environment instead of inheriting the parent's.
    #[must_use]
    pub fn env_clear(mut self) -> Self {
        self.config.env = Some(HashMap::new());
        self
    }

    /// Add an environment variable.
    #[must_use]
    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.config.env_add.insert(key.into(), value.into());
        self
    }

    /// Remove an environment variable.
    #[must_use]
    pub fn env_remove(mut self, key: impl Into<OsString>) -> Self {
        self.config.env_remove.push(key.into());
        self
    }

    /// Set the initial window size.
    #[must_use]
    pub const fn window_size(mut self, cols: u16, rows: u16) -> Self {
        self.config.window_size = (cols, rows);
        self
    }

    /// Set whether to create a new session.
    #[must_use]
    pub const fn new_session(mut self, value: bool) -> Self {
        self.config.new_session = value;
        self
    }

    /// Set whether to attach the slave as controlling terminal.
    #[must_use]
    pub const fn controlling_terminal(mut self, value: bool) -> Self {
        self.config.controlling_terminal = value;
        self
    }

    /// Ask the kernel to signal the child when its parent thread dies.
    #[must_use]
    pub const fn parent_death_signal(mut self, signal: PtySignal) -> Self {
        self.config.parent_death_signal = Some(signal);
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> PtyConfig {
        self.config
    }
}

/// Signals the harness sends to a child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum PtySignal {
    /// SIGINT, as sent by Ctrl+C.
    Interrupt,
    /// SIGQUIT.
    Quit,
    /// SIGTERM.
    Terminate,
    /// SIGKILL, which cannot be caught.
    Kill,
    /// SIGHUP, the terminal hung up.
    Hangup,
    /// SIGWINCH.
    WindowChange,
    /// SIGCONT.
    Continue,
}

impl PtySignal {
    /// The raw signal number.
    #[must_use]
    pub const fn as_raw(self) -> i32 {
        match self {
            Self::Interrupt => libc::SIGINT,
            Self::Quit => libc::SIGQUIT,
            Self::Terminate => libc::SIGTERM,
            Self::Kill => libc::SIGKILL,
            Self::Hangup => libc::SIGHUP,
            Self::WindowChange => libc::SIGWINCH,
            Self::Continue => libc::SIGCONT,
        }
    }
}

/// Window size for the PTY.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSize {
    /// Number of columns (characters per line).
    pub cols: u16,
    /// Number of rows (lines).
    pub rows: u16,
}

impl WindowSize {
    /// Create a new window size with the given dimensions.
    #[must_use]
    pub const fn new(cols: u16, rows: u16) -> Self {
        Self { cols, rows }
    }
}

impl Default for WindowSize {
    fn default() -> Self {
        Self::new(80, 24)
    }
}

impl From<(u16, u16)> for WindowSize {
    fn from((cols, rows): (u16, u16)) -> Self {
        Self::new(cols, rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builder() {
        let config = PtyConfig::builder()
            .working_directory("/tmp")
            .env("FOO", "bar")
            .window_size(120, 40)
            .parent_death_signal(PtySignal::Kill)
            .build();

        assert_eq!(config.working_directory, Some(PathBuf::from("/tmp")));
        assert_eq!(config.window_size, (120, 40));
        assert!(config.env_add.contains_key(&OsString::from("FOO")));
        assert_eq!(config.parent_death_signal, Some(PtySignal::Kill));
    }

    #[test]
    fn effective_env_applies_add_and_remove() {
        let config = PtyConfig::builder()
            .env_clear()
            .env("KEEP", "1")
            .env("DROP", "2")
            .env_remove("DROP")
            .build();

        let env = config.effective_env();
        assert_eq!(env.len(), 1);
        assert_eq!(env.get(&OsString::from("KEEP")), Some(&OsString::from("1")));
    }

    #[test]
    fn signal_numbers() {
        assert_eq!(PtySignal::Kill.as_raw(), libc::SIGKILL);
        assert_eq!(PtySignal::Hangup.as_raw(), libc::SIGHUP);
    }
}
