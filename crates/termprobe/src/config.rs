//! Configuration types for termprobe.
//!
//! [`SessionConfig`] is the full description of one spawned session. It can
//! be built in code, overridden from `TERMPROBE_*` environment variables
//! ([`EnvConfig`]), or produced from a declarative [`TestDefinition`].

mod definition;
mod env;

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

pub use definition::{CommandLine, TestDefinition};
pub use env::{DEFAULT_PREFIX, EnvConfig};

use crate::session::ShutdownStrategy;
use crate::types::Dimensions;

/// Default expect timeout (30 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default grace period between a polite termination request and SIGKILL.
pub const DEFAULT_TERMINATE_GRACE: Duration = Duration::from_millis(500);

/// Default upper bound on a single blocking read inside an expect.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Default size of a single read from the terminal.
pub const DEFAULT_READ_CHUNK: usize = 4096;

/// Default TERM environment variable value.
pub const DEFAULT_TERM: &str = "xterm-256color";

/// Configuration for a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// The command to execute.
    pub command: String,

    /// Command arguments.
    pub args: Vec<String>,

    /// Environment variables to set on top of the base environment.
    pub env: HashMap<String, String>,

    /// Whether to inherit the parent environment.
    pub inherit_env: bool,

    /// Working directory for the process.
    pub working_dir: Option<PathBuf>,

    /// Terminal dimensions.
    pub dimensions: Dimensions,

    /// Timeout configuration.
    pub timeout: TimeoutConfig,

    /// Line terminator appended by `send_line`.
    pub line_ending: LineEnding,

    /// Size of a single read from the terminal.
    pub read_chunk: usize,

    /// How `close` shuts the child down.
    pub shutdown: ShutdownStrategy,

    /// Raw transcript file, written like a terminal log.
    pub transcript: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let mut env = HashMap::new();
        env.insert("TERM".to_string(), DEFAULT_TERM.to_string());

        Self {
            command: String::new(),
            args: Vec::new(),
            env,
            inherit_env: true,
            working_dir: None,
            dimensions: Dimensions::default(),
            timeout: TimeoutConfig::default(),
            line_ending: LineEnding::default(),
            read_chunk: DEFAULT_READ_CHUNK,
            shutdown: ShutdownStrategy::default(),
            transcript: None,
        }
    }
}

impl SessionConfig {
    /// Create a new session configuration with the given command.
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Default::default()
        }
    }

    /// Set the command arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Add an environment variable.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set whether to inherit the parent environment.
    #[must_use]
    pub const fn inherit_env(mut self, inherit: bool) -> Self {
        self.inherit_env = inherit;
        self
    }

    /// Set the working directory.
    #[must_use]
    pub fn working_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(path.into());
        self
    }

    /// Set the terminal dimensions.
    #[must_use]
    pub const fn dimensions(mut self, cols: u16, rows: u16) -> Self {
        self.dimensions = Dimensions::new(cols, rows);
        self
    }

    /// Set the default expect timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout.default = timeout;
        self
    }

    /// Set the line ending style.
    #[must_use]
    pub const fn line_ending(mut self, line_ending: LineEnding) -> Self {
        self.line_ending = line_ending;
        self
    }

    /// Set the shutdown strategy used by `close`.
    #[must_use]
    pub const fn shutdown(mut self, strategy: ShutdownStrategy) -> Self {
        self.shutdown = strategy;
        self
    }

    /// Write a raw transcript to `path`.
    #[must_use]
    pub fn transcript(mut self, path: impl Into<PathBuf>) -> Self {
        self.transcript = Some(path.into());
        self
    }

    /// Apply `TERMPROBE_*` overrides from the process environment.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        EnvConfig::default().apply(self)
    }

    /// The PTY-level configuration for spawning this session's child.
    #[must_use]
    pub fn pty_config(&self) -> termprobe_pty::PtyConfig {
        let mut builder = termprobe_pty::PtyConfig::builder()
            .window_size(self.dimensions.cols, self.dimensions.rows);

        if !self.inherit_env {
            builder = builder.env_clear();
        }
        for (key, value) in &self.env {
            builder = builder.env(key, value);
        }
        if let Some(dir) = &self.working_dir {
            builder = builder.working_directory(dir);
        }

        builder.build()
    }
}

/// Configuration for timeouts.
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    /// Default timeout for expect operations.
    pub default: Duration,

    /// How long a polite termination may take before escalating.
    pub terminate_grace: Duration,

    /// Upper bound on one blocking read inside an expect.
    ///
    /// Between reads the engine checks whether the child has exited.
    pub poll_interval: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            default: DEFAULT_TIMEOUT,
            terminate_grace: DEFAULT_TERMINATE_GRACE,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl TimeoutConfig {
    /// Create a new timeout configuration with the given default timeout.
    #[must_use]
    pub fn new(default: Duration) -> Self {
        Self {
            default,
            ..Default::default()
        }
    }

    /// Set the termination grace period.
    #[must_use]
    pub const fn terminate_grace(mut self, grace: Duration) -> Self {
        self.terminate_grace = grace;
        self
    }

    /// Set the poll interval.
    #[must_use]
    pub const fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

/// Line ending styles.
///
/// The terminal line discipline maps a typed CR to LF for the child, so
/// either works as "Enter" on a default PTY.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    /// Line feed.
    #[default]
    Lf,

    /// Carriage return followed by line feed.
    CrLf,

    /// Carriage return.
    Cr,
}

impl LineEnding {
    /// Get the line ending as a string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
            Self::Cr => "\r",
        }
    }

    /// Get the line ending as bytes.
    #[must_use]
    pub const fn as_bytes(self) -> &'static [u8] {
        self.as_str().as_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.timeout.default, DEFAULT_TIMEOUT);
        assert_eq!(config.line_ending, LineEnding::Lf);
        assert_eq!(config.env.get("TERM").map(String::as_str), Some(DEFAULT_TERM));
        assert!(config.transcript.is_none());
    }

    #[test]
    fn builder_methods() {
        let config = SessionConfig::new("/bin/sh")
            .args(["-i"])
            .env("LANG", "C")
            .working_dir("/tmp")
            .dimensions(100, 30)
            .timeout(Duration::from_secs(5))
            .line_ending(LineEnding::CrLf);

        assert_eq!(config.command, "/bin/sh");
        assert_eq!(config.args, vec!["-i"]);
        assert_eq!(config.dimensions, Dimensions::new(100, 30));
        assert_eq!(config.timeout.default, Duration::from_secs(5));
        assert_eq!(config.line_ending.as_bytes(), b"\r\n");
    }

    #[test]
    fn pty_config_carries_env_and_size() {
        let config = SessionConfig::new("sh")
            .inherit_env(false)
            .env("FOO", "bar")
            .dimensions(132, 43);

        let pty = config.pty_config();
        assert_eq!(pty.window_size, (132, 43));

        let env = pty.effective_env();
        assert_eq!(env.get(std::ffi::OsStr::new("FOO")).and_then(|v| v.to_str()), Some("bar"));
        assert!(env.contains_key(std::ffi::OsStr::new("TERM")));
        assert!(!env.contains_key(std::ffi::OsStr::new("PATH")));
    }
}
