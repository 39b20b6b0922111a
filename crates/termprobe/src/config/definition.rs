//! Declarative test definitions loaded from TOML.
//!
//! ```toml
//! command = "./esh -p"
//! args = ["plugins/"]
//! transcript = "session.log"
//! timeout_ms = 5000
//!
//! [env]
//! LANG = "C"
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{LineEnding, SessionConfig};
use crate::error::{ExpectError, Result};
use crate::session::ShutdownStrategy;
use crate::transcript::WriterSink;

/// The program to run: a whitespace-separated line or an explicit argv.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandLine {
    /// `"./esh -p plugins"`, split on whitespace. No quoting rules apply.
    Line(String),
    /// `["./esh", "-p", "plugins"]`.
    Argv(Vec<String>),
}

impl CommandLine {
    /// Program and arguments.
    #[must_use]
    pub fn argv(&self) -> Vec<String> {
        match self {
            Self::Line(line) => line.split_whitespace().map(str::to_string).collect(),
            Self::Argv(argv) => argv.clone(),
        }
    }
}

/// Everything needed to start the program under test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestDefinition {
    /// Program to run.
    pub command: CommandLine,

    /// Arguments appended after those in `command`.
    #[serde(default)]
    pub args: Vec<String>,

    /// Raw transcript file.
    #[serde(default)]
    pub transcript: Option<PathBuf>,

    /// Default expect timeout in milliseconds.
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// Extra environment variables.
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Working directory for the child.
    #[serde(default)]
    pub working_dir: Option<PathBuf>,

    /// Line ending for `send_line`.
    #[serde(default)]
    pub line_ending: Option<LineEnding>,

    /// How `close` stops the child.
    #[serde(default)]
    pub shutdown: Option<ShutdownStrategy>,
}

impl TestDefinition {
    /// Parse a definition from TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ExpectError::Config`] if the TOML is malformed or the
    /// command is empty.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let definition: Self = toml::from_str(text)
            .map_err(|e| ExpectError::config(format!("invalid test definition: {e}")))?;
        if definition.command.argv().is_empty() {
            return Err(ExpectError::config("test definition has an empty command"));
        }
        Ok(definition)
    }

    /// Load a definition from a TOML file.
    ///
    /// Relative `transcript` and `working_dir` paths are resolved against
    /// the file's directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = ExpectError::with_io_context(
            std::fs::read_to_string(path),
            format!("reading test definition {}", path.display()),
        )?;
        let mut definition = Self::from_toml_str(&text)?;

        if let Some(base) = path.parent() {
            for relative in [&mut definition.transcript, &mut definition.working_dir]
                .into_iter()
                .flatten()
            {
                if relative.is_relative() {
                    *relative = base.join(&*relative);
                }
            }
        }

        tracing::debug!(path = %path.display(), command = ?definition.command, "loaded test definition");
        Ok(definition)
    }

    /// The session configuration this definition describes.
    ///
    /// `TERMPROBE_*` environment overrides are applied on top.
    #[must_use]
    pub fn into_session_config(self) -> SessionConfig {
        let mut argv = self.command.argv().into_iter();
        let command = argv.next().unwrap_or_default();

        let mut config = SessionConfig::new(command).args(argv.chain(self.args));
        config.env.extend(self.env);
        config.working_dir = self.working_dir;
        config.transcript = self.transcript;
        if let Some(ms) = self.timeout_ms {
            config.timeout.default = Duration::from_millis(ms);
        }
        if let Some(line_ending) = self.line_ending {
            config.line_ending = line_ending;
        }
        if let Some(shutdown) = self.shutdown {
            config.shutdown = shutdown;
        }

        config.with_env_overrides()
    }

    /// Open the transcript file, if one is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created.
    pub fn open_transcript(&self) -> Result<Option<WriterSink<std::io::BufWriter<std::fs::File>>>> {
        self.transcript
            .as_ref()
            .map(|path| {
                ExpectError::with_io_context(
                    WriterSink::create(path),
                    format!("opening transcript {}", path.display()),
                )
            })
            .transpose()
    }
}
