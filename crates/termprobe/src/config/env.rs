//! Environment-based configuration overrides.
//!
//! | variable | effect |
//! |----------|--------|
//! | `TERMPROBE_TIMEOUT_MS` | default expect timeout |
//! | `TERMPROBE_POLL_MS` | expect poll interval |
//! | `TERMPROBE_GRACE_MS` | termination grace period |
//! | `TERMPROBE_TRANSCRIPT` | raw transcript path |

use std::path::PathBuf;
use std::time::Duration;

use super::SessionConfig;

/// Environment configuration prefix.
pub const DEFAULT_PREFIX: &str = "TERMPROBE";

/// Environment variable reader.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    prefix: String,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

impl EnvConfig {
    /// Create a reader for variables named `<prefix>_<NAME>`.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn var_name(&self, name: &str) -> String {
        if self.prefix.is_empty() {
            name.to_uppercase()
        } else {
            format!("{}_{}", self.prefix, name.to_uppercase())
        }
    }

    /// Get a string value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<String> {
        std::env::var(self.var_name(name))
            .ok()
            .filter(|v| !v.is_empty())
    }

    /// Get a parsed value, ignoring values that fail to parse.
    #[must_use]
    pub fn parse<T: std::str::FromStr>(&self, name: &str) -> Option<T> {
        let raw = self.get(name)?;
        match raw.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(var = %self.var_name(name), value = %raw, "ignoring unparsable override");
                None
            }
        }
    }

    /// Get a boolean value.
    #[must_use]
    pub fn bool(&self, name: &str) -> Option<bool> {
        self.get(name).map(|v| {
            matches!(
                v.to_lowercase().as_str(),
                "1" | "true" | "yes" | "on" | "enabled"
            )
        })
    }

    /// Get a duration in milliseconds.
    #[must_use]
    pub fn duration_millis(&self, name: &str) -> Option<Duration> {
        self.parse::<u64>(name).map(Duration::from_millis)
    }

    /// Apply every override that is set.
    #[must_use]
    pub fn apply(&self, mut config: SessionConfig) -> SessionConfig {
        if let Some(timeout) = self.duration_millis("TIMEOUT_MS") {
            config.timeout.default = timeout;
        }
        if let Some(poll) = self.duration_millis("POLL_MS") {
            config.timeout.poll_interval = poll;
        }
        if let Some(grace) = self.duration_millis("GRACE_MS") {
            config.timeout.terminate_grace = grace;
        }
        if let Some(path) = self.get("TRANSCRIPT") {
            config.transcript = Some(PathBuf::from(path));
        }
        config
    }
}
