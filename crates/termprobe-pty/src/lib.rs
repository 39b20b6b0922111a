//! termprobe-pty: async Unix pseudo-terminal layer
//!
//! This crate allocates pseudo-terminal pairs, spawns child processes with the
//! slave side as their controlling terminal, and exposes the master side as
//! async byte streams. It is the process-facing half of `termprobe`.
//!
//! # Quick Start
//!
//! ```ignore
//! use termprobe_pty::{PtyConfig, spawn};
//! use tokio::io::{AsyncReadExt, AsyncWriteExt};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PtyConfig::default();
//!     let (mut master, mut child) = spawn("/bin/sh", ["-i"], &config)?;
//!
//!     master.write_all(b"echo hello\n").await?;
//!
//!     let mut buf = [0u8; 1024];
//!     let n = master.read(&mut buf).await?;
//!     println!("{}", String::from_utf8_lossy(&buf[..n]));
//!
//!     child.kill()?;
//!     Ok(())
//! }
//! ```
//!
//! # Cleanup
//!
//! Every [`UnixPtyChild`] kills its process group when dropped. Processes that
//! would survive an abrupt exit of the harness (a fatal signal, or
//! `std::process::exit` skipping destructors) are covered by
//! [`install_exit_guard`].

#![cfg(unix)]

pub mod config;
pub mod error;
pub mod status;
pub mod unix;

// Re-export primary types
pub use config::{PtyConfig, PtyConfigBuilder, PtySignal, WindowSize};
pub use error::{PtyError, Result};
pub use status::ExitStatus;
pub use unix::{
    UnixPtyChild, UnixPtyMaster, install_exit_guard, kill_live_children, live_children, spawn,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = PtyConfig::default();
        assert_eq!(config.window_size, (80, 24));
        assert!(config.new_session);
        assert!(config.controlling_terminal);
    }

    #[tokio::test]
    async fn spawn_true_exits_cleanly() {
        let config = PtyConfig::default();
        let (_master, mut child) =
            spawn("true", std::iter::empty::<&str>(), &config).expect("spawn true");
        let status = child.wait().await.expect("wait");
        assert!(status.success());
    }
}
