//! Unix implementation of the PTY layer.
//!
//! - PTY pair allocation via openpt/grantpt/unlockpt
//! - Async master I/O through tokio's `AsyncFd`
//! - Child spawning with a new session and the slave as controlling terminal
//! - A process-wide guard that kills live children on fatal signals and exit

mod child;
mod guard;
mod pty;

use std::ffi::OsStr;

pub use child::{UnixPtyChild, spawn_child};
pub use guard::{install_exit_guard, kill_live_children, live_children};
pub use pty::{UnixPtyMaster, open_slave};

use crate::config::PtyConfig;
use crate::error::Result;

/// Spawn `program` with `args` in a freshly allocated PTY.
///
/// Must be called from within a tokio runtime; the master registers with its
/// reactor.
///
/// # Errors
///
/// Returns an error if the PTY cannot be allocated or the child cannot be
/// started.
pub fn spawn<S, I>(
    program: S,
    args: I,
    config: &PtyConfig,
) -> Result<(UnixPtyMaster, UnixPtyChild)>
where
    S: AsRef<OsStr>,
    I: IntoIterator,
    I::Item: AsRef<OsStr>,
{
    let (master, slave_path) = UnixPtyMaster::open()?;

    master.set_window_size(config.window_size.into())?;

    let slave_fd = open_slave(&slave_path)?;

    // The slave fd is consumed here; only the child keeps it open, so the
    // master reports EOF once the child side is gone.
    let child = spawn_child(slave_fd, program, args, config)?;

    tracing::debug!(pid = child.pid(), slave = %slave_path, "spawned child in pty");

    Ok((master, child))
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncReadExt;

    use super::*;

    #[tokio::test]
    async fn spawn_echo_and_read_output() {
        let config = PtyConfig::default();
        let (mut master, mut child) = spawn("echo", ["hello"], &config).expect("spawn echo");

        let mut collected = Vec::new();
        let mut buf = [0u8; 256];
        loop {
            match master.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => collected.extend_from_slice(&buf[..n]),
                Err(e) => panic!("read failed: {e}"),
            }
        }

        assert!(String::from_utf8_lossy(&collected).contains("hello"));
        let status = child.wait().await.expect("wait");
        assert!(status.success());
    }

    #[tokio::test]
    async fn missing_program_fails_to_spawn() {
        let config = PtyConfig::default();
        let result = spawn("/nonexistent/termprobe-missing", ["x"], &config);
        let err = result.expect_err("spawn should fail");
        assert_eq!(err.raw_os_error(), Some(libc::ENOENT));
    }
}
