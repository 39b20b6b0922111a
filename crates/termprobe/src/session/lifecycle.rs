//! Session shutdown.
//!
//! `close` runs one of the [`ShutdownStrategy`] sequences against the
//! channel. Whatever the strategy, a child that is still running at the end
//! is killed when the channel is dropped.

use std::time::Duration;

use crate::channel::Channel;
use crate::error::Result;
use crate::types::{ControlChar, ProcessExitStatus};

/// Shutdown strategy for closing a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ShutdownStrategy {
    /// Send end-of-input, give the child the grace period to exit on its
    /// own, then escalate.
    Graceful,
    /// Send SIGKILL immediately.
    Kill,
    /// SIGHUP and SIGTERM, then SIGKILL once the grace period runs out.
    #[default]
    Escalating,
}

/// Outcome of a shutdown sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Whether the child is gone.
    pub exited: bool,
    /// Whether SIGKILL was needed.
    pub forced: bool,
    /// Exit status, if the child was reaped.
    pub status: Option<ProcessExitStatus>,
}

/// Run `strategy` against `channel`.
///
/// # Errors
///
/// Returns an error only if signalling or reaping the child fails; a child
/// that already exited is a success.
pub(crate) async fn shutdown<C: Channel>(
    channel: &mut C,
    strategy: ShutdownStrategy,
    grace: Duration,
) -> Result<ShutdownReport> {
    let mut forced = false;

    let exited = match strategy {
        ShutdownStrategy::Kill => {
            forced = true;
            channel.terminate(true, grace).await?
        }
        ShutdownStrategy::Escalating => {
            if channel.terminate(false, grace).await? {
                true
            } else {
                forced = true;
                channel.terminate(true, grace).await?
            }
        }
        ShutdownStrategy::Graceful => {
            // Failure to write just means the child is already on its way out.
            if channel.write_all(&[ControlChar::CtrlD.as_byte()]).await.is_ok()
                && wait_for_exit(channel, grace).await?
            {
                channel.terminate(false, Duration::ZERO).await?
            } else if channel.terminate(false, grace).await? {
                true
            } else {
                forced = true;
                channel.terminate(true, grace).await?
            }
        }
    };

    let status = channel.exit_status()?;
    tracing::debug!(pid = channel.pid(), ?strategy, exited, forced, ?status, "shutdown complete");

    Ok(ShutdownReport {
        exited,
        forced,
        status,
    })
}

/// Poll for the child's exit for at most `grace`.
async fn wait_for_exit<C: Channel>(channel: &mut C, grace: Duration) -> Result<bool> {
    const STEP: Duration = Duration::from_millis(10);

    let deadline = tokio::time::Instant::now() + grace;
    loop {
        if channel.exit_status()?.is_some() {
            return Ok(true);
        }
        if tokio::time::Instant::now() >= deadline {
            return Ok(false);
        }
        tokio::time::sleep(STEP).await;
    }
}
