//! Child process spawning and control.
//!
//! A child is spawned through `tokio::process::Command` with the PTY slave as
//! its standard streams. When `new_session` is set it becomes a session and
//! process-group leader, so signals are delivered to the whole group and
//! grandchildren started by a shell are cleaned up with it.

use std::ffi::OsStr;
use std::io;
use std::os::unix::io::OwnedFd;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rustix::process::{Pid, Signal, kill_process, kill_process_group};
use tokio::process::{Child as TokioChild, Command};
use tokio::sync::Mutex;

use super::guard;
use crate::config::{PtyConfig, PtySignal};
use crate::error::{PtyError, Result};
use crate::status::ExitStatus;

/// How long `Drop` waits for a killed child to become reapable.
const DROP_REAP_ATTEMPTS: u32 = 100;
const DROP_REAP_INTERVAL: Duration = Duration::from_millis(1);

/// Handle for a process running on a PTY slave.
///
/// Dropping the handle kills the child (and its process group, if it leads
/// one) unless it has already been reaped.
pub struct UnixPtyChild {
    child: Mutex<TokioChild>,
    pid: u32,
    owns_group: bool,
    running: AtomicBool,
    exit_status: Option<ExitStatus>,
}

impl std::fmt::Debug for UnixPtyChild {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnixPtyChild")
            .field("pid", &self.pid)
            .field("owns_group", &self.owns_group)
            .field("running", &self.is_running())
            .field("exit_status", &self.exit_status)
            .finish()
    }
}

impl UnixPtyChild {
    fn new(child: TokioChild, owns_group: bool) -> Result<Self> {
        let pid = child.id().ok_or_else(|| {
            PtyError::Spawn(io::Error::other("child exited before its pid was read"))
        })?;
        guard::register(pid, owns_group);

        Ok(Self {
            child: Mutex::new(child),
            pid,
            owns_group,
            running: AtomicBool::new(true),
            exit_status: None,
        })
    }

    /// Get the process ID.
    #[must_use]
    pub const fn pid(&self) -> u32 {
        self.pid
    }

    /// Whether the child leads its own process group.
    #[must_use]
    pub const fn owns_group(&self) -> bool {
        self.owns_group
    }

    /// Check if the process is still running (not yet reaped).
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// The exit status, if the child has been reaped.
    #[must_use]
    pub const fn exit_status(&self) -> Option<ExitStatus> {
        self.exit_status
    }

    fn record_exit(&mut self, status: ExitStatus) -> ExitStatus {
        self.running.store(false, Ordering::SeqCst);
        self.exit_status = Some(status);
        guard::unregister(self.pid);
        tracing::debug!(pid = self.pid, %status, "child reaped");
        status
    }

    /// Wait for the child process to exit.
    pub async fn wait(&mut self) -> Result<ExitStatus> {
        if let Some(status) = self.exit_status {
            return Ok(status);
        }

        let status = self
            .child
            .get_mut()
            .wait()
            .await
            .map_err(PtyError::Wait)?;
        Ok(self.record_exit(status.into()))
    }

    /// Reap the child if it has exited, without blocking.
    pub fn try_wait(&mut self) -> Result<Option<ExitStatus>> {
        if let Some(status) = self.exit_status {
            return Ok(Some(status));
        }

        match self.child.get_mut().try_wait().map_err(PtyError::Wait)? {
            Some(status) => Ok(Some(self.record_exit(status.into()))),
            None => Ok(None),
        }
    }

    /// Send a signal to the child, or to its process group when it leads one.
    ///
    /// # Errors
    ///
    /// Returns [`PtyError::ProcessExited`] if the child was already reaped.
    pub fn signal(&self, signal: PtySignal) -> Result<()> {
        if !self.is_running() {
            return Err(PtyError::ProcessExited);
        }

        send_signal(self.pid, self.owns_group, signal.as_raw()).map_err(PtyError::Signal)
    }

    /// Kill the child process (SIGKILL).
    pub fn kill(&mut self) -> Result<()> {
        self.signal(PtySignal::Kill)
    }
}

impl Drop for UnixPtyChild {
    fn drop(&mut self) {
        if !self.is_running() {
            return;
        }

        if let Err(e) = send_signal(self.pid, self.owns_group, libc::SIGKILL) {
            tracing::trace!(pid = self.pid, error = %e, "kill on drop failed");
        }

        let child = self.child.get_mut();
        for _ in 0..DROP_REAP_ATTEMPTS {
            match child.try_wait() {
                Ok(Some(_)) | Err(_) => break,
                Ok(None) => std::thread::sleep(DROP_REAP_INTERVAL),
            }
        }

        guard::unregister(self.pid);
        tracing::debug!(pid = self.pid, "child killed on drop");
    }
}

/// Deliver `signal` to `pid`, or to the process group it leads.
///
/// A process that is already gone is not an error.
pub(crate) fn send_signal(pid: u32, owns_group: bool, signal: i32) -> io::Result<()> {
    let pid = i32::try_from(pid)
        .ok()
        .and_then(Pid::from_raw)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "invalid pid"))?;
    let signal = Signal::from_named_raw(signal)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "invalid signal"))?;

    let result = if owns_group {
        kill_process_group(pid, signal)
    } else {
        kill_process(pid, signal)
    };

    match result {
        Ok(()) | Err(rustix::io::Errno::SRCH) => Ok(()),
        Err(e) => Err(io::Error::from_raw_os_error(e.raw_os_error())),
    }
}

/// Spawn `program` with the PTY slave as stdin, stdout and stderr.
///
/// With `new_session` the child calls `setsid`; with `controlling_terminal`
/// as well, the slave becomes its controlling terminal so job control and
/// terminal signals behave as in an interactive login.
pub fn spawn_child<S, I>(
    slave_fd: OwnedFd,
    program: S,
    args: I,
    config: &PtyConfig,
) -> Result<UnixPtyChild>
where
    S: AsRef<OsStr>,
    I: IntoIterator,
    I::Item: AsRef<OsStr>,
{
    let mut cmd = Command::new(program.as_ref());
    cmd.args(args);
    cmd.env_clear();
    cmd.envs(config.effective_env());

    if let Some(ref dir) = config.working_directory {
        cmd.current_dir(dir);
    }

    cmd.stdin(Stdio::from(slave_fd.try_clone().map_err(PtyError::Spawn)?));
    cmd.stdout(Stdio::from(slave_fd.try_clone().map_err(PtyError::Spawn)?));
    cmd.stderr(Stdio::from(slave_fd));

    let new_session = config.new_session;
    let controlling_terminal = config.new_session && config.controlling_terminal;
    let death_signal = config.parent_death_signal.map(PtySignal::as_raw);

    // SAFETY: the hook runs between fork and exec and only calls
    // async-signal-safe functions (setsid, ioctl, prctl).
    #[allow(unsafe_code)]
    unsafe {
        cmd.pre_exec(move || {
            if new_session && libc::setsid() == -1 {
                return Err(io::Error::last_os_error());
            }

            // stdin is already the slave at this point
            if controlling_terminal && libc::ioctl(0, libc::TIOCSCTTY as _, 0) == -1 {
                return Err(io::Error::last_os_error());
            }

            #[cfg(target_os = "linux")]
            if let Some(signal) = death_signal {
                if libc::prctl(libc::PR_SET_PDEATHSIG, signal) == -1 {
                    return Err(io::Error::last_os_error());
                }
            }
            #[cfg(not(target_os = "linux"))]
            let _ = death_signal;

            Ok(())
        });
    }

    let child = cmd.spawn().map_err(PtyError::Spawn)?;

    UnixPtyChild::new(child, new_session)
}
