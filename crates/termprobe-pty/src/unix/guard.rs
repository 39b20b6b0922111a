//! Process-wide cleanup for children that would otherwise outlive the harness.
//!
//! Destructors cover ordinary exits and panics. They do not run when the
//! harness is killed by a terminating signal or leaves through
//! `std::process::exit`, so every live child is also tracked here, and
//! [`install_exit_guard`] hooks both of those paths.

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, OnceLock, PoisonError, TryLockError};

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::Signals;

use super::child::send_signal;

/// pid -> whether the pid leads its own process group
fn registry() -> &'static Mutex<HashMap<u32, bool>> {
    static LIVE: OnceLock<Mutex<HashMap<u32, bool>>> = OnceLock::new();
    LIVE.get_or_init(|| Mutex::new(HashMap::new()))
}

static INSTALLED: AtomicBool = AtomicBool::new(false);

pub(crate) fn register(pid: u32, owns_group: bool) {
    registry()
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(pid, owns_group);
}

pub(crate) fn unregister(pid: u32) {
    registry()
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .remove(&pid);
}

/// Pids of every child spawned by this process that has not been reaped.
#[must_use]
pub fn live_children() -> Vec<u32> {
    let mut pids: Vec<u32> = registry()
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .keys()
        .copied()
        .collect();
    pids.sort_unstable();
    pids
}

/// SIGKILL every live child (and its process group). Returns how many were signalled.
pub fn kill_live_children() -> usize {
    let live = snapshot(&registry().lock().unwrap_or_else(PoisonError::into_inner));
    signal_all(&live)
}

/// Like [`kill_live_children`], but gives up instead of waiting when the
/// registry is locked. `None` means nothing was signalled.
fn try_kill_live_children() -> Option<usize> {
    let live = match registry().try_lock() {
        Ok(map) => snapshot(&map),
        Err(TryLockError::Poisoned(poisoned)) => snapshot(&poisoned.into_inner()),
        Err(TryLockError::WouldBlock) => return None,
    };
    Some(signal_all(&live))
}

fn snapshot(map: &HashMap<u32, bool>) -> Vec<(u32, bool)> {
    map.iter().map(|(pid, group)| (*pid, *group)).collect()
}

fn signal_all(live: &[(u32, bool)]) -> usize {
    live.iter()
        .filter(|(pid, group)| send_signal(*pid, *group, libc::SIGKILL).is_ok())
        .count()
}

// Runs inside `exit`. A thread parked in `register` may hold the lock and
// will never release it, so this must not block.
extern "C" fn kill_on_exit() {
    let _ = try_kill_live_children();
}

/// Kill live children when the harness exits abnormally.
///
/// Installs, once per process, a handler thread for SIGINT, SIGTERM, SIGHUP
/// and SIGQUIT that kills every live child and then performs the signal's
/// default action, and an `atexit` hook that kills them on
/// `std::process::exit`. Later calls are no-ops.
///
/// # Errors
///
/// Returns an error if signal registration or the handler thread fails.
pub fn install_exit_guard() -> io::Result<()> {
    if INSTALLED.swap(true, Ordering::SeqCst) {
        return Ok(());
    }

    let result = install();
    if result.is_err() {
        INSTALLED.store(false, Ordering::SeqCst);
    }
    result
}

fn install() -> io::Result<()> {
    let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP, SIGQUIT])?;

    std::thread::Builder::new()
        .name("termprobe-exit-guard".into())
        .spawn(move || {
            for signal in signals.forever() {
                let killed = kill_live_children();
                tracing::debug!(signal, killed, "fatal signal, killed live children");
                if let Err(e) = signal_hook::low_level::emulate_default_handler(signal) {
                    tracing::warn!(signal, error = %e, "could not re-raise signal");
                }
            }
        })?;

    // SAFETY: `kill_on_exit` is a plain extern "C" function that never unwinds.
    #[allow(unsafe_code)]
    let rc = unsafe { libc::atexit(kill_on_exit) };
    if rc != 0 {
        return Err(io::Error::other("atexit registration failed"));
    }

    tracing::debug!("exit guard installed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_unregister() {
        let pid = u32::MAX - 7;
        register(pid, false);
        assert!(live_children().contains(&pid));
        unregister(pid);
        assert!(!live_children().contains(&pid));
    }

    #[test]
    fn exit_path_skips_a_held_registry() {
        let held = registry().lock().unwrap_or_else(PoisonError::into_inner);
        assert_eq!(try_kill_live_children(), None);
        drop(held);
    }

    #[test]
    fn install_is_idempotent() {
        install_exit_guard().expect("first install");
        install_exit_guard().expect("second install");
    }
}
