//! Test utilities for termprobe.
//!
//! A scripted [`FakeChannel`] for exercising the expect engine and sessions
//! without spawning processes, and a tracing setup for test output.

mod fake_channel;

pub use fake_channel::{FakeChannel, FakeProbe};

/// Install a `tracing` subscriber that writes through the test harness.
///
/// The filter comes from `RUST_LOG` and defaults to `warn`. Safe to call
/// from every test; only the first call installs anything.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
