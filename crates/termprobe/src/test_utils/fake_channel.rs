//! Scripted channel for unit testing.
//!
//! A [`FakeChannel`] replays a script of output chunks, pauses, end of
//! stream and exit, and records what was written to it and how it was
//! terminated.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::channel::{Channel, ReadStatus};
use crate::error::{ExpectError, Result};
use crate::types::ProcessExitStatus;

const FAKE_PID: u32 = 999_999;

#[derive(Debug)]
enum Step {
    Output(Vec<u8>),
    Delay(Duration),
    Eof,
    Exit(i32),
}

#[derive(Debug, Default)]
struct Log {
    written: Vec<u8>,
    terminate_calls: Vec<bool>,
    dropped: bool,
}

/// A channel that plays back a script.
#[derive(Debug)]
pub struct FakeChannel {
    script: VecDeque<Step>,
    eof: bool,
    exit: Option<ProcessExitStatus>,
    closed: bool,
    ignore_polite: bool,
    exit_on_input: Option<(u8, i32)>,
    log: Arc<Mutex<Log>>,
}

/// Read-only view of a [`FakeChannel`]'s log that outlives the channel.
#[derive(Debug, Clone)]
pub struct FakeProbe {
    log: Arc<Mutex<Log>>,
}

impl FakeProbe {
    fn with_log<T>(&self, f: impl FnOnce(&Log) -> T) -> T {
        f(&self.log.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Everything written to the channel.
    #[must_use]
    pub fn written(&self) -> Vec<u8> {
        self.with_log(|log| log.written.clone())
    }

    /// The `force` flag of every terminate call, in order.
    #[must_use]
    pub fn terminate_calls(&self) -> Vec<bool> {
        self.with_log(|log| log.terminate_calls.clone())
    }

    /// Whether the channel has been dropped.
    #[must_use]
    pub fn dropped(&self) -> bool {
        self.with_log(|log| log.dropped)
    }
}

impl FakeChannel {
    /// A silent, running child with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self {
            script: VecDeque::new(),
            eof: false,
            exit: None,
            closed: false,
            ignore_polite: false,
            exit_on_input: None,
            log: Arc::new(Mutex::new(Log::default())),
        }
    }

    /// Produce `data` as one chunk.
    #[must_use]
    pub fn output(mut self, data: impl AsRef<[u8]>) -> Self {
        self.script.push_back(Step::Output(data.as_ref().to_vec()));
        self
    }

    /// Stay silent for `duration`.
    #[must_use]
    pub fn delay(mut self, duration: Duration) -> Self {
        self.script.push_back(Step::Delay(duration));
        self
    }

    /// Close the stream.
    #[must_use]
    pub fn eof(mut self) -> Self {
        self.script.push_back(Step::Eof);
        self
    }

    /// Exit with `code`, leaving the stream open.
    #[must_use]
    pub fn exit(mut self, code: i32) -> Self {
        self.script.push_back(Step::Exit(code));
        self
    }

    /// Survive polite termination requests; only a forced terminate works.
    #[must_use]
    pub const fn ignore_polite_signals(mut self) -> Self {
        self.ignore_polite = true;
        self
    }

    /// Exit with `code` as soon as `byte` is written.
    #[must_use]
    pub const fn exit_on_input(mut self, byte: u8, code: i32) -> Self {
        self.exit_on_input = Some((byte, code));
        self
    }

    /// A handle on this channel's log.
    #[must_use]
    pub fn probe(&self) -> FakeProbe {
        FakeProbe {
            log: Arc::clone(&self.log),
        }
    }

    /// Everything written so far.
    #[must_use]
    pub fn written(&self) -> Vec<u8> {
        self.probe().written()
    }

    /// The `force` flag of every terminate call so far.
    #[must_use]
    pub fn terminate_calls(&self) -> Vec<bool> {
        self.probe().terminate_calls()
    }

    fn log(&self) -> std::sync::MutexGuard<'_, Log> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for FakeChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl Channel for FakeChannel {
    fn pid(&self) -> u32 {
        FAKE_PID
    }

    async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        if self.closed || self.exit.is_some() {
            return Err(ExpectError::ChannelClosed);
        }
        self.log().written.extend_from_slice(data);
        if let Some((byte, code)) = self.exit_on_input
            && data.contains(&byte)
        {
            self.exit = Some(ProcessExitStatus::Exited(code));
        }
        Ok(())
    }

    async fn read_available(&mut self, buf: &mut [u8], wait: Duration) -> Result<ReadStatus> {
        loop {
            match self.script.pop_front() {
                Some(Step::Output(mut data)) => {
                    let n = data.len().min(buf.len());
                    buf[..n].copy_from_slice(&data[..n]);
                    if n < data.len() {
                        self.script.push_front(Step::Output(data.split_off(n)));
                    }
                    return Ok(ReadStatus::Data(n));
                }
                Some(Step::Delay(duration)) => {
                    if duration <= wait {
                        tokio::time::sleep(duration).await;
                    } else {
                        tokio::time::sleep(wait).await;
                        self.script.push_front(Step::Delay(duration - wait));
                        return Ok(ReadStatus::Pending);
                    }
                }
                Some(Step::Eof) => {
                    self.eof = true;
                    return Ok(ReadStatus::EndOfStream);
                }
                Some(Step::Exit(code)) => {
                    self.exit = Some(ProcessExitStatus::Exited(code));
                }
                None if self.eof || self.closed => return Ok(ReadStatus::EndOfStream),
                None => {
                    tokio::time::sleep(wait).await;
                    return Ok(ReadStatus::Pending);
                }
            }
        }
    }

    fn exit_status(&mut self) -> Result<Option<ProcessExitStatus>> {
        Ok(self.exit)
    }

    async fn terminate(&mut self, force: bool, grace: Duration) -> Result<bool> {
        self.log().terminate_calls.push(force);

        if self.exit.is_none() {
            if force {
                self.exit = Some(ProcessExitStatus::Signaled(libc::SIGKILL));
            } else if self.ignore_polite {
                tokio::time::sleep(grace).await;
                return Ok(false);
            } else {
                self.exit = Some(ProcessExitStatus::Signaled(libc::SIGTERM));
            }
        }

        self.closed = true;
        Ok(true)
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for FakeChannel {
    fn drop(&mut self) {
        self.log().dropped = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_script_in_order() {
        let mut channel = FakeChannel::new().output("abc").eof();
        let mut buf = [0u8; 2];

        assert_eq!(
            channel.read_available(&mut buf, Duration::ZERO).await.expect("read"),
            ReadStatus::Data(2)
        );
        assert_eq!(&buf, b"ab");
        assert_eq!(
            channel.read_available(&mut buf, Duration::ZERO).await.expect("read"),
            ReadStatus::Data(1)
        );
        assert_eq!(
            channel.read_available(&mut buf, Duration::ZERO).await.expect("read"),
            ReadStatus::EndOfStream
        );
    }

    #[tokio::test]
    async fn long_delay_reads_pending() {
        let mut channel = FakeChannel::new()
            .delay(Duration::from_secs(60))
            .output("late");
        let status = channel
            .read_available(&mut [0u8; 8], Duration::from_millis(5))
            .await
            .expect("read");
        assert_eq!(status, ReadStatus::Pending);
    }

    #[tokio::test]
    async fn writes_after_exit_fail() {
        let mut channel = FakeChannel::new().exit(0);
        let _ = channel
            .read_available(&mut [0u8; 8], Duration::ZERO)
            .await
            .expect("read");
        assert_eq!(channel.exit_status().expect("status"), Some(ProcessExitStatus::Exited(0)));
        assert!(channel.write_all(b"x").await.expect_err("closed").is_closed());
    }
}
