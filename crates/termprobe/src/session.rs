//! Sessions: one spawned child, driven by sends and expects.
//!
//! # Example
//!
//! ```no_run
//! use termprobe::{PatternSet, Session};
//!
//! # async fn demo() -> termprobe::Result<()> {
//! let mut session = Session::spawn("/bin/sh", Vec::<String>::new()).await?;
//! session.send_line("echo ready").await?;
//! session.expect_strict(&PatternSet::from("ready"), None).await?;
//! session.close().await?;
//! # Ok(())
//! # }
//! ```

mod builder;
mod handle;
mod lifecycle;

pub use builder::{QuickSession, SessionBuilder};
pub use handle::Session;
pub use lifecycle::{ShutdownReport, ShutdownStrategy};
