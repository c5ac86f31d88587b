//! Background jobs.
//!
//! Each submodule exposes a long-running `run` function for `tokio::spawn`
//! that stops when its [`tokio_util::sync::CancellationToken`] fires.

pub mod housekeeping;
