//! # simpleperf Transport
//!
//! TCP plumbing for the simpleperf throughput tool.
//!
//! This crate provides:
//! - [`ConnectionHandle`]: exclusive owner of one live TCP stream, with
//!   full-write sends and an optional connect timeout
//! - [`StreamListener`]: a bound TCP listener (address reuse, backlog)
//!   that yields `ConnectionHandle`s
//! - [`TransportConfig`]: connection settings shared by both

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod connection;
pub mod error;
pub mod listener;

use std::time::Duration;

pub use connection::ConnectionHandle;
pub use error::{TransportError, TransportResult};
pub use listener::StreamListener;

/// Default listen backlog
pub const DEFAULT_BACKLOG: i32 = 1024;

/// Transport configuration
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Upper bound on connection establishment (None waits for the OS)
    pub connect_timeout: Option<Duration>,
    /// Listen backlog
    pub backlog: i32,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: None,
            backlog: DEFAULT_BACKLOG,
        }
    }
}

impl TransportConfig {
    /// Set the connection timeout
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }
}
