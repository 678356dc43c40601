//! Error types for the simpleperf core.

use simpleperf_transport::TransportError;
use thiserror::Error;

/// Core errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration rejected before any I/O
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Listener or connection setup failed
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A transfer session failed
    #[error("session error: {0}")]
    Session(#[from] SessionError),
}

/// Configuration errors. Raised before any session starts.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Byte limit and time limit given together
    #[error("you cannot use both --num and --time at the same time")]
    ConflictingLimits,

    /// Data size without a `B`, `KB` or `MB` suffix, or with a bad number
    #[error("invalid data size '{0}': use <n>B, <n>KB or <n>MB")]
    InvalidDataSize(String),

    /// Zero, negative or non-integer value where a positive one is required
    #[error("{0} is not a valid positive value")]
    NotPositive(String),

    /// Unknown report format
    #[error("invalid format '{0}': use B, KB or MB")]
    InvalidFormat(String),

    /// Zero parallel connections requested
    #[error("at least one connection is required")]
    NoConnections,

    /// Port outside 1-65535
    #[error("port must be between 1 and 65535")]
    InvalidPort,
}

/// Per-session errors. Never affect sibling sessions.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Could not reach the server
    #[error("connection failed: {0}")]
    Connect(#[source] TransportError),

    /// Stream failed mid-transfer
    #[error("transfer failed: {0}")]
    Transport(#[from] TransportError),

    /// Peer closed the stream before the termination handshake
    #[error("connection closed by peer after {0} bytes")]
    PeerClosed(u64),

    /// Session task panicked or was aborted
    #[error("session aborted: {0}")]
    Aborted(String),
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, Error>;
