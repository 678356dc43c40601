//! Transport layer errors.

use std::io;
use std::net::SocketAddr;

/// Transport layer errors
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// I/O error on an established stream
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Address binding failed
    #[error("failed to bind to {addr}: {source}")]
    BindFailed {
        /// Address that could not be bound
        addr: SocketAddr,
        /// Underlying OS error
        source: io::Error,
    },

    /// Connection could not be established
    #[error("failed to connect to {addr}: {source}")]
    ConnectFailed {
        /// Target as given by the caller
        addr: String,
        /// Underlying OS error (TimedOut when the connect timeout elapsed)
        source: io::Error,
    },
}

/// Result type for transport operations
pub type TransportResult<T> = Result<T, TransportError>;
