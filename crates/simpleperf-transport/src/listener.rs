//! TCP listener producing [`ConnectionHandle`]s.

use crate::TransportConfig;
use crate::connection::ConnectionHandle;
use crate::error::{TransportError, TransportResult};
use std::net::SocketAddr;
use tokio::net::TcpListener;

/// A bound, listening TCP socket.
pub struct StreamListener {
    listener: TcpListener,
}

impl StreamListener {
    /// Bind and listen on `addr`.
    ///
    /// The socket is created through `socket2` so address reuse and the
    /// backlog are applied explicitly. Port `0` picks a free port.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::BindFailed`] if the address is unavailable
    /// or the socket cannot be configured.
    pub async fn bind(addr: SocketAddr, config: &TransportConfig) -> TransportResult<Self> {
        let bind_failed = |source| TransportError::BindFailed { addr, source };

        let domain = if addr.is_ipv4() {
            socket2::Domain::IPV4
        } else {
            socket2::Domain::IPV6
        };

        let socket =
            socket2::Socket::new(domain, socket2::Type::STREAM, Some(socket2::Protocol::TCP))
                .map_err(bind_failed)?;

        socket.set_reuse_address(true).map_err(bind_failed)?;

        socket.bind(&addr.into()).map_err(bind_failed)?;
        socket.listen(config.backlog).map_err(bind_failed)?;

        // Convert to std listener, then to tokio listener
        socket.set_nonblocking(true).map_err(bind_failed)?;
        let std_listener: std::net::TcpListener = socket.into();
        let listener = TcpListener::from_std(std_listener).map_err(bind_failed)?;

        tracing::debug!("Listening on {}", addr);

        Ok(Self { listener })
    }

    /// Wait for the next inbound connection.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Io`] if `accept` fails or the accepted
    /// stream has no addresses.
    pub async fn accept(&self) -> TransportResult<ConnectionHandle> {
        let (stream, peer) = self.listener.accept().await?;
        tracing::trace!("Accepted connection from {}", peer);
        ConnectionHandle::from_stream(stream)
    }

    /// Address the listener is bound to
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Io`] if the address cannot be determined.
    pub fn local_addr(&self) -> TransportResult<SocketAddr> {
        self.listener.local_addr().map_err(TransportError::Io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bind_ephemeral_port() {
        let listener = StreamListener::bind("127.0.0.1:0".parse().unwrap(), &TransportConfig::default())
            .await
            .unwrap();
        let addr = listener.local_addr().unwrap();
        assert_ne!(addr.port(), 0);
        assert!(addr.is_ipv4());
    }

    #[tokio::test]
    async fn test_bind_in_use_fails() {
        let config = TransportConfig::default();
        let first = StreamListener::bind("127.0.0.1:0".parse().unwrap(), &config)
            .await
            .unwrap();
        let taken = first.local_addr().unwrap();

        let err = match StreamListener::bind(taken, &config).await {
            Ok(_) => panic!("second bind on {taken} succeeded"),
            Err(e) => e,
        };
        assert!(matches!(err, TransportError::BindFailed { addr, .. } if addr == taken));
    }
}
