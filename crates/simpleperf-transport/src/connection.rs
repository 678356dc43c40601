//! Exclusively owned TCP connection.
//!
//! A [`ConnectionHandle`] is opened at session start and released when it is
//! dropped, so every exit path of a session (normal, error, early return)
//! closes the underlying socket.

use crate::TransportConfig;
use crate::error::{TransportError, TransportResult};
use std::io;
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// One live TCP stream, never shared across sessions.
///
/// # Examples
///
/// ```no_run
/// use simpleperf_transport::{ConnectionHandle, TransportConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut conn = ConnectionHandle::connect("127.0.0.1", 8080, &TransportConfig::default()).await?;
/// conn.send_all(b"BYE").await?;
///
/// let mut buf = [0u8; 1000];
/// let n = conn.recv(&mut buf).await?;
/// println!("reply: {:?}", &buf[..n]);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConnectionHandle {
    stream: TcpStream,
    local_addr: SocketAddr,
    peer_addr: SocketAddr,
}

impl ConnectionHandle {
    /// Open a connection to `host:port`.
    ///
    /// `host` may be an IP literal or a resolvable name.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::ConnectFailed`] if resolution or connection
    /// fails, or if `config.connect_timeout` elapses first.
    pub async fn connect(host: &str, port: u16, config: &TransportConfig) -> TransportResult<Self> {
        let connect = TcpStream::connect((host, port));
        let result = match config.connect_timeout {
            Some(limit) => match tokio::time::timeout(limit, connect).await {
                Ok(result) => result,
                Err(_) => Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("no connection within {limit:?}"),
                )),
            },
            None => connect.await,
        };

        let stream = result.map_err(|source| TransportError::ConnectFailed {
            addr: format!("{host}:{port}"),
            source,
        })?;

        tracing::debug!("Connected to {}:{}", host, port);
        Self::from_stream(stream)
    }

    /// Wrap an already established stream (e.g. one returned by `accept`).
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Io`] if the stream addresses cannot be read.
    pub fn from_stream(stream: TcpStream) -> TransportResult<Self> {
        let local_addr = stream.local_addr()?;
        let peer_addr = stream.peer_addr()?;

        Ok(Self {
            stream,
            local_addr,
            peer_addr,
        })
    }

    /// Write the whole buffer.
    ///
    /// Partial writes are retried until every byte is handed to the kernel.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Io`] if the stream fails.
    pub async fn send_all(&mut self, buf: &[u8]) -> TransportResult<()> {
        self.stream.write_all(buf).await?;
        Ok(())
    }

    /// Read at most `buf.len()` bytes.
    ///
    /// Returns the number of bytes read; `0` means the peer closed its side.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Io`] if the stream fails.
    pub async fn recv(&mut self, buf: &mut [u8]) -> TransportResult<usize> {
        Ok(self.stream.read(buf).await?)
    }

    /// Local end of the connection
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Remote end of the connection
    #[must_use]
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StreamListener;
    use std::time::Duration;
    use tokio::time::timeout;

    async fn loopback_pair() -> (ConnectionHandle, ConnectionHandle) {
        let config = TransportConfig::default();
        let listener = StreamListener::bind("127.0.0.1:0".parse().unwrap(), &config)
            .await
            .unwrap();
        let port = listener.local_addr().unwrap().port();

        let (client, server) = tokio::join!(
            ConnectionHandle::connect("127.0.0.1", port, &config),
            listener.accept()
        );
        (client.unwrap(), server.unwrap())
    }

    #[tokio::test]
    async fn test_send_recv() {
        let (mut client, mut server) = loopback_pair().await;

        client.send_all(b"START 1.5\n").await.unwrap();

        let mut buf = [0u8; 64];
        let mut received = 0;
        while received < 10 {
            let n = timeout(Duration::from_secs(1), server.recv(&mut buf[received..]))
                .await
                .expect("Timeout")
                .unwrap();
            received += n;
        }
        assert_eq!(&buf[..10], b"START 1.5\n");
    }

    #[tokio::test]
    async fn test_addresses_mirror() {
        let (client, server) = loopback_pair().await;
        assert_eq!(client.local_addr(), server.peer_addr());
        assert_eq!(client.peer_addr(), server.local_addr());
    }

    #[tokio::test]
    async fn test_recv_zero_after_peer_drop() {
        let (client, mut server) = loopback_pair().await;
        drop(client);

        let mut buf = [0u8; 16];
        let n = timeout(Duration::from_secs(1), server.recv(&mut buf))
            .await
            .expect("Timeout")
            .unwrap();
        assert_eq!(n, 0);
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // Grab a free port, then release it so nothing listens there.
        let port = {
            let l = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            l.local_addr().unwrap().port()
        };

        let err = ConnectionHandle::connect("127.0.0.1", port, &TransportConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::ConnectFailed { .. }));
    }

    #[tokio::test]
    async fn test_connect_timeout_bounds_wait() {
        // TEST-NET-1 is never routed; the attempt either hangs until the
        // timeout or fails at once with "unreachable".
        let config = TransportConfig::default().with_connect_timeout(Duration::from_millis(200));

        let result = timeout(
            Duration::from_secs(5),
            ConnectionHandle::connect("192.0.2.1", 9, &config),
        )
        .await
        .expect("connect timeout not applied");
        assert!(matches!(result, Err(TransportError::ConnectFailed { .. })));
    }
}
