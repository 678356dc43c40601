//! Server listener: accept loop with per-connection receiver sessions.

use crate::config::SessionConfig;
use crate::report::{ReportEvent, ReportSink};
use crate::session::TransferSession;
use crate::units::ReportFormat;
use simpleperf_transport::{ConnectionHandle, StreamListener, TransportConfig, TransportResult};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

/// Pause after a failed `accept`, so a persistent error (e.g. out of file
/// descriptors) does not spin the loop.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Accepts clients and runs one independent receiver session per connection.
///
/// Sessions share nothing but the report sink; statistics are always per
/// connection.
pub struct ServerListener {
    listener: StreamListener,
    bind_addr: SocketAddr,
    format: ReportFormat,
    sink: Arc<dyn ReportSink>,
}

impl ServerListener {
    /// Bind to `addr`.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::BindFailed` if the address is unavailable.
    pub async fn bind(
        addr: SocketAddr,
        format: ReportFormat,
        sink: Arc<dyn ReportSink>,
    ) -> TransportResult<Self> {
        let listener = StreamListener::bind(addr, &TransportConfig::default()).await?;
        let bind_addr = listener.local_addr()?;

        Ok(Self {
            listener,
            bind_addr,
            format,
            sink,
        })
    }

    /// Address actually bound (resolves port `0`)
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.bind_addr
    }

    /// Accept clients until the process is interrupted.
    pub async fn serve(self) {
        self.serve_with_shutdown(std::future::pending()).await;
    }

    /// Accept clients until `shutdown` resolves.
    ///
    /// Sessions still running when `shutdown` resolves are left to finish
    /// on their own or be dropped with the runtime.
    pub async fn serve_with_shutdown<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        self.sink.emit(ReportEvent::Listening {
            port: self.bind_addr.port(),
        });
        tracing::info!("Server listening on {}", self.bind_addr);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Server on {} shutting down", self.bind_addr);
                    break;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok(conn) => self.dispatch(conn),
                    Err(e) => {
                        tracing::warn!("Accept failed: {}", e);
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                },
            }
        }
    }

    fn dispatch(&self, conn: ConnectionHandle) {
        let config = SessionConfig::receiver(self.bind_addr.ip().to_string(), self.bind_addr.port())
            .with_format(self.format);
        let session = TransferSession::new(config, Arc::clone(&self.sink));
        let peer = conn.peer_addr();

        tokio::spawn(async move {
            if let Err(e) = session.run_receiver(conn).await {
                tracing::warn!("Session with {} failed: {}", peer, e);
            }
        });
    }
}
