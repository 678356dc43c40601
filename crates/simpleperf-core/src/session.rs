//! Transfer session state machine.
//!
//! A sender connects, announces itself with `START`, pushes filler chunks
//! until its [`StopCondition`] is met, then runs the `BYE` / `ACK: BYE`
//! exchange. A receiver counts everything it reads until a read returns
//! exactly `BYE`, acknowledges, and reports.
//!
//! ```text
//! Sender:   Connecting -> Connected -> Sending -> Quiescing -> AwaitingAck -> Done
//!               |                                                  |
//!               +-> ConnectionFailed                               +-> HandshakeMismatch
//!
//! Receiver: Receiving -> (BYE) -> Acknowledged -> Done
//!               |
//!               +-> PeerClosed
//! ```
//!
//! Each session owns its [`ConnectionHandle`]; dropping the session's future
//! or returning early closes the socket.

use crate::config::{Role, SessionConfig, StopCondition};
use crate::error::SessionError;
use crate::handshake::{self, CHUNK_SIZE};
use crate::report::{ReportEvent, ReportSink};
use crate::reporter::IntervalReporter;
use crate::stats::{TransferStats, TransferSummary};
use simpleperf_transport::{ConnectionHandle, TransportConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Instant, SystemTime};

/// How a session that did not fail ended
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    /// Handshake succeeded; the summary was emitted
    Completed(TransferSummary),
    /// Reply to `BYE` was missing or wrong; no summary was emitted
    HandshakeMismatch,
}

impl SessionOutcome {
    /// Summary of a completed session
    #[must_use]
    pub fn summary(&self) -> Option<&TransferSummary> {
        match self {
            Self::Completed(summary) => Some(summary),
            Self::HandshakeMismatch => None,
        }
    }
}

/// One end-to-end transfer over one connection
pub struct TransferSession {
    config: SessionConfig,
    sink: Arc<dyn ReportSink>,
    transport: TransportConfig,
}

impl TransferSession {
    /// Create a session reporting to `sink`
    #[must_use]
    pub fn new(config: SessionConfig, sink: Arc<dyn ReportSink>) -> Self {
        Self {
            config,
            sink,
            transport: TransportConfig::default(),
        }
    }

    /// Use `transport` for connection setup
    #[must_use]
    pub fn with_transport_config(mut self, transport: TransportConfig) -> Self {
        self.transport = transport;
        self
    }

    /// Run the client side of a transfer.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Connect`] if the server cannot be reached (a
    /// `ConnectionFailed` event is emitted first), or
    /// [`SessionError::Transport`] if the stream fails mid-transfer.
    pub async fn run_sender(&self) -> Result<SessionOutcome, SessionError> {
        let cfg = &self.config;
        let id = cfg.connection_id;

        self.sink.emit(ReportEvent::Connecting {
            connection_id: id,
            server: cfg.peer_address.clone(),
            port: cfg.port,
        });

        let mut conn =
            match ConnectionHandle::connect(&cfg.peer_address, cfg.port, &self.transport).await {
                Ok(conn) => conn,
                Err(e) => {
                    tracing::warn!("Session {} could not connect: {}", id, e);
                    self.sink.emit(ReportEvent::ConnectionFailed {
                        connection_id: id,
                        server: cfg.peer_address.clone(),
                        port: cfg.port,
                    });
                    return Err(SessionError::Connect(e));
                }
            };

        self.sink.emit(ReportEvent::Connected {
            connection_id: id,
            server: cfg.peer_address.clone(),
            port: cfg.port,
        });

        let started_at = Instant::now();
        conn.send_all(handshake::start_message(SystemTime::now()).as_bytes())
            .await?;

        let mut stats = TransferStats::starting_at(started_at);
        let mut reporter = cfg
            .report_interval
            .map(|interval| IntervalReporter::new(interval, started_at));

        self.send_payload(&mut conn, &mut stats, reporter.as_mut())
            .await?;
        tracing::debug!(
            "Session {} sent {} bytes in {} chunks",
            id,
            stats.bytes_moved(),
            stats.chunks()
        );

        tokio::time::sleep(handshake::QUIESCENCE).await;
        if let Err(e) = conn.send_all(handshake::BYE).await {
            tracing::warn!("Session {}: sending BYE failed: {}", id, e);
            return Ok(SessionOutcome::HandshakeMismatch);
        }

        if !self.await_ack(&mut conn).await {
            return Ok(SessionOutcome::HandshakeMismatch);
        }

        stats.finish();
        let summary = TransferSummary::from_stats(
            Role::Sender,
            conn.local_addr(),
            id,
            &stats,
            cfg.report_format,
        );
        tracing::info!(
            "Session {} complete: {} bytes in {:.3}s",
            id,
            summary.bytes,
            summary.elapsed.as_secs_f64()
        );
        self.sink.emit(ReportEvent::Summary(summary.clone()));

        Ok(SessionOutcome::Completed(summary))
    }

    /// Run the server side of a transfer on an accepted connection.
    ///
    /// Every byte read counts toward the total, including the `START` line
    /// and the sentinel.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::PeerClosed`] if the client disconnects before
    /// `BYE`, or [`SessionError::Transport`] if the stream fails.
    pub async fn run_receiver(
        &self,
        mut conn: ConnectionHandle,
    ) -> Result<SessionOutcome, SessionError> {
        let peer = conn.peer_addr();
        self.sink.emit(ReportEvent::ClientAccepted {
            peer,
            local: conn.local_addr(),
        });

        let mut stats = TransferStats::new();
        let mut buf = vec![0u8; CHUNK_SIZE];

        loop {
            let n = conn.recv(&mut buf).await?;
            if n == 0 {
                tracing::warn!(
                    "Client {} closed the connection before BYE ({} bytes)",
                    peer,
                    stats.bytes_moved()
                );
                return Err(SessionError::PeerClosed(stats.bytes_moved()));
            }

            let chunk = &buf[..n];
            if stats.chunks() == 0 {
                if let Some(started) = handshake::parse_start_message(chunk) {
                    tracing::debug!("Client {} started at {:.6}", peer, started);
                }
            }
            stats.record(n);

            if handshake::is_bye(chunk) {
                conn.send_all(handshake::ACK_BYE).await?;
                break;
            }
        }

        stats.finish();
        let summary = TransferSummary::from_stats(
            Role::Receiver,
            peer,
            self.config.connection_id,
            &stats,
            self.config.report_format,
        );
        tracing::info!("Client {} done: {} bytes", peer, summary.bytes);
        self.sink.emit(ReportEvent::Summary(summary.clone()));

        Ok(SessionOutcome::Completed(summary))
    }

    async fn send_payload(
        &self,
        conn: &mut ConnectionHandle,
        stats: &mut TransferStats,
        mut reporter: Option<&mut IntervalReporter>,
    ) -> Result<(), SessionError> {
        let chunk = [handshake::FILLER; CHUNK_SIZE];
        let identity = conn.local_addr();

        match self.config.stop_condition() {
            StopCondition::Bytes(limit) => {
                while stats.bytes_moved() < limit {
                    let len = (limit - stats.bytes_moved()).min(CHUNK_SIZE as u64) as usize;
                    conn.send_all(&chunk[..len]).await?;
                    stats.record(len);
                    self.report_interval(reporter.as_deref_mut(), identity, stats);
                }
            }
            StopCondition::Deadline(limit) => {
                let deadline = stats.started_at() + limit;
                while Instant::now() < deadline {
                    conn.send_all(&chunk).await?;
                    stats.record(CHUNK_SIZE);
                    self.report_interval(reporter.as_deref_mut(), identity, stats);
                }
            }
        }

        Ok(())
    }

    fn report_interval(
        &self,
        reporter: Option<&mut IntervalReporter>,
        identity: SocketAddr,
        stats: &TransferStats,
    ) {
        let Some(reporter) = reporter else {
            return;
        };
        if let Some(snapshot) = reporter.observe(Instant::now(), stats.bytes_moved()) {
            self.sink.emit(ReportEvent::Interval {
                identity,
                snapshot,
                format: self.config.report_format,
            });
        }
    }

    async fn await_ack(&self, conn: &mut ConnectionHandle) -> bool {
        let id = self.config.connection_id;
        let mut reply = [0u8; CHUNK_SIZE];

        let read = conn.recv(&mut reply);
        let result = match self.config.handshake_timeout {
            Some(limit) => match tokio::time::timeout(limit, read).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!("Session {}: no reply to BYE within {:?}", id, limit);
                    return false;
                }
            },
            None => read.await,
        };

        match result {
            Ok(n) if handshake::is_ack(&reply[..n]) => true,
            Ok(0) => {
                tracing::warn!("Session {}: server closed the connection before ACK", id);
                false
            }
            Ok(n) => {
                tracing::warn!(
                    "Session {}: unexpected reply to BYE: {:?}",
                    id,
                    String::from_utf8_lossy(&reply[..n])
                );
                false
            }
            Err(e) => {
                tracing::warn!("Session {}: reading reply to BYE failed: {}", id, e);
                false
            }
        }
    }
}
