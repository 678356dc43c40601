//! Report records and the output sink.
//!
//! Every line a session or listener prints goes through a [`ReportSink`].
//! The sink is the only resource shared between concurrent sessions, so
//! lines from different sessions may interleave in any order.

use crate::config::Role;
use crate::stats::{IntervalSnapshot, TransferSummary};
use crate::units::{self, ReportFormat};
use std::fmt;
use std::io::Write;
use std::net::SocketAddr;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

const SEPARATOR: &str = "-------------------------------------------------";

/// Something worth printing
#[derive(Debug, Clone, PartialEq)]
pub enum ReportEvent {
    /// Server is accepting connections
    Listening {
        /// Listen port
        port: u16,
    },
    /// Server accepted a client
    ClientAccepted {
        /// Client address
        peer: SocketAddr,
        /// Server-side address of the connection
        local: SocketAddr,
    },
    /// Client is about to connect
    Connecting {
        /// Session display id
        connection_id: u32,
        /// Server address as configured
        server: String,
        /// Server port
        port: u16,
    },
    /// Client connected
    Connected {
        /// Session display id
        connection_id: u32,
        /// Server address as configured
        server: String,
        /// Server port
        port: u16,
    },
    /// Client could not connect
    ConnectionFailed {
        /// Session display id
        connection_id: u32,
        /// Server address as configured
        server: String,
        /// Server port
        port: u16,
    },
    /// One full reporting window
    Interval {
        /// Client-side local address
        identity: SocketAddr,
        /// Window measurements
        snapshot: IntervalSnapshot,
        /// Unit for the volume column
        format: ReportFormat,
    },
    /// Whole-transfer result
    Summary(TransferSummary),
}

impl fmt::Display for ReportEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Listening { port } => {
                writeln!(f, "{SEPARATOR}")?;
                writeln!(f, "A simpleperf server is listening on port {port}")?;
                write!(f, "{SEPARATOR}")
            }
            Self::ClientAccepted { peer, local } => {
                write!(f, "A simpleperf client with {peer} is connected with {local}")
            }
            Self::Connecting {
                connection_id,
                server,
                port,
            } => {
                writeln!(f, "{SEPARATOR}")?;
                writeln!(
                    f,
                    "A simpleperf client ({connection_id}) connecting to server {server}, port {port}"
                )?;
                write!(f, "{SEPARATOR}")
            }
            Self::Connected {
                connection_id,
                server,
                port,
            } => write!(f, "Client ({connection_id}) connected with {server} port {port}"),
            Self::ConnectionFailed { server, port, .. } => write!(
                f,
                "Error: Unable to connect to server {server}:{port}. Check the server address and port number."
            ),
            Self::Interval {
                identity,
                snapshot,
                format,
            } => f.write_str(&report_row(
                *identity,
                snapshot.window_start,
                snapshot.window_end,
                snapshot.bytes_in_window,
                *format,
                snapshot.rate_mbps,
            )),
            Self::Summary(summary) => {
                let header = match summary.role {
                    Role::Sender => "ID\t\tInterval\tTransfer\tBandwidth",
                    Role::Receiver => "ID\t\t\tInterval\tReceived\tRate",
                };
                writeln!(f, "{SEPARATOR}")?;
                writeln!(f, "{header}")?;
                writeln!(
                    f,
                    "{}",
                    report_row(
                        summary.identity,
                        Duration::ZERO,
                        summary.elapsed,
                        summary.bytes,
                        summary.format,
                        summary.mbps(),
                    )
                )?;
                write!(f, "{SEPARATOR}")
            }
        }
    }
}

/// One tab-separated result row: identity, window, volume, rate.
#[must_use]
pub fn report_row(
    identity: SocketAddr,
    start: Duration,
    end: Duration,
    bytes: u64,
    format: ReportFormat,
    rate_mbps: f64,
) -> String {
    format!(
        "{identity}\t{:.1}-{:.1}s\t{:.1} {format}\t{rate_mbps:.1} Mbps",
        start.as_secs_f64(),
        end.as_secs_f64(),
        units::convert(bytes, format),
    )
}

/// Destination for report events
pub trait ReportSink: Send + Sync {
    /// Emit one event
    fn emit(&self, event: ReportEvent);
}

/// Prints events to stdout, one event per locked write
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl ReportSink for ConsoleSink {
    fn emit(&self, event: ReportEvent) {
        let mut out = std::io::stdout().lock();
        if let Err(e) = writeln!(out, "{event}") {
            tracing::warn!("Failed to write report: {}", e);
        }
    }
}

/// Collects events in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<ReportEvent>>,
}

impl MemorySink {
    /// Create an empty sink
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything emitted so far
    #[must_use]
    pub fn events(&self) -> Vec<ReportEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Summaries emitted so far
    #[must_use]
    pub fn summaries(&self) -> Vec<TransferSummary> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ReportEvent::Summary(summary) => Some(summary),
                _ => None,
            })
            .collect()
    }

    /// Interval snapshots emitted so far
    #[must_use]
    pub fn intervals(&self) -> Vec<IntervalSnapshot> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ReportEvent::Interval { snapshot, .. } => Some(snapshot),
                _ => None,
            })
            .collect()
    }
}

impl ReportSink for MemorySink {
    fn emit(&self, event: ReportEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr() -> SocketAddr {
        "127.0.0.1:50123".parse().unwrap()
    }

    #[test]
    fn test_report_row() {
        let row = report_row(
            addr(),
            Duration::from_millis(1000),
            Duration::from_millis(2040),
            1_300_000,
            ReportFormat::MB,
            10.0,
        );
        assert_eq!(row, "127.0.0.1:50123\t1.0-2.0s\t1.3 MB\t10.0 Mbps");
    }

    #[test]
    fn test_summary_rendering() {
        let summary = TransferSummary {
            role: Role::Sender,
            identity: addr(),
            connection_id: 1,
            elapsed: Duration::from_secs(2),
            bytes: 5000,
            format: ReportFormat::KB,
        };
        let text = ReportEvent::Summary(summary).to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], SEPARATOR);
        assert_eq!(lines[1], "ID\t\tInterval\tTransfer\tBandwidth");
        assert_eq!(lines[2], "127.0.0.1:50123\t0.0-2.0s\t5.0 KB\t0.0 Mbps");
        assert_eq!(lines[3], SEPARATOR);
    }

    #[test]
    fn test_receiver_header() {
        let summary = TransferSummary {
            role: Role::Receiver,
            identity: addr(),
            connection_id: 1,
            elapsed: Duration::from_secs(1),
            bytes: 1_000_000,
            format: ReportFormat::MB,
        };
        let text = ReportEvent::Summary(summary).to_string();
        assert!(text.contains("ID\t\t\tInterval\tReceived\tRate"));
        assert!(text.contains("1.0 MB\t8.0 Mbps"));
    }

    #[test]
    fn test_connection_lines() {
        let connecting = ReportEvent::Connecting {
            connection_id: 2,
            server: "10.0.0.1".into(),
            port: 8080,
        };
        assert!(
            connecting
                .to_string()
                .contains("A simpleperf client (2) connecting to server 10.0.0.1, port 8080")
        );

        let failed = ReportEvent::ConnectionFailed {
            connection_id: 2,
            server: "10.0.0.1".into(),
            port: 8080,
        };
        assert!(failed.to_string().starts_with("Error: Unable to connect to server 10.0.0.1:8080."));
    }

    #[test]
    fn test_memory_sink_filters() {
        let sink = MemorySink::new();
        sink.emit(ReportEvent::Listening { port: 1 });
        sink.emit(ReportEvent::Interval {
            identity: addr(),
            snapshot: IntervalSnapshot {
                window_start: Duration::ZERO,
                window_end: Duration::from_secs(1),
                bytes_in_window: 10,
                rate_mbps: 0.0,
            },
            format: ReportFormat::B,
        });
        assert_eq!(sink.events().len(), 2);
        assert_eq!(sink.intervals().len(), 1);
        assert!(sink.summaries().is_empty());
    }

    #[test]
    fn test_memory_sink_survives_poisoned_lock() {
        let sink = std::sync::Arc::new(MemorySink::new());
        sink.emit(ReportEvent::Listening { port: 1 });

        let holder = sink.clone();
        let panicked = std::thread::spawn(move || {
            let _guard = holder.events.lock().unwrap();
            panic!("poison the sink");
        })
        .join()
        .is_err();
        assert!(panicked);
        assert!(sink.events.is_poisoned());

        sink.emit(ReportEvent::Listening { port: 2 });
        assert_eq!(
            sink.events(),
            vec![
                ReportEvent::Listening { port: 1 },
                ReportEvent::Listening { port: 2 },
            ]
        );
    }
}
