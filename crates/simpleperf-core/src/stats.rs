//! Transfer statistics.

use crate::config::Role;
use crate::units::{self, ReportFormat};
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Running counters of one session.
///
/// Counters only grow while the session is active; after [`finish`](Self::finish)
/// the elapsed time is frozen and further records are ignored.
#[derive(Debug, Clone)]
pub struct TransferStats {
    bytes_moved: u64,
    chunks: u64,
    started_at: Instant,
    finished: Option<Duration>,
}

impl TransferStats {
    /// Start counting now
    #[must_use]
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    /// Start counting at `started_at`
    #[must_use]
    pub fn starting_at(started_at: Instant) -> Self {
        Self {
            bytes_moved: 0,
            chunks: 0,
            started_at,
            finished: None,
        }
    }

    /// Account for one chunk of `len` bytes
    pub fn record(&mut self, len: usize) {
        if self.finished.is_none() {
            self.bytes_moved += len as u64;
            self.chunks += 1;
        }
    }

    /// Freeze the elapsed time and return it. Idempotent.
    pub fn finish(&mut self) -> Duration {
        *self
            .finished
            .get_or_insert_with(|| self.started_at.elapsed())
    }

    /// Total bytes moved
    #[must_use]
    pub fn bytes_moved(&self) -> u64 {
        self.bytes_moved
    }

    /// Number of chunks moved
    #[must_use]
    pub fn chunks(&self) -> u64 {
        self.chunks
    }

    /// When the transfer started
    #[must_use]
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Elapsed time, frozen once finished
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.finished.unwrap_or_else(|| self.started_at.elapsed())
    }

    /// Average rate in bytes per second
    #[must_use]
    pub fn bytes_per_second(&self) -> f64 {
        units::bytes_per_second(self.bytes_moved, self.elapsed())
    }
}

impl Default for TransferStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Throughput over one reporting window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntervalSnapshot {
    /// Window start, relative to transfer start
    pub window_start: Duration,
    /// Window end, relative to transfer start
    pub window_end: Duration,
    /// Bytes sent during the window
    pub bytes_in_window: u64,
    /// `bytes_in_window` over the configured report interval, in Mbps
    pub rate_mbps: f64,
}

/// Final record of a completed session
#[derive(Debug, Clone, PartialEq)]
pub struct TransferSummary {
    /// Which side produced the summary
    pub role: Role,
    /// Client-side local address (sender) or client address (receiver)
    pub identity: SocketAddr,
    /// Display id (1 on the receiver side)
    pub connection_id: u32,
    /// Whole-transfer duration
    pub elapsed: Duration,
    /// Raw bytes moved
    pub bytes: u64,
    /// Unit for the volume column
    pub format: ReportFormat,
}

impl TransferSummary {
    /// Build a summary from finished stats
    #[must_use]
    pub fn from_stats(
        role: Role,
        identity: SocketAddr,
        connection_id: u32,
        stats: &TransferStats,
        format: ReportFormat,
    ) -> Self {
        Self {
            role,
            identity,
            connection_id,
            elapsed: stats.elapsed(),
            bytes: stats.bytes_moved(),
            format,
        }
    }

    /// Volume in the configured unit
    #[must_use]
    pub fn volume(&self) -> f64 {
        units::convert(self.bytes, self.format)
    }

    /// Average rate in Mbps
    #[must_use]
    pub fn mbps(&self) -> f64 {
        units::mbps(units::bytes_per_second(self.bytes, self.elapsed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_finish() {
        let mut stats = TransferStats::new();
        stats.record(1000);
        stats.record(500);
        assert_eq!(stats.bytes_moved(), 1500);
        assert_eq!(stats.chunks(), 2);

        let elapsed = stats.finish();
        assert_eq!(stats.finish(), elapsed);
        assert_eq!(stats.elapsed(), elapsed);

        // Frozen after finish
        stats.record(1000);
        assert_eq!(stats.bytes_moved(), 1500);
    }

    #[test]
    fn test_summary_arithmetic() {
        let summary = TransferSummary {
            role: Role::Sender,
            identity: "127.0.0.1:50000".parse().unwrap(),
            connection_id: 1,
            elapsed: Duration::from_secs(2),
            bytes: 2_000_000,
            format: ReportFormat::KB,
        };
        assert_eq!(summary.volume(), 2000.0);
        // 1 MB/s == 8 Mbps
        assert_eq!(summary.mbps(), 8.0);
    }

    #[test]
    fn test_summary_zero_elapsed_is_finite() {
        let summary = TransferSummary {
            role: Role::Receiver,
            identity: "127.0.0.1:50000".parse().unwrap(),
            connection_id: 1,
            elapsed: Duration::ZERO,
            bytes: 3,
            format: ReportFormat::B,
        };
        assert!(summary.mbps().is_finite());
    }
}
