//! Interval throughput reporting.
//!
//! The send loop calls [`IntervalReporter::observe`] after each chunk. A
//! snapshot is produced whenever at least one report interval of wall-clock
//! time has passed since the previous one. Windows drift by however long the
//! chunk in flight took; a partial final window never produces a snapshot.

use crate::stats::IntervalSnapshot;
use crate::units;
use std::time::{Duration, Instant};

/// Tracks the current reporting window of one sender
#[derive(Debug, Clone)]
pub struct IntervalReporter {
    interval: Duration,
    started_at: Instant,
    last_report: Instant,
    elapsed_at_last_report: Duration,
    bytes_at_last_report: u64,
}

impl IntervalReporter {
    /// Start reporting every `interval`, with the first window opening at
    /// `started_at`
    #[must_use]
    pub fn new(interval: Duration, started_at: Instant) -> Self {
        Self {
            interval,
            started_at,
            last_report: started_at,
            elapsed_at_last_report: Duration::ZERO,
            bytes_at_last_report: 0,
        }
    }

    /// Feed the current time and cumulative byte count.
    ///
    /// Returns a snapshot when the current window is complete, then opens
    /// the next window at `now`.
    pub fn observe(&mut self, now: Instant, bytes_moved: u64) -> Option<IntervalSnapshot> {
        if now.saturating_duration_since(self.last_report) < self.interval {
            return None;
        }

        let window_end = now.saturating_duration_since(self.started_at);
        let bytes_in_window = bytes_moved.saturating_sub(self.bytes_at_last_report);
        let snapshot = IntervalSnapshot {
            window_start: self.elapsed_at_last_report,
            window_end,
            bytes_in_window,
            rate_mbps: units::mbps(units::bytes_per_second(bytes_in_window, self.interval)),
        };

        tracing::trace!(
            "Interval {:?}-{:?}: {} bytes",
            snapshot.window_start,
            snapshot.window_end,
            bytes_in_window
        );

        self.last_report = now;
        self.elapsed_at_last_report = window_end;
        self.bytes_at_last_report = bytes_moved;
        Some(snapshot)
    }
}
