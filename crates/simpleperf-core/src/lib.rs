//! # simpleperf Core
//!
//! Protocol and measurement logic for simpleperf, a TCP throughput tester in
//! the spirit of iperf.
//!
//! This crate provides:
//! - Transfer sessions (sender and receiver state machines)
//! - The `START` / `BYE` / `ACK: BYE` control handshake
//! - Interval and summary throughput reporting
//! - A server listener with one session per accepted client
//! - A client orchestrator for parallel connections
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │           ServerListener        ConnectionOrchestrator          │
//! │   (one receiver per client)     (N concurrent senders)          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                       TransferSession                            │
//! │   (stop condition, handshake, stats, interval reporter)         │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                        ReportSink                                │
//! │   (the only state shared between sessions)                      │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod handshake;
pub mod orchestrator;
pub mod report;
pub mod reporter;
pub mod server;
pub mod session;
pub mod stats;
pub mod units;

pub use config::{
    DEFAULT_ADDRESS, DEFAULT_PORT, DEFAULT_TIME_LIMIT, Role, SessionConfig, StopCondition,
    parse_data_size, parse_positive, parse_seconds,
};
pub use error::{ConfigError, Error, Result, SessionError};
pub use orchestrator::{ConnectionOrchestrator, SessionReport};
pub use report::{ConsoleSink, MemorySink, ReportEvent, ReportSink};
pub use reporter::IntervalReporter;
pub use server::ServerListener;
pub use session::{SessionOutcome, TransferSession};
pub use stats::{IntervalSnapshot, TransferStats, TransferSummary};
pub use units::ReportFormat;
