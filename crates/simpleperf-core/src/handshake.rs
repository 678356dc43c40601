//! In-band control messages layered on the byte stream.
//!
//! ```text
//! client                                   server
//!   | ---- START <epoch-seconds>\n ------------> |   informational
//!   | ---- filler chunk (<= 1000 B) ----------> |
//!   | ---- ...                                  |
//!   |      (quiescence, 500 ms)                 |
//!   | ---- BYE -------------------------------> |
//!   | <--- ACK: BYE --------------------------- |
//! ```
//!
//! The receiver recognizes `BYE` only when a single read returns exactly
//! those three bytes. A read that splits or coalesces the sentinel with
//! payload is not recognized.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Termination sentinel sent by the client
pub const BYE: &[u8] = b"BYE";

/// Acknowledgement sentinel sent by the server
pub const ACK_BYE: &[u8] = b"ACK: BYE";

/// Largest payload chunk sent or read per call
pub const CHUNK_SIZE: usize = 1000;

/// Filler byte for payload chunks
pub const FILLER: u8 = b'0';

/// Pause between the end of the send loop and `BYE`, letting the peer drain
pub const QUIESCENCE: Duration = Duration::from_millis(500);

const START_PREFIX: &str = "START ";

/// Build the `START` line for a transfer beginning at `at`.
#[must_use]
pub fn start_message(at: SystemTime) -> String {
    let secs = at
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs_f64();
    format!("{START_PREFIX}{secs:.6}\n")
}

/// Extract the timestamp from a chunk beginning with a `START` line.
///
/// Trailing payload after the newline is ignored.
#[must_use]
pub fn parse_start_message(chunk: &[u8]) -> Option<f64> {
    let line_end = chunk.iter().position(|&b| b == b'\n')?;
    let line = std::str::from_utf8(&chunk[..line_end]).ok()?;
    line.strip_prefix(START_PREFIX)?.trim().parse().ok()
}

/// Whether `chunk` is exactly the `BYE` sentinel
#[must_use]
pub fn is_bye(chunk: &[u8]) -> bool {
    chunk == BYE
}

/// Whether `reply` is exactly the `ACK: BYE` sentinel
#[must_use]
pub fn is_ack(reply: &[u8]) -> bool {
    reply == ACK_BYE
}
