//! Unit conversion and rate arithmetic.
//!
//! All units are decimal (1 KB = 1000 B); there are no binary units.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Smallest elapsed time used for rate math; guards zero-duration sessions.
pub const MIN_ELAPSED: Duration = Duration::from_micros(1);

/// Volume unit used in reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ReportFormat {
    /// Bytes
    B,
    /// Kilobytes (1000 B)
    KB,
    /// Megabytes (1 000 000 B)
    #[default]
    MB,
}

impl ReportFormat {
    /// Bytes per unit
    #[must_use]
    pub const fn divisor(self) -> u64 {
        match self {
            Self::B => 1,
            Self::KB => 1_000,
            Self::MB => 1_000_000,
        }
    }

    /// Unit suffix as printed
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::B => "B",
            Self::KB => "KB",
            Self::MB => "MB",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "B" => Ok(Self::B),
            "KB" => Ok(Self::KB),
            "MB" => Ok(Self::MB),
            other => Err(ConfigError::InvalidFormat(other.to_string())),
        }
    }
}

/// Convert a raw byte count into `format` units.
#[must_use]
pub fn convert(bytes: u64, format: ReportFormat) -> f64 {
    bytes as f64 / format.divisor() as f64
}

/// Megabits per second from bytes per second.
#[must_use]
pub fn mbps(bytes_per_second: f64) -> f64 {
    bytes_per_second * 8.0 / 1_000_000.0
}

/// Bytes per second over `elapsed`, with `elapsed` floored to [`MIN_ELAPSED`].
#[must_use]
pub fn bytes_per_second(bytes: u64, elapsed: Duration) -> f64 {
    bytes as f64 / elapsed.max(MIN_ELAPSED).as_secs_f64()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert() {
        assert_eq!(convert(5000, ReportFormat::B), 5000.0);
        assert_eq!(convert(5000, ReportFormat::KB), 5.0);
        assert_eq!(convert(2_500_000, ReportFormat::MB), 2.5);
        assert_eq!(convert(0, ReportFormat::MB), 0.0);
    }

    #[test]
    fn test_mbps() {
        assert_eq!(mbps(1_000_000.0), 8.0);
        assert_eq!(mbps(125_000.0), 1.0);
        assert_eq!(mbps(0.0), 0.0);
    }

    #[test]
    fn test_bytes_per_second_zero_elapsed() {
        let rate = bytes_per_second(10, Duration::ZERO);
        assert!(rate.is_finite());
        assert_eq!(rate, 10.0 / MIN_ELAPSED.as_secs_f64());
    }

    #[test]
    fn test_format_parse_and_display() {
        for format in [ReportFormat::B, ReportFormat::KB, ReportFormat::MB] {
            assert_eq!(format.to_string().parse::<ReportFormat>().unwrap(), format);
        }
        assert!("kb".parse::<ReportFormat>().is_err());
        assert!("GB".parse::<ReportFormat>().is_err());
        assert_eq!(ReportFormat::default(), ReportFormat::MB);
    }
}
