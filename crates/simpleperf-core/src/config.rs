//! Session configuration and argument value parsing.
//!
//! A [`SessionConfig`] reaches the core already parsed; [`SessionConfig::validate`]
//! is the last gate before any socket is touched.

use crate::error::ConfigError;
use crate::units::ReportFormat;
use std::time::Duration;

/// Time limit applied to a sender when neither limit is configured
pub const DEFAULT_TIME_LIMIT: Duration = Duration::from_secs(25);

/// Default port for both roles
pub const DEFAULT_PORT: u16 = 8080;

/// Default bind / server address
pub const DEFAULT_ADDRESS: &str = "127.0.0.1";

/// Session role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Client: actively sends data
    Sender,
    /// Server: passively receives data
    Receiver,
}

/// When a sender stops transmitting payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopCondition {
    /// Stop once this many payload bytes have been sent
    Bytes(u64),
    /// Stop once this much time has passed since the transfer started
    Deadline(Duration),
}

/// Configuration of one transfer session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Sender or receiver
    pub role: Role,
    /// Server address (sender) or bind address (receiver)
    pub peer_address: String,
    /// Server port (sender) or listen port (receiver)
    pub port: u16,
    /// Payload bytes to send
    pub byte_limit: Option<u64>,
    /// Sending duration
    pub time_limit: Option<Duration>,
    /// Volume unit in reports
    pub report_format: ReportFormat,
    /// Interval report period; `None` disables interval reports
    pub report_interval: Option<Duration>,
    /// 1-based id used to tell concurrent sessions apart in output
    pub connection_id: u32,
    /// Upper bound on waiting for `ACK: BYE`; `None` waits forever
    pub handshake_timeout: Option<Duration>,
}

impl SessionConfig {
    /// Sender configuration targeting `peer_address:port`
    #[must_use]
    pub fn sender(peer_address: impl Into<String>, port: u16) -> Self {
        Self {
            role: Role::Sender,
            peer_address: peer_address.into(),
            port,
            byte_limit: None,
            time_limit: None,
            report_format: ReportFormat::default(),
            report_interval: None,
            connection_id: 1,
            handshake_timeout: None,
        }
    }

    /// Receiver configuration for a listener on `bind_address:port`
    #[must_use]
    pub fn receiver(bind_address: impl Into<String>, port: u16) -> Self {
        Self {
            role: Role::Receiver,
            ..Self::sender(bind_address, port)
        }
    }

    /// Send exactly `bytes` payload bytes
    #[must_use]
    pub fn with_byte_limit(mut self, bytes: u64) -> Self {
        self.byte_limit = Some(bytes);
        self
    }

    /// Send for `limit`
    #[must_use]
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    /// Report volumes in `format`
    #[must_use]
    pub fn with_format(mut self, format: ReportFormat) -> Self {
        self.report_format = format;
        self
    }

    /// Emit interval reports every `interval`
    #[must_use]
    pub fn with_report_interval(mut self, interval: Duration) -> Self {
        self.report_interval = Some(interval);
        self
    }

    /// Set the display id
    #[must_use]
    pub fn with_connection_id(mut self, id: u32) -> Self {
        self.connection_id = id;
        self
    }

    /// Bound the wait for `ACK: BYE`
    #[must_use]
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = Some(timeout);
        self
    }

    /// Stop condition for the send loop.
    ///
    /// A byte limit wins; otherwise the time limit, or [`DEFAULT_TIME_LIMIT`].
    #[must_use]
    pub fn stop_condition(&self) -> StopCondition {
        match (self.byte_limit, self.time_limit) {
            (Some(bytes), _) => StopCondition::Bytes(bytes),
            (None, Some(limit)) => StopCondition::Deadline(limit),
            (None, None) => StopCondition::Deadline(DEFAULT_TIME_LIMIT),
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if both limits are set on a sender, a limit,
    /// interval or id is zero, or the port is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidPort);
        }

        if self.role == Role::Sender && self.byte_limit.is_some() && self.time_limit.is_some() {
            return Err(ConfigError::ConflictingLimits);
        }

        if self.byte_limit == Some(0) {
            return Err(ConfigError::NotPositive("num".into()));
        }
        if self.time_limit.is_some_and(|t| t.is_zero()) {
            return Err(ConfigError::NotPositive("time".into()));
        }
        if self.report_interval.is_some_and(|t| t.is_zero()) {
            return Err(ConfigError::NotPositive("interval".into()));
        }
        if self.connection_id == 0 {
            return Err(ConfigError::NotPositive("connection id".into()));
        }

        Ok(())
    }
}

/// Parse a data size such as `500B`, `10KB` or `3MB` into bytes.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidDataSize`] for a missing or unknown suffix or
/// a malformed number, and [`ConfigError::NotPositive`] for a zero size.
pub fn parse_data_size(value: &str) -> Result<u64, ConfigError> {
    let invalid = || ConfigError::InvalidDataSize(value.to_string());

    let (digits, multiplier) = if let Some(n) = value.strip_suffix("MB") {
        (n, 1_000_000)
    } else if let Some(n) = value.strip_suffix("KB") {
        (n, 1_000)
    } else if let Some(n) = value.strip_suffix('B') {
        (n, 1)
    } else {
        return Err(invalid());
    };

    let count: u64 = digits.parse().map_err(|_| invalid())?;
    let bytes = count.checked_mul(multiplier).ok_or_else(invalid)?;
    if bytes == 0 {
        return Err(ConfigError::NotPositive(value.to_string()));
    }
    Ok(bytes)
}

/// Parse a strictly positive integer.
///
/// # Errors
///
/// Returns [`ConfigError::NotPositive`] for zero, negatives and non-integers.
pub fn parse_positive(value: &str) -> Result<u64, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::NotPositive(value.to_string())),
    }
}

/// Parse a strictly positive whole number of seconds.
///
/// # Errors
///
/// Returns [`ConfigError::NotPositive`] like [`parse_positive`].
pub fn parse_seconds(value: &str) -> Result<Duration, ConfigError> {
    parse_positive(value).map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_condition_defaults_to_time() {
        let config = SessionConfig::sender("127.0.0.1", DEFAULT_PORT);
        assert_eq!(
            config.stop_condition(),
            StopCondition::Deadline(DEFAULT_TIME_LIMIT)
        );

        let config = config.with_byte_limit(5000);
        assert_eq!(config.stop_condition(), StopCondition::Bytes(5000));
    }

    #[test]
    fn test_conflicting_limits_rejected() {
        let config = SessionConfig::sender("127.0.0.1", DEFAULT_PORT)
            .with_byte_limit(1000)
            .with_time_limit(Duration::from_secs(2));
        assert_eq!(config.validate(), Err(ConfigError::ConflictingLimits));
    }

    #[test]
    fn test_zero_values_rejected() {
        let base = SessionConfig::sender("127.0.0.1", DEFAULT_PORT);
        assert!(base.clone().with_byte_limit(0).validate().is_err());
        assert!(base.clone().with_time_limit(Duration::ZERO).validate().is_err());
        assert!(base.clone().with_report_interval(Duration::ZERO).validate().is_err());
        assert!(base.clone().with_connection_id(0).validate().is_err());
        assert_eq!(
            SessionConfig::sender("127.0.0.1", 0).validate(),
            Err(ConfigError::InvalidPort)
        );
        assert!(base.validate().is_ok());
    }

    #[test]
    fn test_receiver_role() {
        let config = SessionConfig::receiver("0.0.0.0", 9000).with_format(ReportFormat::KB);
        assert_eq!(config.role, Role::Receiver);
        assert_eq!(config.report_format, ReportFormat::KB);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_data_size() {
        assert_eq!(parse_data_size("500B"), Ok(500));
        assert_eq!(parse_data_size("10KB"), Ok(10_000));
        assert_eq!(parse_data_size("3MB"), Ok(3_000_000));

        assert!(matches!(parse_data_size("10"), Err(ConfigError::InvalidDataSize(_))));
        assert!(matches!(parse_data_size("10GB"), Err(ConfigError::InvalidDataSize(_))));
        assert!(matches!(parse_data_size("KB"), Err(ConfigError::InvalidDataSize(_))));
        assert!(matches!(parse_data_size("-1MB"), Err(ConfigError::InvalidDataSize(_))));
        assert!(matches!(parse_data_size("0MB"), Err(ConfigError::NotPositive(_))));
    }

    #[test]
    fn test_parse_positive() {
        assert_eq!(parse_positive("3"), Ok(3));
        assert!(parse_positive("0").is_err());
        assert!(parse_positive("-2").is_err());
        assert!(parse_positive("1.5").is_err());
        assert_eq!(parse_seconds("2"), Ok(Duration::from_secs(2)));
    }
}
