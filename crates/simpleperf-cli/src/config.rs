//! Configuration file for the simpleperf CLI.

use serde::{Deserialize, Serialize};
use simpleperf_core::{DEFAULT_ADDRESS, DEFAULT_PORT, ReportFormat};
use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

/// simpleperf configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Server mode settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Client mode settings
    #[serde(default)]
    pub client: ClientConfig,
    /// Report settings
    #[serde(default)]
    pub report: ReportConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server mode settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// Address to bind
    #[serde(default = "default_address")]
    pub bind: String,
    /// Port to listen on (also the port clients connect to)
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Client mode settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    /// Server address
    #[serde(default = "default_address")]
    pub server_ip: String,
    /// Parallel connections
    #[serde(default = "default_connections")]
    pub connections: u32,
    /// Seconds to wait for `ACK: BYE`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handshake_timeout_secs: Option<u64>,
    /// Seconds to wait for each connection to be established
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connect_timeout_secs: Option<u64>,
}

/// Report settings
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ReportConfig {
    /// Volume unit
    #[serde(default)]
    pub format: ReportFormat,
    /// Interval report period in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_secs: Option<u64>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default values

fn default_address() -> String {
    DEFAULT_ADDRESS.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_connections() -> u32 {
    1
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_address(),
            port: default_port(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_ip: default_address(),
            connections: default_connections(),
            handshake_timeout_secs: None,
            connect_timeout_secs: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Get default config path
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join("simpleperf/config.toml")
    }

    /// Load `path` if given, else the default path if it exists, else
    /// built-in defaults
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit path is missing or any file fails to
    /// parse.
    pub fn resolve(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Self::load_or_default(),
        }
    }

    /// Load config from default path, or use defaults if it doesn't exist
    ///
    /// # Errors
    ///
    /// Returns an error if the default file exists but cannot be read.
    pub fn load_or_default() -> anyhow::Result<Self> {
        let path = Self::default_path();

        if path.exists() {
            tracing::debug!("Loading configuration from {}", path.display());
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.server
            .bind
            .parse::<IpAddr>()
            .map_err(|_| anyhow::anyhow!("Invalid bind address: {}", self.server.bind))?;

        if self.server.port == 0 {
            anyhow::bail!("Port must be between 1 and 65535");
        }

        if self.client.server_ip.is_empty() {
            anyhow::bail!("Server address must not be empty");
        }

        if self.client.connections == 0 {
            anyhow::bail!("At least one connection is required");
        }

        if self.client.handshake_timeout_secs == Some(0) {
            anyhow::bail!("Handshake timeout must be positive");
        }

        if self.client.connect_timeout_secs == Some(0) {
            anyhow::bail!("Connect timeout must be positive");
        }

        if self.report.interval_secs == Some(0) {
            anyhow::bail!("Report interval must be positive");
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            anyhow::bail!(
                "Invalid log level: {}. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            );
        }

        Ok(())
    }
}
