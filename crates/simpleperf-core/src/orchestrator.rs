//! Parallel client sessions.
//!
//! The orchestrator validates every configuration up front, then runs one
//! sender task per connection. A failure in one session is recorded in its
//! [`SessionReport`] and never cancels the others.

use crate::config::SessionConfig;
use crate::error::{ConfigError, SessionError};
use crate::report::ReportSink;
use crate::session::{SessionOutcome, TransferSession};
use simpleperf_transport::TransportConfig;
use std::sync::Arc;

/// Result of one orchestrated session
#[derive(Debug)]
pub struct SessionReport {
    /// Display id of the session
    pub connection_id: u32,
    /// How the session ended
    pub result: Result<SessionOutcome, SessionError>,
}

impl SessionReport {
    /// Whether the session completed its handshake
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self.result, Ok(SessionOutcome::Completed(_)))
    }
}

/// Launches N concurrent sender sessions against one server
pub struct ConnectionOrchestrator {
    sink: Arc<dyn ReportSink>,
    transport: TransportConfig,
}

impl ConnectionOrchestrator {
    /// Create an orchestrator whose sessions report to `sink`
    #[must_use]
    pub fn new(sink: Arc<dyn ReportSink>) -> Self {
        Self {
            sink,
            transport: TransportConfig::default(),
        }
    }

    /// Use `transport` for every session's connection
    #[must_use]
    pub fn with_transport_config(mut self, transport: TransportConfig) -> Self {
        self.transport = transport;
        self
    }

    /// Run `connections` copies of `template`, numbered `1..=connections`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoConnections`] for zero connections, or the
    /// template's validation error. No session is started in either case.
    pub async fn run(
        &self,
        template: &SessionConfig,
        connections: u32,
    ) -> Result<Vec<SessionReport>, ConfigError> {
        if connections == 0 {
            return Err(ConfigError::NoConnections);
        }
        template.validate()?;

        let configs = (1..=connections)
            .map(|id| template.clone().with_connection_id(id))
            .collect();
        self.run_sessions(configs).await
    }

    /// Run each configuration as its own concurrent sender session.
    ///
    /// Reports come back in the order of `configs`.
    ///
    /// # Errors
    ///
    /// Returns the first validation error; no session is started.
    pub async fn run_sessions(
        &self,
        configs: Vec<SessionConfig>,
    ) -> Result<Vec<SessionReport>, ConfigError> {
        if configs.is_empty() {
            return Err(ConfigError::NoConnections);
        }
        for config in &configs {
            config.validate()?;
        }

        tracing::debug!("Starting {} client sessions", configs.len());

        let handles: Vec<_> = configs
            .into_iter()
            .map(|config| {
                let connection_id = config.connection_id;
                let session = TransferSession::new(config, Arc::clone(&self.sink))
                    .with_transport_config(self.transport.clone());
                let handle = tokio::spawn(async move { session.run_sender().await });
                (connection_id, handle)
            })
            .collect();

        let mut reports = Vec::with_capacity(handles.len());
        for (connection_id, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(SessionError::Aborted(e.to_string())),
            };

            match &result {
                Ok(SessionOutcome::Completed(_)) => {
                    tracing::debug!("Session {} completed", connection_id);
                }
                Ok(SessionOutcome::HandshakeMismatch) => {
                    tracing::warn!("Session {} ended without acknowledgement", connection_id);
                }
                Err(e) => tracing::warn!("Session {} failed: {}", connection_id, e),
            }

            reports.push(SessionReport {
                connection_id,
                result,
            });
        }

        Ok(reports)
    }
}
