//! Configuration types.
//!
//! [`PlinthConfig`] is the root document. Every section and field has a
//! default, so an empty file is a valid configuration, but unknown keys are
//! rejected at every level.

use std::net::SocketAddr;
use std::time::Duration;

use plinth_server::{
    ServerConfig, Signal, DEFAULT_HEADER_READ_TIMEOUT_SECS, DEFAULT_HTTP_ADDR,
    DEFAULT_MAX_BODY_BYTES, DEFAULT_SHUTDOWN_TIMEOUT_SECS,
};
use plinth_telemetry::LogConfig;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Complete Plinth service configuration.
///
/// # Example
///
/// ```
/// use plinth_config::PlinthConfig;
///
/// let config = PlinthConfig::default();
/// assert_eq!(config.server.http_addr, "0.0.0.0:8080");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlinthConfig {
    /// Listener and shutdown settings.
    #[serde(default)]
    pub server: ServerSection,

    /// Logging settings.
    #[serde(default)]
    pub logging: LogConfig,
}

impl PlinthConfig {
    /// Checks values serde cannot check on its own.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.logging
            .validate()
            .map_err(|e| ConfigError::invalid_value("logging.level", e.to_string()))
    }
}

/// The `[server]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    /// Bind address, e.g. `0.0.0.0:8080`.
    #[serde(default = "default_http_addr")]
    pub http_addr: String,

    /// How long in-flight connections may run after shutdown starts.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,

    /// Signals that start a graceful shutdown, e.g. `["SIGINT", "SIGTERM"]`.
    #[serde(default = "default_signals")]
    pub signals: Vec<Signal>,

    /// Largest accepted request body.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// HTTP/1.1 keep-alive.
    #[serde(default = "default_keep_alive")]
    pub keep_alive: bool,

    /// Time allowed for a client to send request headers.
    #[serde(default = "default_header_read_timeout")]
    pub header_read_timeout_secs: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
            shutdown_timeout_secs: default_shutdown_timeout(),
            signals: default_signals(),
            max_body_bytes: default_max_body_bytes(),
            keep_alive: default_keep_alive(),
            header_read_timeout_secs: default_header_read_timeout(),
        }
    }
}

impl ServerSection {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.http_addr.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::invalid_value(
                "server.http_addr",
                format!("invalid socket address: {}", self.http_addr),
            ));
        }

        if self.max_body_bytes == 0 {
            return Err(ConfigError::invalid_value(
                "server.max_body_bytes",
                "must be greater than zero",
            ));
        }

        if self.header_read_timeout_secs == 0 {
            return Err(ConfigError::invalid_value(
                "server.header_read_timeout_secs",
                "must be greater than zero",
            ));
        }

        Ok(())
    }

    /// Converts the section into the server's runtime configuration.
    ///
    /// ```
    /// use std::time::Duration;
    /// use plinth_config::ServerSection;
    ///
    /// let section = ServerSection {
    ///     shutdown_timeout_secs: 5,
    ///     ..ServerSection::default()
    /// };
    /// let config = section.to_server_config();
    /// assert_eq!(config.shutdown_timeout(), Duration::from_secs(5));
    /// ```
    pub fn to_server_config(&self) -> ServerConfig {
        ServerConfig::builder()
            .http_addr(self.http_addr.clone())
            .shutdown_timeout(Duration::from_secs(self.shutdown_timeout_secs))
            .signals(self.signals.iter().copied())
            .max_body_bytes(self.max_body_bytes)
            .keep_alive(self.keep_alive)
            .header_read_timeout(Duration::from_secs(self.header_read_timeout_secs))
            .build()
    }
}

fn default_http_addr() -> String {
    DEFAULT_HTTP_ADDR.to_string()
}

fn default_shutdown_timeout() -> u64 {
    DEFAULT_SHUTDOWN_TIMEOUT_SECS
}

fn default_signals() -> Vec<Signal> {
    Signal::DEFAULT.to_vec()
}

fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

fn default_keep_alive() -> bool {
    true
}

fn default_header_read_timeout() -> u64 {
    DEFAULT_HEADER_READ_TIMEOUT_SECS
}
