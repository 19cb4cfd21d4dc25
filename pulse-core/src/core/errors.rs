//! Error types for the telemetry pipeline
//!
//! Only configuration errors are fatal, and only at startup. Probe and
//! persistence errors are logged and swallowed inside the pipeline; a missing
//! alert is reported back to the caller of the resolution endpoint.

use std::path::PathBuf;
use thiserror::Error;

/// Malformed threshold or server configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}

/// Failure to read process resource statistics
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to read {what}: {source}")]
    Io {
        what: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("unparseable {what}: {detail}")]
    Malformed { what: &'static str, detail: String },

    #[error("resource statistics unavailable: {0}")]
    Unavailable(String),
}

/// Failure to hand a record to durable storage
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("persistence queue full, record dropped")]
    QueueFull,

    #[error("persistence worker stopped")]
    Disconnected,

    #[error("sink I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("record serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors surfaced by the telemetry engine's public operations
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("alert `{id}` not found")]
    AlertNotFound { id: String },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("metrics registry error: {0}")]
    Metrics(#[from] prometheus::Error),
}
