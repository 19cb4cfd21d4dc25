//! Pulse Core - In-process HTTP performance telemetry and alerting
//!
//! Pulse records one performance metric per completed HTTP request, keeps a
//! rolling error rate per route, raises deduplicated alerts when response
//! time, error rate or memory pressure cross their thresholds, and answers
//! dashboard and health queries from the same in-memory stores.
//!
//! ## Architecture
//! - **One critical section** per request: window update, metric append,
//!   alert admission and retention sweep happen under a single lock
//! - **Pull-based reporting**: dashboard and health views are computed on
//!   demand and never mutate the stores
//! - **Off-path persistence**: critical alerts and resolutions go to a
//!   bounded queue drained by a background thread
//!
//! ## Core Modules
//! - `core`: metric and alert types, errors, time helpers
//! - `config`: thresholds with validation
//! - `telemetry`: recorder, error window, evaluator, deduplicator, retention
//! - `reporting`: dashboard aggregation and health verdict
//! - `persistence`: alert journal worker and sinks
//! - `monitoring`: Prometheus registry and the HTTP server

pub mod config;
pub mod core;
pub mod monitoring;
pub mod persistence;
pub mod reporting;
pub mod telemetry;
pub mod utils;

pub mod testing;

// Re-export core types
pub use crate::core::{
    AlertSeverity, AlertType, CandidateAlert, PerformanceMetric, SystemAlert, TelemetryError,
};

pub use config::Thresholds;
pub use monitoring::{MetricsRegistry, ServerConfig, TelemetryServer};
pub use persistence::{JsonlAlertSink, PersistenceRecord, PersistenceWorker};
pub use reporting::{Dashboard, HealthReport, HealthStatus};
pub use telemetry::{
    InFlightRequest, ProcessProbe, RequestOutcome, ResourceProbe, TelemetryEngine,
};

// Re-export error types
pub use anyhow::{Error, Result};

/// Prelude for convenient imports
pub mod prelude {
    // Data types
    pub use crate::core::{AlertSeverity, AlertType, PerformanceMetric, SystemAlert};

    // Engine
    pub use crate::config::Thresholds;
    pub use crate::telemetry::{ProcessProbe, RequestOutcome, ResourceProbe, TelemetryEngine};

    // Reporting
    pub use crate::reporting::{Dashboard, HealthReport, HealthStatus};

    // Error types
    pub use crate::core::TelemetryError;
    pub use crate::{Error, Result};
}
