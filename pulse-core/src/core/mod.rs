//! Core telemetry types
//!
//! - `types`: metrics, alerts and their strongly-typed metadata
//! - `errors`: error taxonomy for the telemetry pipeline
//! - `time`: epoch conversions and age arithmetic on `SystemTime`

pub mod errors;
pub mod time;
pub mod types;

pub use errors::{ConfigError, PersistenceError, ProbeError, TelemetryError};
pub use types::{
    AlertMetadata, AlertSeverity, AlertType, CandidateAlert, ErrorRateSnapshot, MemorySnapshot,
    PerformanceMetric, ResponseTimeSnapshot, SystemAlert,
};
