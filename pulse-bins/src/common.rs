//! Common utilities for all binaries
//!
//! Shared CLI parsing and the translation of arguments into library config.

use anyhow::{Context, Result};
use clap::Parser;
use pulse_core::config::Thresholds;
use pulse_core::monitoring::ServerConfig;
use pulse_core::persistence::DEFAULT_QUEUE_CAPACITY;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Common CLI arguments for all binaries
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct CommonArgs {
    /// Address the HTTP server binds to
    #[arg(short = 'a', long, default_value = "127.0.0.1:8080")]
    pub listen_addr: SocketAddr,

    /// JSON file with threshold overrides
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Response time that raises a high alert (ms)
    #[arg(long)]
    pub response_time_threshold_ms: Option<u64>,

    /// Response time that escalates to critical (ms); must be >= the high threshold
    #[arg(long)]
    pub response_time_critical_ms: Option<u64>,

    /// Error rate (0.0 to 1.0) that raises a high alert
    #[arg(long)]
    pub error_rate_threshold: Option<f64>,

    /// Error rate (0.0 to 1.0) that escalates to critical
    #[arg(long)]
    pub error_rate_critical: Option<f64>,

    /// Memory usage (0.0 to 1.0) that raises a high alert
    #[arg(long)]
    pub memory_threshold: Option<f64>,

    /// Memory usage (0.0 to 1.0) that escalates to critical
    #[arg(long)]
    pub memory_critical: Option<f64>,

    /// Hours metrics and resolved alerts are retained
    #[arg(long)]
    pub retention_hours: Option<u64>,

    /// Minutes an alert suppresses duplicates of its type and severity
    #[arg(long)]
    pub cooldown_minutes: Option<u64>,

    /// Append critical alerts and resolutions to this JSONL file
    #[arg(short, long)]
    pub journal: Option<PathBuf>,

    /// Capacity of the persistence queue
    #[arg(long, default_value_t = DEFAULT_QUEUE_CAPACITY)]
    pub queue_capacity: usize,

    /// Log level
    #[arg(short, long, default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    pub json_logs: bool,
}

impl CommonArgs {
    /// Defaults, then the config file, then CLI flags; validated at the end
    pub fn thresholds(&self) -> Result<Thresholds> {
        let mut thresholds = match &self.config {
            Some(path) => Thresholds::from_json_file(path)
                .with_context(|| format!("Failed to load thresholds from {}", path.display()))?,
            None => Thresholds::default(),
        };

        if let Some(v) = self.response_time_threshold_ms {
            thresholds.response_time_threshold_ms = v;
        }
        if let Some(v) = self.response_time_critical_ms {
            thresholds.response_time_critical_ms = v;
        }
        if let Some(v) = self.error_rate_threshold {
            thresholds.error_rate_threshold = v;
        }
        if let Some(v) = self.error_rate_critical {
            thresholds.error_rate_critical = v;
        }
        if let Some(v) = self.memory_threshold {
            thresholds.memory_threshold = v;
        }
        if let Some(v) = self.memory_critical {
            thresholds.memory_critical = v;
        }
        if let Some(v) = self.retention_hours {
            thresholds.retention_hours = v;
        }
        if let Some(v) = self.cooldown_minutes {
            thresholds.cooldown_minutes = v;
        }

        thresholds.validate().context("Invalid threshold configuration")?;
        Ok(thresholds)
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            listen_addr: self.listen_addr,
            journal_path: self.journal.clone(),
            persistence_queue_capacity: self.queue_capacity,
        }
    }
}
