//! Pulse telemetry server
//!
//! Runs the telemetry engine behind its HTTP surface:
//! - `GET /api/monitoring/dashboard`
//! - `GET /health`
//! - `PATCH /api/monitoring/alerts/{id}/resolve`
//! - `GET /metrics`
//!
//! Ctrl-C stops accepting connections; the persistence journal is drained
//! before the process exits.

use anyhow::{Context, Result};
use clap::Parser;
use pulse_bins::common::CommonArgs;
use pulse_core::persistence::{JsonlAlertSink, PersistenceWorker};
use pulse_core::telemetry::{ProcessProbe, TelemetryEngine};
use pulse_core::utils::init_logger;
use pulse_core::TelemetryServer;
use std::sync::Arc;
use tokio::sync::Notify;

fn main() -> Result<()> {
    // Parse CLI arguments
    let args = CommonArgs::parse();

    // Initialize logging
    init_logger(&args.log_level, args.json_logs)?;

    tracing::info!("=== Pulse: Telemetry Server ===");

    // Malformed thresholds are fatal here
    let thresholds = args.thresholds()?;
    let server_config = args.server_config();

    let persistence = match &server_config.journal_path {
        Some(path) => {
            let sink = JsonlAlertSink::open(path)
                .with_context(|| format!("Failed to open alert journal {}", path.display()))?;
            Some(PersistenceWorker::spawn(
                sink,
                server_config.persistence_queue_capacity,
            ))
        }
        None => {
            tracing::info!("Alert journal disabled");
            None
        }
    };

    let engine = Arc::new(TelemetryEngine::new(
        thresholds,
        Box::new(ProcessProbe::new()),
        persistence,
    )?);

    // Graceful shutdown on Ctrl-C
    let shutdown = Arc::new(Notify::new());
    let signal = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        tracing::info!("Received shutdown signal");
        signal.notify_one();
    })
    .context("Failed to install Ctrl-C handler")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("pulse-http")
        .build()
        .context("Failed to build tokio runtime")?;

    let server = TelemetryServer::new(server_config.listen_addr, Arc::clone(&engine));
    runtime.block_on(server.serve(shutdown))?;

    // In-flight connection tasks hold engine clones; stop them first
    runtime.shutdown_timeout(std::time::Duration::from_secs(5));

    let dashboard = engine.dashboard(std::time::SystemTime::now());
    tracing::info!("=== Final Statistics ===");
    tracing::info!(
        total_metrics = dashboard.summary.total_metrics,
        active_alerts = dashboard.summary.active_alerts,
        uptime_secs = engine.uptime().as_secs(),
        "Telemetry server stopped"
    );

    // Dropping the last engine handle drains the alert journal
    drop(engine);
    Ok(())
}
