//! Durable audit trail for critical alerts and resolutions
//!
//! The request path only ever calls `PersistenceWorker::submit`, which never
//! blocks: records go through a bounded channel to a background thread that
//! owns the sink. A full queue drops the record. Sink failures are logged and
//! swallowed.

use crate::core::time::{self, epoch_millis};
use crate::core::{AlertType, PersistenceError, SystemAlert};
use crossbeam::channel::{bounded, Receiver, Sender, TrySendError};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::SystemTime;
use tracing::{error, info, warn};

/// Default queue capacity between the request path and the sink
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Record kinds accepted by durable storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum PersistenceRecord {
    CriticalAlertCreated(SystemAlert),
    AlertResolved {
        id: String,
        #[serde(rename = "type")]
        alert_type: AlertType,
        #[serde(with = "time::millis")]
        resolved_at: SystemTime,
    },
}

impl PersistenceRecord {
    pub fn alert_id(&self) -> &str {
        match self {
            Self::CriticalAlertCreated(alert) => &alert.id,
            Self::AlertResolved { id, .. } => id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::CriticalAlertCreated(_) => "critical_alert_created",
            Self::AlertResolved { .. } => "alert_resolved",
        }
    }
}

/// Durable store for persistence records
pub trait AlertSink: Send + 'static {
    fn write(&mut self, record: &PersistenceRecord) -> Result<(), PersistenceError>;

    fn flush(&mut self) -> Result<(), PersistenceError> {
        Ok(())
    }
}

/// One JSON object per line
#[derive(Debug, Serialize)]
struct JournalLine<'a> {
    recorded_at: u64,
    #[serde(flatten)]
    record: &'a PersistenceRecord,
}

/// Appends records to a JSONL file
pub struct JsonlAlertSink {
    path: PathBuf,
    file: File,
}

impl JsonlAlertSink {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PersistenceError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AlertSink for JsonlAlertSink {
    fn write(&mut self, record: &PersistenceRecord) -> Result<(), PersistenceError> {
        let line = JournalLine {
            recorded_at: epoch_millis(SystemTime::now()),
            record,
        };
        let json = serde_json::to_string(&line)?;
        writeln!(self.file, "{}", json)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), PersistenceError> {
        self.file.flush()?;
        Ok(())
    }
}

/// Background writer in front of an `AlertSink`
pub struct PersistenceWorker {
    sender: Option<Sender<PersistenceRecord>>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

impl PersistenceWorker {
    pub fn spawn<S: AlertSink>(sink: S, capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity.max(1));

        let handle = thread::Builder::new()
            .name("pulse-persistence".to_string())
            .spawn(move || Self::writer_loop(sink, receiver));

        match handle {
            Ok(handle) => Self {
                sender: Some(sender),
                thread_handle: Some(handle),
            },
            Err(e) => {
                error!(error = %e, "Failed to spawn persistence thread, records will be dropped");
                Self {
                    sender: None,
                    thread_handle: None,
                }
            }
        }
    }

    fn writer_loop<S: AlertSink>(mut sink: S, receiver: Receiver<PersistenceRecord>) {
        for record in receiver {
            match sink.write(&record) {
                Ok(()) => {
                    if let Err(e) = sink.flush() {
                        error!(error = %e, "Failed to flush alert persistence sink");
                    }
                }
                Err(e) => {
                    error!(
                        error = %e,
                        alert_id = record.alert_id(),
                        kind = record.kind(),
                        "Failed to persist alert record"
                    );
                }
            }
        }

        if let Err(e) = sink.flush() {
            error!(error = %e, "Failed to flush alert persistence sink");
        }
        info!("Persistence worker stopping");
    }

    /// Queue a record without blocking
    pub fn submit(&self, record: PersistenceRecord) -> Result<(), PersistenceError> {
        let Some(sender) = &self.sender else {
            return Err(PersistenceError::Disconnected);
        };

        sender.try_send(record).map_err(|e| {
            let (err, record) = match e {
                TrySendError::Full(record) => (PersistenceError::QueueFull, record),
                TrySendError::Disconnected(record) => (PersistenceError::Disconnected, record),
            };
            warn!(
                alert_id = record.alert_id(),
                kind = record.kind(),
                error = %err,
                "Dropping alert persistence record"
            );
            err
        })
    }
}

impl Drop for PersistenceWorker {
    fn drop(&mut self) {
        // Closing the channel ends the writer loop after it drains the queue
        let _ = self.sender.take();

        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}
