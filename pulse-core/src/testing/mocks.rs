use crate::core::{PersistenceError, ProbeError};
use crate::persistence::{AlertSink, PersistenceRecord};
use crate::telemetry::{ResourceProbe, ResourceSample};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;

/// Probe returning whatever the test last scripted
pub struct ScriptedProbe {
    next: Mutex<Option<ResourceSample>>,
}

impl ScriptedProbe {
    pub fn new(sample: ResourceSample) -> Self {
        Self {
            next: Mutex::new(Some(sample)),
        }
    }

    /// Probe whose every sample fails
    pub fn failing() -> Self {
        Self {
            next: Mutex::new(None),
        }
    }

    pub fn set(&self, sample: ResourceSample) {
        *self.next.lock() = Some(sample);
    }

    pub fn fail(&self) {
        *self.next.lock() = None;
    }
}

impl ResourceProbe for ScriptedProbe {
    fn sample(&self) -> Result<ResourceSample, ProbeError> {
        let next = *self.next.lock();
        next.ok_or_else(|| ProbeError::Unavailable("scripted failure".to_string()))
    }
}

/// Gate that holds the sink's writer until opened
#[derive(Clone, Default)]
pub struct Gate {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl Gate {
    pub fn open(&self) {
        let (open, cvar) = &*self.inner;
        *open.lock() = true;
        cvar.notify_all();
    }

    fn wait(&self) {
        let (open, cvar) = &*self.inner;
        let mut guard = open.lock();
        while !*guard {
            cvar.wait(&mut guard);
        }
    }
}

/// Sink collecting records in memory
pub struct MemorySink {
    records: Arc<Mutex<Vec<PersistenceRecord>>>,
    fail: bool,
    gate: Option<Gate>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(Vec::new())),
            fail: false,
            gate: None,
        }
    }

    /// Sink whose every write fails
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    /// Sink whose writes wait until `gate()` is opened
    pub fn blocked() -> Self {
        Self {
            gate: Some(Gate::default()),
            ..Self::new()
        }
    }

    pub fn records(&self) -> Arc<Mutex<Vec<PersistenceRecord>>> {
        Arc::clone(&self.records)
    }

    pub fn gate(&self) -> Gate {
        self.gate.clone().unwrap_or_default()
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertSink for MemorySink {
    fn write(&mut self, record: &PersistenceRecord) -> Result<(), PersistenceError> {
        if let Some(gate) = &self.gate {
            gate.wait();
        }
        if self.fail {
            return Err(PersistenceError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "sink unavailable",
            )));
        }
        self.records.lock().push(record.clone());
        Ok(())
    }
}
