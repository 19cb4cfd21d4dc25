//! Per-endpoint error ratio over a lazy tumbling window
//!
//! A window is only reset when a request touches it after it went stale, so
//! an idle path keeps its old counts until its next request.

use crate::core::time::age;
use serde::Serialize;
use std::collections::HashMap;
use std::time::{Duration, SystemTime};

/// Counts for one route template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorWindowState {
    pub error_count: u64,
    pub total_count: u64,
    #[serde(with = "crate::core::time::millis")]
    pub window_start: SystemTime,
}

impl ErrorWindowState {
    fn new(now: SystemTime) -> Self {
        Self {
            error_count: 0,
            total_count: 0,
            window_start: now,
        }
    }

    pub fn ratio(&self) -> f64 {
        if self.total_count == 0 {
            0.0
        } else {
            self.error_count as f64 / self.total_count as f64
        }
    }
}

/// Error windows keyed by route template
#[derive(Debug, Clone)]
pub struct ErrorRateWindow {
    window: Duration,
    states: HashMap<String, ErrorWindowState>,
}

impl ErrorRateWindow {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            states: HashMap::new(),
        }
    }

    /// Count one request outcome for `path`, resetting a stale window first
    pub fn record_outcome(&mut self, path: &str, is_error: bool, now: SystemTime) {
        let state = self
            .states
            .entry(path.to_string())
            .or_insert_with(|| ErrorWindowState::new(now));

        // Exactly at the boundary the window is still live
        if age(now, state.window_start) > self.window {
            *state = ErrorWindowState::new(now);
        }

        state.total_count += 1;
        if is_error {
            state.error_count += 1;
        }
    }

    /// Error ratio for `path`, 0 when nothing has been counted
    pub fn current_ratio(&self, path: &str) -> f64 {
        self.states.get(path).map_or(0.0, ErrorWindowState::ratio)
    }

    pub fn state(&self, path: &str) -> Option<&ErrorWindowState> {
        self.states.get(path)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn clear(&mut self) {
        self.states.clear();
    }
}
