//! Testing utilities for unit and integration tests
//!
//! - `helpers`: builders for metrics, alerts and request outcomes
//! - `mocks`: scripted resource probe and in-memory persistence sink

pub mod helpers;
pub mod mocks;

pub use helpers::*;
pub use mocks::{Gate, MemorySink, ScriptedProbe};
