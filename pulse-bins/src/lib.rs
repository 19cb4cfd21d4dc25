//! Shared code for the Pulse binaries

pub mod common;
