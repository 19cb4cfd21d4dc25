//! Process resource readings
//!
//! Memory pressure is resident set size over physical memory. CPU time is
//! user plus system time of the whole process.

use crate::core::ProbeError;
use serde::Serialize;

/// One reading of process resources
///
/// `memory_usage_fraction` is resident set size over physical memory, not
/// heap used over heap reserved. A process rarely holds most of the machine,
/// so lower `memoryThreshold` and `memoryCritical` to suit the deployment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSample {
    /// Resident over total memory (0.0 to 1.0)
    pub memory_usage_fraction: f64,
    pub resident_bytes: u64,
    pub total_bytes: u64,
    /// Cumulative process CPU time
    pub cpu_seconds: f64,
}

impl ResourceSample {
    pub fn from_bytes(resident_bytes: u64, total_bytes: u64, cpu_seconds: f64) -> Self {
        let memory_usage_fraction = if total_bytes == 0 {
            0.0
        } else {
            (resident_bytes as f64 / total_bytes as f64).clamp(0.0, 1.0)
        };
        Self {
            memory_usage_fraction,
            resident_bytes,
            total_bytes,
            cpu_seconds,
        }
    }
}

/// Source of resource readings
pub trait ResourceProbe: Send + Sync {
    fn sample(&self) -> Result<ResourceSample, ProbeError>;
}

impl<P: ResourceProbe + ?Sized> ResourceProbe for std::sync::Arc<P> {
    fn sample(&self) -> Result<ResourceSample, ProbeError> {
        (**self).sample()
    }
}

/// Reads the current process via procfs and libc
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessProbe;

impl ProcessProbe {
    pub fn new() -> Self {
        Self
    }
}

impl ResourceProbe for ProcessProbe {
    fn sample(&self) -> Result<ResourceSample, ProbeError> {
        let usage = rusage_self()?;
        let cpu_seconds = timeval_secs(&usage.ru_utime) + timeval_secs(&usage.ru_stime);
        let resident = resident_bytes(&usage)?;
        let total = physical_memory_bytes()?;
        Ok(ResourceSample::from_bytes(resident, total, cpu_seconds))
    }
}

fn rusage_self() -> Result<libc::rusage, ProbeError> {
    use std::mem::MaybeUninit;

    let mut info: MaybeUninit<libc::rusage> = MaybeUninit::uninit();
    // SAFETY: getrusage fully initializes `info` when it returns 0
    unsafe {
        if libc::getrusage(libc::RUSAGE_SELF, info.as_mut_ptr()) == 0 {
            Ok(info.assume_init())
        } else {
            Err(ProbeError::Io {
                what: "getrusage",
                source: std::io::Error::last_os_error(),
            })
        }
    }
}

fn timeval_secs(tv: &libc::timeval) -> f64 {
    tv.tv_sec as f64 + tv.tv_usec as f64 / 1_000_000.0
}

fn page_size() -> Result<u64, ProbeError> {
    // SAFETY: sysconf has no preconditions
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size <= 0 {
        return Err(ProbeError::Unavailable("page size".to_string()));
    }
    Ok(size as u64)
}

fn physical_memory_bytes() -> Result<u64, ProbeError> {
    // SAFETY: sysconf has no preconditions
    let pages = unsafe { libc::sysconf(libc::_SC_PHYS_PAGES) };
    if pages <= 0 {
        return Err(ProbeError::Unavailable("physical page count".to_string()));
    }
    Ok(pages as u64 * page_size()?)
}

/// Current RSS from /proc/self/statm
#[cfg(target_os = "linux")]
fn resident_bytes(_usage: &libc::rusage) -> Result<u64, ProbeError> {
    let statm = std::fs::read_to_string("/proc/self/statm").map_err(|source| ProbeError::Io {
        what: "/proc/self/statm",
        source,
    })?;
    parse_statm_resident_pages(&statm).map(|pages| pages * page_size().unwrap_or(4096))
}

/// Peak RSS; macOS reports ru_maxrss in bytes
#[cfg(target_os = "macos")]
fn resident_bytes(usage: &libc::rusage) -> Result<u64, ProbeError> {
    Ok(usage.ru_maxrss as u64)
}

#[cfg(not(any(target_os = "macos", target_os = "linux")))]
fn resident_bytes(_usage: &libc::rusage) -> Result<u64, ProbeError> {
    Err(ProbeError::Unavailable(
        "resident memory on this platform".to_string(),
    ))
}

/// Second field of statm is the resident page count
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_statm_resident_pages(statm: &str) -> Result<u64, ProbeError> {
    let field = statm
        .split_whitespace()
        .nth(1)
        .ok_or_else(|| ProbeError::Malformed {
            what: "/proc/self/statm",
            detail: format!("expected at least 2 fields in {:?}", statm.trim()),
        })?;
    field.parse::<u64>().map_err(|e| ProbeError::Malformed {
        what: "/proc/self/statm",
        detail: e.to_string(),
    })
}
