//! Threshold configuration
//!
//! Thresholds come from defaults, an optional JSON file, and CLI overrides
//! applied by the binary. They are validated once; a malformed configuration
//! is fatal at startup and never checked again at request time.

pub mod types;

pub use types::*;

use crate::core::ConfigError;
use types::MINUTE;
use std::path::Path;

impl Thresholds {
    /// Load thresholds from a JSON file; missing fields keep their defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let thresholds: Thresholds =
            serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        thresholds.validate()?;
        Ok(thresholds)
    }

    /// Validate threshold values
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_fraction("errorRateThreshold", self.error_rate_threshold)?;
        check_fraction("errorRateCritical", self.error_rate_critical)?;
        check_fraction("memoryThreshold", self.memory_threshold)?;
        check_fraction("memoryCritical", self.memory_critical)?;
        check_fraction("healthMemoryLimit", self.health_memory_limit)?;

        if self.response_time_threshold_ms == 0 {
            return Err(ConfigError::invalid("responseTimeThresholdMs", "must be > 0"));
        }
        if self.response_time_critical_ms < self.response_time_threshold_ms {
            return Err(ConfigError::invalid(
                "responseTimeCriticalMs",
                "must be >= responseTimeThresholdMs",
            ));
        }
        if self.error_rate_critical < self.error_rate_threshold {
            return Err(ConfigError::invalid(
                "errorRateCritical",
                "must be >= errorRateThreshold",
            ));
        }
        if self.memory_critical < self.memory_threshold {
            return Err(ConfigError::invalid(
                "memoryCritical",
                "must be >= memoryThreshold",
            ));
        }

        for (field, value, unit_secs) in self.windows() {
            if value == 0 {
                return Err(ConfigError::invalid(field, "must be > 0"));
            }
            check_window(field, value.checked_mul(unit_secs))?;
        }

        if self.trend_buckets == 0 {
            return Err(ConfigError::invalid("trendBuckets", "must be > 0"));
        }
        let buckets = u32::try_from(self.trend_buckets)
            .map_err(|_| ConfigError::invalid("trendBuckets", "must fit in 32 bits"))?;
        check_window(
            "trendBuckets",
            self.trend_bucket_minutes
                .checked_mul(MINUTE)
                .and_then(|bucket| bucket.checked_mul(u64::from(buckets))),
        )?;
        if self.recent_sample_size == 0 {
            return Err(ConfigError::invalid("recentSampleSize", "must be > 0"));
        }

        Ok(())
    }
}

/// Window length in seconds; `None` means the multiplication overflowed
fn check_window(field: &'static str, secs: Option<u64>) -> Result<(), ConfigError> {
    match secs {
        Some(secs) if secs <= MAX_WINDOW_SECS => Ok(()),
        _ => Err(ConfigError::invalid(
            field,
            format!("window longer than {} seconds", MAX_WINDOW_SECS),
        )),
    }
}

fn check_fraction(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value <= 0.0 || value > 1.0 {
        return Err(ConfigError::invalid(
            field,
            format!("{} is not a fraction in (0, 1]", value),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_are_valid() {
        let thresholds = Thresholds::default();
        assert!(thresholds.validate().is_ok());
        assert_eq!(thresholds.cooldown(), Duration::from_secs(15 * 60));
        assert_eq!(thresholds.retention(), Duration::from_secs(24 * 3600));
        assert_eq!(thresholds.trend_span(), Duration::from_secs(3600));
    }

    #[test]
    fn test_threshold_validation() {
        let mut thresholds = Thresholds::default();

        thresholds.error_rate_threshold = 1.5;
        assert!(thresholds.validate().is_err());
        thresholds.error_rate_threshold = f64::NAN;
        assert!(thresholds.validate().is_err());
        thresholds.error_rate_threshold = 0.05;

        thresholds.memory_critical = 0.5;
        assert!(thresholds.validate().is_err());
        thresholds.memory_critical = 0.95;

        thresholds.cooldown_minutes = 0;
        assert!(thresholds.validate().is_err());
        thresholds.cooldown_minutes = 15;

        thresholds.response_time_critical_ms = 100;
        assert!(thresholds.validate().is_err());
        thresholds.response_time_critical_ms = 10_000;

        assert!(thresholds.validate().is_ok());
    }

    #[test]
    fn test_oversized_windows_are_rejected() {
        let cases: [fn(&mut Thresholds); 5] = [
            |t| t.trend_bucket_minutes = u64::MAX / 60,
            |t| t.retention_hours = u64::MAX / 3600 + 1,
            |t| t.cooldown_minutes = u64::MAX,
            |t| t.trend_buckets = u32::MAX as usize + 1,
            // Each factor fits, the product does not
            |t| {
                t.trend_bucket_minutes = 365 * 24 * 60;
                t.trend_buckets = 1_000;
            }
        ];

        for apply in cases {
            let mut thresholds = Thresholds::default();
            apply(&mut thresholds);
            assert!(matches!(
                thresholds.validate(),
                Err(ConfigError::InvalidValue { .. })
            ));
        }
    }

    #[test]
    fn test_accessors_saturate_instead_of_wrapping() {
        let thresholds = Thresholds {
            retention_hours: u64::MAX,
            trend_buckets: usize::MAX,
            ..Thresholds::default()
        };
        assert_eq!(thresholds.retention(), Duration::from_secs(u64::MAX));
        assert!(thresholds.trend_span() >= thresholds.trend_bucket());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"responseTimeThresholdMs": 2000, "cooldownMinutes": 5}}"#).unwrap();

        let thresholds = Thresholds::from_json_file(file.path()).unwrap();
        assert_eq!(thresholds.response_time_threshold_ms, 2_000);
        assert_eq!(thresholds.cooldown_minutes, 5);
        assert_eq!(thresholds.retention_hours, 24);
    }

    #[test]
    fn test_malformed_json_is_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"memoryThreshold": 3.0}}"#).unwrap();
        assert!(matches!(
            Thresholds::from_json_file(file.path()),
            Err(ConfigError::InvalidValue { field: "memoryThreshold", .. })
        ));

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            Thresholds::from_json_file(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }
}
