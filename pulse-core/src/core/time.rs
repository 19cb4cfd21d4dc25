//! Wall-clock helpers
//!
//! All stores keep `SystemTime` internally and expose epoch milliseconds on
//! the wire.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch (0 for pre-epoch clocks)
pub fn epoch_millis(t: SystemTime) -> u64 {
    t.duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}

/// Inverse of [`epoch_millis`]
pub fn from_epoch_millis(millis: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_millis(millis)
}

/// Age of `then` as seen from `now`; a timestamp in the future has age zero.
pub fn age(now: SystemTime, then: SystemTime) -> Duration {
    now.duration_since(then).unwrap_or(Duration::ZERO)
}

/// `now - span`, saturating at the epoch
pub fn horizon(now: SystemTime, span: Duration) -> SystemTime {
    now.checked_sub(span).unwrap_or(UNIX_EPOCH)
}

/// Serde adapter storing `SystemTime` as epoch milliseconds
pub mod millis {
    use super::{epoch_millis, from_epoch_millis};
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::SystemTime;

    pub fn serialize<S: Serializer>(t: &SystemTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(epoch_millis(*t))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<SystemTime, D::Error> {
        u64::deserialize(d).map(from_epoch_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_roundtrip() {
        let t = from_epoch_millis(1_700_000_000_123);
        assert_eq!(epoch_millis(t), 1_700_000_000_123);
    }

    #[test]
    fn test_age_of_future_timestamp_is_zero() {
        let now = from_epoch_millis(10_000);
        let later = from_epoch_millis(20_000);
        assert_eq!(age(now, later), Duration::ZERO);
        assert_eq!(age(later, now), Duration::from_secs(10));
    }

    #[test]
    fn test_horizon_saturates() {
        let now = from_epoch_millis(1_000);
        assert_eq!(horizon(now, Duration::from_secs(3600)), UNIX_EPOCH);
    }
}
