use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::LockResult;

/// Wait between attempts when none is configured.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Store-side expiration of an acquired key when none is configured.
pub const DEFAULT_KEY_EXPIRATION: Duration = Duration::from_secs(300);

/// Options controlling a lock acquisition.
///
/// Any field left at zero falls back to its default when the options are
/// [resolved](LockOptions::resolved):
///
/// | field            | default |
/// |------------------|---------|
/// | `retry_count`    | 0 (single attempt) |
/// | `retry_delay`    | 100 ms  |
/// | `key_expiration` | 300 s   |
///
/// `LockOptions::default()` is the all-zero, unresolved value.
///
/// In serialized form the durations are integer milliseconds:
///
/// ```
/// use kvlock::LockOptions;
/// use std::time::Duration;
///
/// let options = LockOptions::from_json(r#"{"retry_count": 3, "retry_delay_ms": 250}"#).unwrap();
/// let resolved = options.resolved();
/// assert_eq!(resolved.retry_count, 3);
/// assert_eq!(resolved.retry_delay, Duration::from_millis(250));
/// assert_eq!(resolved.key_expiration, Duration::from_secs(300));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockOptions {
    /// Additional attempts after the first failed one.
    pub retry_count: u32,

    /// Fixed wait between attempts. Never grows, never jittered.
    #[serde(rename = "retry_delay_ms", with = "millis")]
    pub retry_delay: Duration,

    /// Time-to-live the store applies to the acquired key.
    #[serde(rename = "key_expiration_ms", with = "millis")]
    pub key_expiration: Duration,
}

impl LockOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn with_key_expiration(mut self, key_expiration: Duration) -> Self {
        self.key_expiration = key_expiration;
        self
    }

    /// Parse options from JSON. Missing fields stay at zero.
    pub fn from_json(json: &str) -> LockResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Copy of these options with every zero field replaced by its default.
    pub fn resolved(&self) -> Self {
        LockOptions {
            retry_count: self.retry_count,
            retry_delay: if self.retry_delay.is_zero() {
                DEFAULT_RETRY_DELAY
            } else {
                self.retry_delay
            },
            key_expiration: if self.key_expiration.is_zero() {
                DEFAULT_KEY_EXPIRATION
            } else {
                self.key_expiration
            },
        }
    }

    /// Total number of store calls an acquisition may make.
    pub fn attempts(&self) -> u32 {
        self.retry_count.saturating_add(1)
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis().min(u64::MAX as u128) as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
