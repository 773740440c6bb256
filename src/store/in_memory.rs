use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use super::{LockStore, StoreError};

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map(|at| at > now).unwrap_or(true)
    }
}

/// In-process store backed by a `HashMap` behind a `Mutex`.
///
/// Honors the same contract as a networked store: `set_if_absent` is atomic
/// under the mutex, and entries with an elapsed deadline behave as absent for
/// every operation. Expired entries are purged lazily when touched.
///
/// Cloning produces another handle to the same storage, so one instance can be
/// shared by several lock managers to simulate independent processes.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        InMemoryStore {
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn entries(&self) -> Result<MutexGuard<'_, HashMap<String, Entry>>, StoreError> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Backend("in-memory store poisoned".into()))
    }

    /// Whether `key` is present and not expired.
    pub fn contains(&self, key: &str) -> bool {
        let now = Instant::now();
        self.entries()
            .map(|entries| entries.get(key).map(|e| e.is_live(now)).unwrap_or(false))
            .unwrap_or(false)
    }

    /// Value stored under `key`, if present and not expired.
    pub fn get(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        let entries = self.entries().ok()?;
        entries
            .get(key)
            .filter(|e| e.is_live(now))
            .map(|e| e.value.clone())
    }

    /// Remaining time-to-live of `key`.
    ///
    /// `None` if the key is absent, `Some(None)` if it never expires.
    pub fn ttl(&self, key: &str) -> Option<Option<Duration>> {
        let now = Instant::now();
        let entries = self.entries().ok()?;
        let entry = entries.get(key).filter(|e| e.is_live(now))?;
        Some(entry.expires_at.map(|at| at.saturating_duration_since(now)))
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries()
            .map(|entries| entries.values().filter(|e| e.is_live(now)).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LockStore for InMemoryStore {
    fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<bool, StoreError> {
        let now = Instant::now();
        let mut entries = self.entries()?;

        if entries.get(key).map(|e| e.is_live(now)).unwrap_or(false) {
            return Ok(false);
        }

        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                // A ttl past the representable range never expires.
                expires_at: ttl.and_then(|ttl| now.checked_add(ttl)),
            },
        );
        Ok(true)
    }

    fn delete(&self, keys: &[&str]) -> Result<u64, StoreError> {
        let now = Instant::now();
        let mut entries = self.entries()?;

        let mut deleted = 0;
        for key in keys {
            if let Some(entry) = entries.remove(*key) {
                if entry.is_live(now) {
                    deleted += 1;
                }
            }
        }
        Ok(deleted)
    }
}
