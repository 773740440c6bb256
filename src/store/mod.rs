//! Key-value store seam used by the lock protocol.
//!
//! The lock only needs two atomic operations from a store: create a key if it
//! is absent (optionally with a time-to-live) and delete keys unconditionally.
//! Anything that can offer those, a Redis server, an etcd cluster or a
//! `HashMap` behind a mutex, can back a lock.

mod error;
mod in_memory;
#[cfg(feature = "redis-backend")]
mod redis;

pub use error::StoreError;
pub use in_memory::InMemoryStore;
#[cfg(feature = "redis-backend")]
pub use self::redis::RedisStore;

use std::sync::Arc;
use std::time::Duration;

/// The two store primitives the lock protocol is built on.
///
/// Implementations must make `set_if_absent` atomic: of any number of
/// concurrent calls for an absent key, exactly one observes `Ok(true)`.
pub trait LockStore: Send + Sync {
    /// Set `key` to `value` only if it does not exist yet.
    ///
    /// Returns `Ok(true)` when the key was newly created and `Ok(false)` when
    /// it already existed. With `ttl = Some(d)` the key expires after `d`;
    /// with `None` it persists until deleted.
    fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<bool, StoreError>;

    /// Delete every key in `keys`, returning how many were actually removed.
    ///
    /// Missing keys are not an error and count as zero.
    fn delete(&self, keys: &[&str]) -> Result<u64, StoreError>;
}

impl<T: LockStore + ?Sized> LockStore for Arc<T> {
    fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<bool, StoreError> {
        (**self).set_if_absent(key, value, ttl)
    }

    fn delete(&self, keys: &[&str]) -> Result<u64, StoreError> {
        (**self).delete(keys)
    }
}

impl<T: LockStore + ?Sized> LockStore for &T {
    fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<bool, StoreError> {
        (**self).set_if_absent(key, value, ttl)
    }

    fn delete(&self, keys: &[&str]) -> Result<u64, StoreError> {
        (**self).delete(keys)
    }
}
