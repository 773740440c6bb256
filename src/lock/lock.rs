use std::sync::Arc;

use super::events::{Notifier, LOCK_REACQUIRED, LOCK_RELEASED};
use super::{LockError, LockFailure, LockResult};
use crate::store::LockStore;

/// Value written under a lock key. Only the key's presence matters.
pub(crate) const LOCK_MARKER: &str = "1";

/// Trait for a single acquired lock.
///
/// A handle is a capability to act on a key, not proof that the caller still
/// holds it: the key may have expired, or been deleted or replaced by another
/// client, without the handle noticing. Store-backed locks use
/// [`StoreLock`]; other backends (Postgres advisory locks, etcd leases) can
/// implement the same trait.
pub trait Lock: Send {
    /// The resource key this lock is bound to.
    fn key(&self) -> &str;

    /// Re-assert the lock with a single attempt.
    ///
    /// Fails if the key is currently present.
    fn reacquire(&mut self) -> LockResult<()>;

    /// Release the lock. Releasing an absent key succeeds.
    fn release(&mut self) -> LockResult<()>;
}

/// Handle to a key acquired through a [`LockStore`].
///
/// Created only by [`StoreLockManager`](super::StoreLockManager). Operations
/// take `&mut self`; share a handle across threads only behind your own
/// synchronization.
///
/// Dropping a handle does not release it. The key stays in the store until it
/// expires or someone deletes it.
///
/// ## Known gap
/// [`release`](Lock::release) deletes the key unconditionally. If this
/// handle's key expired and another client acquired it, releasing here evicts
/// that client's lock.
pub struct StoreLock<S: LockStore + ?Sized> {
    store: Arc<S>,
    key: String,
    notifier: Notifier,
}

impl<S: LockStore + ?Sized> StoreLock<S> {
    pub(crate) fn new(store: Arc<S>, key: String, notifier: Notifier) -> Self {
        StoreLock {
            store,
            key,
            notifier,
        }
    }

    /// The store this lock acts on.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }
}

impl<S: LockStore + ?Sized> Lock for StoreLock<S> {
    fn key(&self) -> &str {
        &self.key
    }

    /// Set the key again with no expiration.
    ///
    /// Unlike the initial acquisition, the key written here never expires on
    /// its own; it persists until released.
    fn reacquire(&mut self) -> LockResult<()> {
        let created = self
            .store
            .set_if_absent(&self.key, LOCK_MARKER, None)
            .map_err(|e| LockError::Reacquire {
                key: self.key.clone(),
                cause: LockFailure::Store(e),
            })?;

        if !created {
            tracing::debug!(key = %self.key, "reacquire refused, key already held");
            return Err(LockError::Reacquire {
                key: self.key.clone(),
                cause: LockFailure::Held,
            });
        }

        tracing::debug!(key = %self.key, "lock reacquired");
        self.notifier.notify(LOCK_REACQUIRED, &self.key, 1);
        Ok(())
    }

    fn release(&mut self) -> LockResult<()> {
        let deleted = self
            .store
            .delete(&[self.key.as_str()])
            .map_err(|e| LockError::Release {
                key: self.key.clone(),
                source: e,
            })?;

        tracing::debug!(key = %self.key, deleted, "lock released");
        self.notifier.notify(LOCK_RELEASED, &self.key, 1);
        Ok(())
    }
}

impl<S: LockStore + ?Sized> std::fmt::Debug for StoreLock<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreLock").field("key", &self.key).finish()
    }
}
