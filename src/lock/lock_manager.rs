use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[cfg(feature = "emitter")]
use event_emitter_rs::EventEmitter;

use super::events::{Notifier, LOCK_ACQUIRED, LOCK_CONTENDED};
use super::lock::LOCK_MARKER;
use super::{CancelToken, Lock, LockError, LockFailure, LockOptions, LockResult, StoreLock};
use crate::store::LockStore;

/// Factory trait for acquiring locks on string keys.
///
/// `StoreLockManager` is the store-backed implementation. Code that only needs
/// "give me a lock on this key" can depend on this trait and accept other
/// backends in tests.
pub trait LockManager: Send + Sync {
    /// The concrete lock type returned by this manager.
    type Lock: Lock;

    /// Acquire `key`, blocking through the retries allowed by `options`.
    fn acquire(&self, key: &str, options: &LockOptions) -> LockResult<Self::Lock>;
}

/// Acquires locks by creating keys in a [`LockStore`].
///
/// ## Protocol
/// Each attempt is one `set_if_absent(key, "1", key_expiration)` call:
/// - newly created: the lock is ours, a [`StoreLock`] is returned
/// - already present, or the store call failed: the attempt is spent; with
///   attempts left, sleep `retry_delay` and try again
///
/// An acquisition makes at most `retry_count + 1` store calls. The wait is a
/// fixed interval with no growth and no jitter. There is no fairness between
/// competing callers; whoever the store sees first wins.
///
/// The manager keeps no state besides the shared store, so one instance can
/// serve any number of keys and threads.
///
/// ## Example
/// ```
/// use kvlock::{InMemoryStore, Lock, LockManager, LockOptions, StoreLockManager};
/// use std::sync::Arc;
///
/// let manager = StoreLockManager::new(Arc::new(InMemoryStore::new()));
///
/// let mut lock = manager.acquire("reports:nightly", &LockOptions::default()).unwrap();
/// // ... exclusive work ...
/// lock.release().unwrap();
/// ```
pub struct StoreLockManager<S: LockStore + ?Sized> {
    store: Arc<S>,
    notifier: Notifier,
}

impl<S: LockStore + ?Sized> Clone for StoreLockManager<S> {
    fn clone(&self) -> Self {
        StoreLockManager {
            store: Arc::clone(&self.store),
            notifier: self.notifier.clone(),
        }
    }
}

/// How the wait between attempts is performed.
enum Pause<'a> {
    Sleep,
    Cancellable(&'a CancelToken),
}

impl Pause<'_> {
    fn is_cancelled(&self) -> bool {
        match self {
            Pause::Sleep => false,
            Pause::Cancellable(token) => token.is_cancelled(),
        }
    }

    /// Returns `false` if the wait was cut short by cancellation.
    fn wait(&self, delay: Duration) -> bool {
        match self {
            Pause::Sleep => {
                thread::sleep(delay);
                true
            }
            Pause::Cancellable(token) => !token.wait_timeout(delay),
        }
    }
}

impl<S: LockStore + ?Sized> StoreLockManager<S> {
    pub fn new(store: Arc<S>) -> Self {
        StoreLockManager {
            store,
            notifier: Notifier::default(),
        }
    }

    /// Publish lifecycle events (`LockAcquired`, `LockContended`,
    /// `LockReacquired`, `LockReleased`) on `emitter`.
    #[cfg(feature = "emitter")]
    pub fn with_emitter(mut self, emitter: EventEmitter) -> Self {
        self.notifier = Notifier::with_emitter(emitter);
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Like [`LockManager::acquire`], but gives up once `cancel` fires.
    ///
    /// The token is checked before every attempt and observed during the wait
    /// between attempts. A store call already in flight is never interrupted.
    /// On cancellation the error is [`LockError::Cancelled`].
    pub fn acquire_cancellable(
        &self,
        key: &str,
        options: &LockOptions,
        cancel: &CancelToken,
    ) -> LockResult<StoreLock<S>> {
        self.run(key, options, Pause::Cancellable(cancel))
    }

    fn run(&self, key: &str, options: &LockOptions, pause: Pause<'_>) -> LockResult<StoreLock<S>> {
        if key.is_empty() {
            return Err(LockError::InvalidKey(key.to_string()));
        }

        let options = options.resolved();
        let total = options.attempts();
        let mut remaining = total;

        loop {
            if pause.is_cancelled() {
                let attempts = total - remaining;
                tracing::warn!(key, attempts, "lock acquisition cancelled");
                return Err(LockError::Cancelled {
                    key: key.to_string(),
                    attempts,
                });
            }

            let attempt = total - remaining + 1;
            tracing::debug!(key, attempt, total, "attempting lock");

            let failure = match self
                .store
                .set_if_absent(key, LOCK_MARKER, Some(options.key_expiration))
            {
                Ok(true) => {
                    let ttl_ms =
                        u64::try_from(options.key_expiration.as_millis()).unwrap_or(u64::MAX);
                    tracing::info!(key, attempt, ttl_ms, "lock acquired");
                    self.notifier.notify(LOCK_ACQUIRED, key, attempt);
                    return Ok(StoreLock::new(
                        Arc::clone(&self.store),
                        key.to_string(),
                        self.notifier.clone(),
                    ));
                }
                Ok(false) => LockFailure::Held,
                Err(err) => {
                    tracing::debug!(key, attempt, error = %err, "lock attempt failed");
                    LockFailure::Store(err)
                }
            };

            remaining -= 1;
            if remaining == 0 {
                tracing::warn!(key, attempts = total, cause = %failure, "lock acquisition failed");
                if failure == LockFailure::Held {
                    self.notifier.notify(LOCK_CONTENDED, key, total);
                }
                return Err(LockError::Acquire {
                    key: key.to_string(),
                    attempts: total,
                    cause: failure,
                });
            }

            if !pause.wait(options.retry_delay) {
                let attempts = total - remaining;
                tracing::warn!(key, attempts, "lock acquisition cancelled");
                return Err(LockError::Cancelled {
                    key: key.to_string(),
                    attempts,
                });
            }
        }
    }
}

impl<S: LockStore + ?Sized> LockManager for StoreLockManager<S> {
    type Lock = StoreLock<S>;

    fn acquire(&self, key: &str, options: &LockOptions) -> LockResult<StoreLock<S>> {
        self.run(key, options, Pause::Sleep)
    }
}
