//! # kvlock
//!
//! Mutual exclusion between processes through a shared key-value store.
//!
//! A lock on a resource is a key in the store. Acquiring creates the key with
//! an atomic set-if-absent and an expiration; releasing deletes it. Whoever
//! creates the key first holds the lock until they delete it or the store
//! expires it.
//!
//! - [`StoreLockManager`] runs the acquisition: up to `retry_count + 1`
//!   attempts, a fixed `retry_delay` apart.
//! - [`StoreLock`] is the handle it returns, with [`Lock::reacquire`] and
//!   [`Lock::release`].
//! - [`LockStore`] is the store seam. [`InMemoryStore`] ships for tests and
//!   single-process use; `RedisStore` is available with the `redis-backend`
//!   feature.
//!
//! ```
//! use kvlock::{InMemoryStore, Lock, LockManager, LockOptions, StoreLockManager};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let store = Arc::new(InMemoryStore::new());
//! let manager = StoreLockManager::new(store);
//!
//! let options = LockOptions::new()
//!     .with_retry_count(3)
//!     .with_retry_delay(Duration::from_millis(10))
//!     .with_key_expiration(Duration::from_secs(30));
//!
//! let mut lock = manager.acquire("invoices:2024-06", &options).unwrap();
//!
//! // A second client sees the key as held.
//! let busy = manager.acquire("invoices:2024-06", &LockOptions::default()).unwrap_err();
//! assert!(busy.is_contended());
//!
//! lock.release().unwrap();
//! ```
//!
//! ## Caveats
//! - No fencing tokens and no owner check on release: a handle whose key
//!   expired and was taken by another client will delete that client's key
//!   when released.
//! - No lease renewal. Pick a `key_expiration` longer than the critical
//!   section.
//! - [`Lock::reacquire`] writes the key without an expiration.

mod lock;
pub mod store;

pub use lock::{
    CancelToken, Lock, LockError, LockEvent, LockFailure, LockManager, LockOptions, LockResult,
    StoreLock, StoreLockManager, DEFAULT_KEY_EXPIRATION, DEFAULT_RETRY_DELAY, LOCK_ACQUIRED,
    LOCK_CONTENDED, LOCK_REACQUIRED, LOCK_RELEASED,
};
#[cfg(feature = "redis-backend")]
pub use store::RedisStore;
pub use store::{InMemoryStore, LockStore, StoreError};

// Re-export the EventEmitter from the event_emitter_rs crate
#[cfg(feature = "emitter")]
pub use event_emitter_rs::EventEmitter;
