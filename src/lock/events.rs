//! Lock lifecycle notifications.
//!
//! With the `emitter` feature a manager can carry an [`EventEmitter`]; the
//! manager and every handle it creates publish lifecycle events on it.
//! Listeners receive the payload as a JSON-encoded [`LockEvent`]:
//!
//! ```
//! # #[cfg(feature = "emitter")] {
//! use kvlock::{EventEmitter, InMemoryStore, Lock, LockManager, LockOptions, StoreLockManager};
//! use std::sync::Arc;
//!
//! let mut emitter = EventEmitter::new();
//! emitter.on("LockAcquired", |payload: String| {
//!     println!("acquired: {}", payload);
//! });
//!
//! let manager = StoreLockManager::new(Arc::new(InMemoryStore::new())).with_emitter(emitter);
//! let mut lock = manager.acquire("reports", &LockOptions::default()).unwrap();
//! lock.release().unwrap();
//! # }
//! ```
//!
//! [`EventEmitter`]: event_emitter_rs::EventEmitter

#[cfg(feature = "emitter")]
use std::sync::{Arc, Mutex};

#[cfg(feature = "emitter")]
use event_emitter_rs::EventEmitter;
use serde::{Deserialize, Serialize};

pub const LOCK_ACQUIRED: &str = "LockAcquired";
/// Acquisition gave up with the key still held by someone else.
pub const LOCK_CONTENDED: &str = "LockContended";
pub const LOCK_REACQUIRED: &str = "LockReacquired";
pub const LOCK_RELEASED: &str = "LockReleased";

/// Payload carried by every lock event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockEvent {
    pub key: String,
    /// Store calls made by the operation that produced the event.
    pub attempts: u32,
}

/// Event sink shared by a manager and the handles it creates.
///
/// A no-op unless an emitter was attached.
#[derive(Clone, Default)]
pub(crate) struct Notifier {
    #[cfg(feature = "emitter")]
    emitter: Option<Arc<Mutex<EventEmitter>>>,
}

impl Notifier {
    #[cfg(feature = "emitter")]
    pub(crate) fn with_emitter(emitter: EventEmitter) -> Self {
        Notifier {
            emitter: Some(Arc::new(Mutex::new(emitter))),
        }
    }

    #[cfg(feature = "emitter")]
    pub(crate) fn notify(&self, event_type: &str, key: &str, attempts: u32) {
        let Some(emitter) = &self.emitter else {
            return;
        };

        let event = LockEvent {
            key: key.to_string(),
            attempts,
        };
        let payload = match serde_json::to_string(&event) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::warn!(event_type, key, error = %err, "failed to encode lock event");
                return;
            }
        };

        match emitter.lock() {
            Ok(mut emitter) => {
                emitter.emit(event_type, payload);
            }
            Err(_) => tracing::warn!(event_type, key, "lock event emitter poisoned"),
        }
    }

    #[cfg(not(feature = "emitter"))]
    pub(crate) fn notify(&self, _event_type: &str, _key: &str, _attempts: u32) {}
}
