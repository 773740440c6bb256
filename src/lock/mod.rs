mod cancel;
mod error;
mod events;
#[allow(clippy::module_inception)]
mod lock;
mod lock_manager;
mod options;

pub use cancel::CancelToken;
pub use error::{LockError, LockFailure, LockResult};
pub use events::{LockEvent, LOCK_ACQUIRED, LOCK_CONTENDED, LOCK_REACQUIRED, LOCK_RELEASED};
pub use lock::{Lock, StoreLock};
pub use lock_manager::{LockManager, StoreLockManager};
pub use options::{LockOptions, DEFAULT_KEY_EXPIRATION, DEFAULT_RETRY_DELAY};
