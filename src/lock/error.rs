use thiserror::Error;

use crate::store::StoreError;

/// Result type for lock operations.
pub type LockResult<T> = Result<T, LockError>;

/// Why a set-if-absent attempt did not produce the lock.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LockFailure {
    /// The store answered, but the key was already present.
    #[error("key already held")]
    Held,

    /// The store call itself failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors that can occur during lock operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LockError {
    /// Every attempt of an acquisition failed; `cause` is the last outcome.
    #[error("acquire lock {key} failed after {attempts} attempt(s): {cause}")]
    Acquire {
        key: String,
        attempts: u32,
        #[source]
        cause: LockFailure,
    },

    /// A handle could not re-assert its key.
    #[error("reacquire lock {key} failed: {cause}")]
    Reacquire {
        key: String,
        #[source]
        cause: LockFailure,
    },

    /// The store rejected the delete issued by a release.
    #[error("release lock {key} failed: {source}")]
    Release {
        key: String,
        #[source]
        source: StoreError,
    },

    /// A cancellable acquisition was abandoned before it succeeded.
    #[error("acquire lock {key} cancelled after {attempts} attempt(s)")]
    Cancelled { key: String, attempts: u32 },

    /// The key is not usable as a lock identifier.
    #[error("invalid lock key: {0:?}")]
    InvalidKey(String),

    /// Lock options could not be parsed.
    #[error("invalid lock options: {0}")]
    InvalidOptions(String),
}

impl LockError {
    /// Key the failed operation was working on, when there is one.
    pub fn key(&self) -> Option<&str> {
        match self {
            LockError::Acquire { key, .. }
            | LockError::Reacquire { key, .. }
            | LockError::Release { key, .. }
            | LockError::Cancelled { key, .. } => Some(key),
            LockError::InvalidKey(key) => Some(key),
            LockError::InvalidOptions(_) => None,
        }
    }

    /// True when the lock is busy: the store answered and the key was taken.
    pub fn is_contended(&self) -> bool {
        matches!(
            self,
            LockError::Acquire {
                cause: LockFailure::Held,
                ..
            } | LockError::Reacquire {
                cause: LockFailure::Held,
                ..
            }
        )
    }

    /// True when the store itself failed, as opposed to the key being taken.
    pub fn is_store_failure(&self) -> bool {
        matches!(
            self,
            LockError::Acquire {
                cause: LockFailure::Store(_),
                ..
            } | LockError::Reacquire {
                cause: LockFailure::Store(_),
                ..
            } | LockError::Release { .. }
        )
    }
}

impl From<serde_json::Error> for LockError {
    fn from(err: serde_json::Error) -> Self {
        LockError::InvalidOptions(err.to_string())
    }
}
