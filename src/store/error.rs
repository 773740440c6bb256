use thiserror::Error;

/// Error returned by a [`LockStore`](super::LockStore) call.
///
/// Covers transport and store-side faults only. "Key already exists" is not an
/// error at this layer; `set_if_absent` reports it as `Ok(false)`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store could not be reached (connect refused, timeout, broken pipe).
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store was reached but the operation failed.
    #[error("store backend error: {0}")]
    Backend(String),
}

#[cfg(feature = "redis-backend")]
impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error()
            || err.is_connection_dropped()
            || err.is_connection_refusal()
            || err.is_timeout()
        {
            StoreError::Unavailable(format!("redis: {}", err))
        } else {
            StoreError::Backend(format!("redis: {}", err))
        }
    }
}
