//! Redis-backed store.
//!
//! `set_if_absent` maps to `SET key value NX [PX ms]` and `delete` to
//! `DEL key...`. Both are single commands, so Redis provides the atomicity the
//! lock protocol relies on.

use std::sync::Mutex;
use std::time::Duration;

use ::redis::{Client, Cmd, Commands, Connection, Value};

use super::{LockStore, StoreError};

/// Store talking to a single Redis endpoint over a synchronous connection.
///
/// One connection is shared by every lock created from this store; calls are
/// serialized on it.
pub struct RedisStore {
    conn: Mutex<Connection>,
}

impl RedisStore {
    /// Connect to Redis at `redis_url`.
    ///
    /// Example URLs:
    /// - `redis://127.0.0.1/`
    /// - `rediss://host:6379/`
    pub fn open(redis_url: &str) -> Result<Self, StoreError> {
        let client = Client::open(redis_url)
            .map_err(|e| StoreError::Backend(format!("failed to create redis client: {e}")))?;
        let conn = client
            .get_connection()
            .map_err(|e| StoreError::Unavailable(format!("failed to connect redis: {e}")))?;
        tracing::debug!(url = redis_url, "connected to redis");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&mut Connection) -> ::redis::RedisResult<T>,
    ) -> Result<T, StoreError> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|_| StoreError::Backend("redis connection poisoned".into()))?;
        f(&mut conn).map_err(StoreError::from)
    }
}

/// `SET key value NX [PX ms]`.
fn set_nx_command(key: &str, value: &str, ttl: Option<Duration>) -> Cmd {
    let mut cmd = ::redis::cmd("SET");
    cmd.arg(key).arg(value).arg("NX");
    if let Some(ttl) = ttl {
        cmd.arg("PX").arg(px_millis(ttl));
    }
    cmd
}

/// Milliseconds for `PX`: at least 1 (PX rejects zero), saturating at `u64::MAX`.
fn px_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

/// A nil reply means NX refused the write.
fn was_created(reply: &Value) -> bool {
    !matches!(reply, Value::Nil)
}

impl LockStore for RedisStore {
    fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<bool, StoreError> {
        self.with_conn(|conn| {
            let reply: Value = set_nx_command(key, value, ttl).query(conn)?;
            Ok(was_created(&reply))
        })
    }

    fn delete(&self, keys: &[&str]) -> Result<u64, StoreError> {
        if keys.is_empty() {
            return Ok(0);
        }
        self.with_conn(|conn| conn.del(keys))
    }
}
