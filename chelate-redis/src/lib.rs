//! Redis-backed store for Chelate.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chelate_core::HashStore;
use redis::Commands;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("Redis error: {0}")]
pub struct RedisError(#[from] redis::RedisError);

/// A store backed by a Redis server.
///
/// Each namespace is one Redis hash; the six primitives map onto
/// HGET/HSET/HDEL/HEXISTS/HGETALL/DEL. One synchronous connection is shared
/// behind a mutex, so clones talk to the same server over the same socket.
/// Timeouts and reconnects are whatever the `redis` crate provides; no retry
/// layer is added here.
#[derive(Clone)]
pub struct RedisStore {
    conn: Arc<Mutex<redis::Connection>>,
}

impl RedisStore {
    /// Connects to a Redis server, e.g. `RedisStore::open("redis://127.0.0.1/")`.
    pub fn open(params: impl redis::IntoConnectionInfo) -> Result<Self, RedisError> {
        let client = redis::Client::open(params)?;
        let conn = client.get_connection()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

impl HashStore for RedisStore {
    type Error = RedisError;

    fn field_get(&self, ns: &str, field: &[u8]) -> Result<Option<Vec<u8>>, Self::Error> {
        let mut conn = self.conn.lock().unwrap();
        Ok(conn.hget(ns, field)?)
    }

    fn field_set(&self, ns: &str, field: &[u8], value: &[u8]) -> Result<(), Self::Error> {
        let mut conn = self.conn.lock().unwrap();
        let _: u64 = conn.hset(ns, field, value)?;
        Ok(())
    }

    fn field_delete(&self, ns: &str, field: &[u8]) -> Result<u64, Self::Error> {
        let mut conn = self.conn.lock().unwrap();
        Ok(conn.hdel(ns, field)?)
    }

    fn field_exists(&self, ns: &str, field: &[u8]) -> Result<bool, Self::Error> {
        let mut conn = self.conn.lock().unwrap();
        Ok(conn.hexists(ns, field)?)
    }

    fn all_fields(&self, ns: &str) -> Result<Vec<(Vec<u8>, Vec<u8>)>, Self::Error> {
        let mut conn = self.conn.lock().unwrap();
        let fields: HashMap<Vec<u8>, Vec<u8>> = conn.hgetall(ns)?;
        Ok(fields.into_iter().collect())
    }

    fn drop_namespace(&self, ns: &str) -> Result<(), Self::Error> {
        let mut conn = self.conn.lock().unwrap();
        let _: u64 = conn.del(ns)?;
        Ok(())
    }
}
