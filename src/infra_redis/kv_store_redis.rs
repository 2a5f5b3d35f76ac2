use crate::domain_port::*;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, RedisError, Script};
use std::collections::HashMap;
use std::time::Duration;

const COMPARE_AND_DELETE: &str = include_str!("compare_and_delete.lua");

pub struct RedisKeyValueStore {
    conn: ConnectionManager,
    compare_and_delete: Script,
}

impl RedisKeyValueStore {
    pub fn new(conn: ConnectionManager) -> Self {
        RedisKeyValueStore {
            conn,
            compare_and_delete: Script::new(COMPARE_AND_DELETE),
        }
    }

    /// Opens a managed connection and checks it with a PING.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url).map_err(store_err)?;
        let mut conn = client.get_connection_manager().await.map_err(store_err)?;
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(store_err)?;
        Ok(Self::new(conn))
    }
}

fn store_err(e: RedisError) -> StoreError {
    StoreError::Backend(e.to_string())
}

// Redis rejects a zero PX, so sub-millisecond TTLs round up.
fn millis(ttl: Duration) -> u64 {
    ttl.as_millis().clamp(1, u64::MAX as u128) as u64
}

#[async_trait::async_trait]
impl KeyValueStore for RedisKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        conn.get(key).await.map_err(store_err)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        match ttl {
            Some(ttl) => conn.pset_ex(key, value, millis(ttl)).await.map_err(store_err),
            None => conn.set(key, value).await.map_err(store_err),
        }
    }

    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("PX")
            .arg(millis(ttl))
            .query_async(&mut conn)
            .await
            .map_err(store_err)?;
        Ok(reply.is_some())
    }

    async fn delete(&self, keys: &[&str]) -> Result<u64, StoreError> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn.clone();
        conn.del(keys).await.map_err(store_err)
    }

    async fn delete_if_equals(&self, key: &str, expected: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let deleted: i64 = self
            .compare_and_delete
            .key(key)
            .arg(expected)
            .invoke_async(&mut conn)
            .await
            .map_err(store_err)?;
        Ok(deleted == 1)
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        conn.exists(key).await.map_err(store_err)
    }

    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        let mut conn = self.conn.clone();
        conn.incr(key, 1).await.map_err(store_err)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        conn.pexpire(key, millis(ttl) as i64)
            .await
            .map_err(store_err)
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: () = conn.hset(key, field, value).await.map_err(store_err)?;
        Ok(())
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        conn.hget(key, field).await.map_err(store_err)
    }

    async fn hdel(&self, key: &str, fields: &[&str]) -> Result<u64, StoreError> {
        if fields.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn.clone();
        conn.hdel(key, fields).await.map_err(store_err)
    }

    async fn hget_all(&self, key: &str) -> Result<HashMap<String, String>, StoreError> {
        let mut conn = self.conn.clone();
        conn.hgetall(key).await.map_err(store_err)
    }

    async fn hexists(&self, key: &str, field: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        conn.hexists(key, field).await.map_err(store_err)
    }

    async fn hkeys(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let mut conn = self.conn.clone();
        conn.hkeys(key).await.map_err(store_err)
    }
}
