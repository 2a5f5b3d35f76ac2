use std::collections::HashMap;
use std::time::Duration;

/// Shared key-value store with per-key TTL and atomic conditional writes.
///
/// Every operation is independently atomic at the store level; callers get no
/// multi-key transactions.
#[async_trait::async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Overwrites `key`. `ttl = None` stores the value without expiry.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError>;

    /// Stores `value` only if `key` is absent. Returns whether the write happened.
    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, StoreError>;

    /// Returns the number of keys that existed.
    async fn delete(&self, keys: &[&str]) -> Result<u64, StoreError>;

    /// Deletes `key` only while it still holds `expected`.
    async fn delete_if_equals(&self, key: &str, expected: &str) -> Result<bool, StoreError>;

    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    async fn incr(&self, key: &str) -> Result<i64, StoreError>;

    /// Resets the TTL of an existing key. Returns `false` when the key is gone.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError>;

    // hash operations

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<(), StoreError>;
    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>, StoreError>;
    async fn hdel(&self, key: &str, fields: &[&str]) -> Result<u64, StoreError>;
    async fn hget_all(&self, key: &str) -> Result<HashMap<String, String>, StoreError>;
    async fn hexists(&self, key: &str, field: &str) -> Result<bool, StoreError>;
    async fn hkeys(&self, key: &str) -> Result<Vec<String>, StoreError>;
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("key `{key}` holds a value of the wrong type")]
    WrongType { key: String },
    #[error("value at `{key}` is not an integer")]
    NotAnInteger { key: String },
    #[error("store error: {0}")]
    Backend(String),
}
