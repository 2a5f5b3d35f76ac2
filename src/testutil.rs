use crate::domain_port::*;
use std::collections::HashMap;
use std::time::Duration;

/// Store whose every call fails, standing in for an unreachable backend.
pub struct FailingStore;

fn down<T>() -> Result<T, StoreError> {
    Err(StoreError::Backend("connection refused".to_string()))
}

#[async_trait::async_trait]
impl KeyValueStore for FailingStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        down()
    }
    async fn set(&self, _key: &str, _value: &str, _ttl: Option<Duration>) -> Result<(), StoreError> {
        down()
    }
    async fn set_nx(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<bool, StoreError> {
        down()
    }
    async fn delete(&self, _keys: &[&str]) -> Result<u64, StoreError> {
        down()
    }
    async fn delete_if_equals(&self, _key: &str, _expected: &str) -> Result<bool, StoreError> {
        down()
    }
    async fn exists(&self, _key: &str) -> Result<bool, StoreError> {
        down()
    }
    async fn incr(&self, _key: &str) -> Result<i64, StoreError> {
        down()
    }
    async fn expire(&self, _key: &str, _ttl: Duration) -> Result<bool, StoreError> {
        down()
    }
    async fn hset(&self, _key: &str, _field: &str, _value: &str) -> Result<(), StoreError> {
        down()
    }
    async fn hget(&self, _key: &str, _field: &str) -> Result<Option<String>, StoreError> {
        down()
    }
    async fn hdel(&self, _key: &str, _fields: &[&str]) -> Result<u64, StoreError> {
        down()
    }
    async fn hget_all(&self, _key: &str) -> Result<HashMap<String, String>, StoreError> {
        down()
    }
    async fn hexists(&self, _key: &str, _field: &str) -> Result<bool, StoreError> {
        down()
    }
    async fn hkeys(&self, _key: &str) -> Result<Vec<String>, StoreError> {
        down()
    }
}
