use crate::domain_port::*;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
enum Value {
    Str(String),
    Hash(HashMap<String, String>),
}

#[derive(Debug, Clone)]
struct Slot {
    value: Value,
    expires_at: Option<Instant>,
}

impl Slot {
    fn new(value: Value, ttl: Option<Duration>) -> Self {
        Slot {
            value,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        }
    }

    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// In-process store with the same observable semantics as the Redis adapter.
///
/// Expired keys are evicted lazily by the next operation that touches them.
/// Time is read from `tokio::time`, so tests may pause and advance the clock.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: DashMap<String, Slot>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn purge_expired(&self, key: &str) {
        let now = Instant::now();
        self.entries.remove_if(key, |_, slot| !slot.is_live(now));
    }

    fn wrong_type(key: &str) -> StoreError {
        StoreError::WrongType {
            key: key.to_owned(),
        }
    }
}

#[async_trait::async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.purge_expired(key);
        match self.entries.get(key) {
            Some(slot) => match &slot.value {
                Value::Str(s) => Ok(Some(s.clone())),
                Value::Hash(_) => Err(Self::wrong_type(key)),
            },
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        self.entries
            .insert(key.to_owned(), Slot::new(Value::Str(value.to_owned()), ttl));
        Ok(())
    }

    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, StoreError> {
        self.purge_expired(key);
        match self.entries.entry(key.to_owned()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(vacant) => {
                vacant.insert(Slot::new(Value::Str(value.to_owned()), Some(ttl)));
                Ok(true)
            }
        }
    }

    async fn delete(&self, keys: &[&str]) -> Result<u64, StoreError> {
        let mut removed = 0;
        for key in keys {
            self.purge_expired(key);
            if self.entries.remove(*key).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn delete_if_equals(&self, key: &str, expected: &str) -> Result<bool, StoreError> {
        self.purge_expired(key);
        let removed = self.entries.remove_if(key, |_, slot| {
            matches!(&slot.value, Value::Str(current) if current == expected)
        });
        Ok(removed.is_some())
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        self.purge_expired(key);
        Ok(self.entries.contains_key(key))
    }

    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        self.purge_expired(key);
        match self.entries.entry(key.to_owned()) {
            Entry::Occupied(mut occupied) => {
                let slot = occupied.get_mut();
                let Value::Str(current) = &slot.value else {
                    return Err(Self::wrong_type(key));
                };
                let next = current
                    .parse::<i64>()
                    .ok()
                    .and_then(|n| n.checked_add(1))
                    .ok_or_else(|| StoreError::NotAnInteger {
                        key: key.to_owned(),
                    })?;
                slot.value = Value::Str(next.to_string());
                Ok(next)
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Slot::new(Value::Str("1".to_owned()), None));
                Ok(1)
            }
        }
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        self.purge_expired(key);
        match self.entries.get_mut(key) {
            Some(mut slot) => {
                slot.expires_at = Some(Instant::now() + ttl);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<(), StoreError> {
        self.purge_expired(key);
        let mut slot = self
            .entries
            .entry(key.to_owned())
            .or_insert_with(|| Slot::new(Value::Hash(HashMap::new()), None));
        match &mut slot.value {
            Value::Hash(hash) => {
                hash.insert(field.to_owned(), value.to_owned());
                Ok(())
            }
            Value::Str(_) => Err(Self::wrong_type(key)),
        }
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>, StoreError> {
        self.purge_expired(key);
        match self.entries.get(key) {
            Some(slot) => match &slot.value {
                Value::Hash(hash) => Ok(hash.get(field).cloned()),
                Value::Str(_) => Err(Self::wrong_type(key)),
            },
            None => Ok(None),
        }
    }

    async fn hdel(&self, key: &str, fields: &[&str]) -> Result<u64, StoreError> {
        self.purge_expired(key);
        let (removed, now_empty) = match self.entries.get_mut(key) {
            Some(mut slot) => match &mut slot.value {
                Value::Hash(hash) => {
                    let removed = fields
                        .iter()
                        .filter(|field| hash.remove(**field).is_some())
                        .count() as u64;
                    (removed, hash.is_empty())
                }
                Value::Str(_) => return Err(Self::wrong_type(key)),
            },
            None => return Ok(0),
        };
        // an emptied hash disappears, as in Redis
        if now_empty {
            self.entries
                .remove_if(key, |_, slot| matches!(&slot.value, Value::Hash(h) if h.is_empty()));
        }
        Ok(removed)
    }

    async fn hget_all(&self, key: &str) -> Result<HashMap<String, String>, StoreError> {
        self.purge_expired(key);
        match self.entries.get(key) {
            Some(slot) => match &slot.value {
                Value::Hash(hash) => Ok(hash.clone()),
                Value::Str(_) => Err(Self::wrong_type(key)),
            },
            None => Ok(HashMap::new()),
        }
    }

    async fn hexists(&self, key: &str, field: &str) -> Result<bool, StoreError> {
        Ok(self.hget(key, field).await?.is_some())
    }

    async fn hkeys(&self, key: &str) -> Result<Vec<String>, StoreError> {
        Ok(self.hget_all(key).await?.into_keys().collect())
    }
}
