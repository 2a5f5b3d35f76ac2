use std::time::Duration;

// a zero period would make the refresher's ticker panic
const MIN_REFRESH_INTERVAL: Duration = Duration::from_millis(1);

/// Ownership record for a distributed lock held in the key-value store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockHandle {
    pub key: String,
    pub fencing_value: String,
    pub ttl: Duration,
}

impl LockHandle {
    pub fn new(key: impl Into<String>, fencing_value: impl Into<String>, ttl: Duration) -> Self {
        Self {
            key: key.into(),
            fencing_value: fencing_value.into(),
            ttl,
        }
    }

    /// Half the TTL, never below `floor` nor below one millisecond.
    pub fn refresh_interval(&self, floor: Duration) -> Duration {
        (self.ttl / 2).max(floor).max(MIN_REFRESH_INTERVAL)
    }
}
