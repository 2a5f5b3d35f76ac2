use crate::domain_port::StoreError;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("lock not acquired: {key}")]
    NotAcquired { key: String },
    #[error("invalid lock argument: {0}")]
    InvalidArgument(&'static str),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("locked work failed: {0:#}")]
    Work(anyhow::Error),
}

#[derive(Debug, Clone, Copy)]
pub struct LockOptions {
    /// Lower bound for the refresh period; keep it well below the TTLs in use.
    pub min_refresh_interval: Duration,
    /// Upper bound on the release call, independent of the caller.
    pub release_timeout: Duration,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            min_refresh_interval: Duration::from_secs(1),
            release_timeout: Duration::from_secs(5),
        }
    }
}
