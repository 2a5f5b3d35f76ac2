use crate::application_port::*;
use crate::domain_model::LockHandle;
use crate::domain_port::KeyValueStore;
use crate::logger::*;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Store-backed mutual exclusion across service instances.
///
/// The lock is kept alive by a background refresher while the caller's work
/// runs and is released with a compare-and-delete once the work returns. A
/// holder that crashes leaves the key to expire after its TTL.
pub struct DistributedLock {
    store: Arc<dyn KeyValueStore>,
    options: LockOptions,
}

impl DistributedLock {
    pub fn new(store: Arc<dyn KeyValueStore>, options: LockOptions) -> Self {
        Self { store, options }
    }

    /// Random opaque value for callers without a natural owner id.
    pub fn new_fencing_value() -> String {
        nanoid::nanoid!()
    }

    /// Runs `work` while holding `key`.
    ///
    /// Fails with [`LockError::NotAcquired`] without running `work` when the key
    /// is already held; there is no retry. Losing ownership mid-way stops the
    /// refresher but does not interrupt `work`, so long-running work should
    /// carry its own cancellation.
    pub async fn with_lock<T, F, Fut>(
        &self,
        key: &str,
        fencing_value: &str,
        ttl: Duration,
        work: F,
    ) -> Result<T, LockError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        if key.is_empty() {
            return Err(LockError::InvalidArgument("key must not be empty"));
        }
        if fencing_value.is_empty() {
            return Err(LockError::InvalidArgument("fencing value must not be empty"));
        }
        if ttl.is_zero() {
            return Err(LockError::InvalidArgument("ttl must be positive"));
        }
        let handle = LockHandle::new(key, fencing_value, ttl);

        if !self.store.set_nx(&handle.key, &handle.fencing_value, ttl).await? {
            debug!(key = %handle.key, "lock is held elsewhere");
            return Err(LockError::NotAcquired { key: handle.key });
        }
        debug!(key = %handle.key, ttl_ms = ttl.as_millis() as u64, "lock acquired");

        let cancel = CancellationToken::new();
        let refresher = tokio::spawn(refresh_loop(
            self.store.clone(),
            handle.clone(),
            handle.refresh_interval(self.options.min_refresh_interval),
            cancel.clone(),
        ));
        // stops the refresher even if this future is dropped mid-work
        let stop_refresher = cancel.drop_guard();

        let result = work().await;

        drop(stop_refresher);
        if let Err(e) = refresher.await {
            warn!(key = %handle.key, error = %e, "lock refresher ended abnormally");
        }
        self.release(&handle).await;

        result.map_err(LockError::Work)
    }

    async fn release(&self, handle: &LockHandle) {
        let release = self
            .store
            .delete_if_equals(&handle.key, &handle.fencing_value);
        match tokio::time::timeout(self.options.release_timeout, release).await {
            Ok(Ok(true)) => debug!(key = %handle.key, "lock released"),
            Ok(Ok(false)) => warn!(key = %handle.key, "lock no longer held at release"),
            Ok(Err(e)) => {
                warn!(key = %handle.key, error = %e, "failed to release lock, it will expire")
            }
            Err(_) => warn!(key = %handle.key, "timed out releasing lock, it will expire"),
        }
    }
}

async fn refresh_loop(
    store: Arc<dyn KeyValueStore>,
    handle: LockHandle,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            _ = ticker.tick() => {}
        }

        match store.get(&handle.key).await {
            Ok(Some(current)) if current == handle.fencing_value => {
                match store.expire(&handle.key, handle.ttl).await {
                    Ok(true) => trace!(key = %handle.key, "lock refreshed"),
                    Ok(false) => {
                        warn!(key = %handle.key, "lock expired before refresh, stop refreshing");
                        return;
                    }
                    Err(e) => {
                        warn!(key = %handle.key, error = %e, "lock refresh failed, stop refreshing");
                        return;
                    }
                }
            }
            Ok(_) => {
                warn!(key = %handle.key, "lock ownership lost, stop refreshing");
                return;
            }
            Err(e) => {
                warn!(key = %handle.key, error = %e, "lock ownership check failed, stop refreshing");
                return;
            }
        }
    }
}
