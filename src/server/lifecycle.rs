use crate::logger::*;
use crate::server::{Listener, TerminationSource};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::AbortHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Idle,
    Running,
    Draining,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("service lifecycle already stopped")]
    AlreadyStopped,
    #[error("graceful drain did not finish within {0:?}")]
    DrainTimeout(Duration),
}

struct Inner {
    state: LifecycleState,
    listener_task: Option<AbortHandle>,
    drain_outcome: Result<(), LifecycleError>,
}

struct Shared {
    listener: Arc<dyn Listener>,
    termination: Arc<dyn TerminationSource>,
    shutdown_timeout: Duration,
    inner: Mutex<Inner>,
    // shutdown requested, by signal, by close() or by the listener exiting
    stop: CancellationToken,
    // tells the listener to stop accepting and finish in-flight work
    drain: CancellationToken,
    listener_done: CancellationToken,
    stopped: CancellationToken,
    tasks: TaskTracker,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The single shutdown routine. Runs on the watcher task whichever way
    /// shutdown was requested.
    async fn watch_termination(self: Arc<Self>) {
        tokio::select! {
            _ = self.termination.terminated() => info!("termination requested"),
            _ = self.stop.cancelled() => debug!("stop requested"),
        }

        {
            let mut inner = self.lock();
            if inner.state == LifecycleState::Running {
                inner.state = LifecycleState::Draining;
            }
        }
        self.stop.cancel();

        let outcome = self.drain_listener().await;
        match &outcome {
            Ok(()) => info!("shutdown complete"),
            Err(e) => warn!(error = %e, "shutdown forced"),
        }

        {
            let mut inner = self.lock();
            inner.state = LifecycleState::Stopped;
            inner.drain_outcome = outcome;
        }
        self.stopped.cancel();
    }

    async fn drain_listener(&self) -> Result<(), LifecycleError> {
        info!(timeout = ?self.shutdown_timeout, listener = self.listener.name(), "draining");
        self.drain.cancel();

        let drained = tokio::time::timeout(self.shutdown_timeout, self.listener_done.cancelled());
        if drained.await.is_ok() {
            return Ok(());
        }

        if let Some(task) = self.lock().listener_task.take() {
            task.abort();
        }
        Err(LifecycleError::DrainTimeout(self.shutdown_timeout))
    }
}

/// Start/stop contract around one [`Listener`].
///
/// `idle -> running -> draining -> stopped`, or `idle -> stopped` when closed
/// before it ever started. A termination event and [`close`](Self::close)
/// converge on the same bounded drain.
pub struct ServiceLifecycle {
    shared: Arc<Shared>,
}

impl ServiceLifecycle {
    pub fn new(
        listener: Arc<dyn Listener>,
        termination: Arc<dyn TerminationSource>,
        shutdown_timeout: Duration,
    ) -> Self {
        let tasks = TaskTracker::new();
        // closed up front so wait() before start() returns at once
        tasks.close();

        Self {
            shared: Arc::new(Shared {
                listener,
                termination,
                shutdown_timeout,
                inner: Mutex::new(Inner {
                    state: LifecycleState::Idle,
                    listener_task: None,
                    drain_outcome: Ok(()),
                }),
                stop: CancellationToken::new(),
                drain: CancellationToken::new(),
                listener_done: CancellationToken::new(),
                stopped: CancellationToken::new(),
                tasks,
            }),
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.shared.lock().state
    }

    /// Spawns the listener and the termination watcher. Must be called from
    /// within a Tokio runtime. A repeated call while running is a no-op.
    pub fn start(&self) -> Result<(), LifecycleError> {
        let shared = &self.shared;
        let mut inner = shared.lock();
        match inner.state {
            LifecycleState::Running | LifecycleState::Draining => return Ok(()),
            LifecycleState::Stopped => return Err(LifecycleError::AlreadyStopped),
            LifecycleState::Idle => {}
        }
        inner.state = LifecycleState::Running;

        let listener = shared.listener.clone();
        let drain = shared.drain.clone();
        let done = shared.listener_done.clone();
        let stop = shared.stop.clone();
        let task = shared.tasks.spawn(async move {
            info!(listener = listener.name(), "listener starting");
            match listener.serve(drain).await {
                Ok(()) => info!(listener = listener.name(), "listener exited"),
                Err(e) => error!(listener = listener.name(), error = ?e, "listener failed"),
            }
            done.cancel();
            stop.cancel();
        });
        inner.listener_task = Some(task.abort_handle());

        shared.tasks.spawn(shared.clone().watch_termination());
        Ok(())
    }

    /// Requests shutdown and waits for the drain to finish.
    ///
    /// Only the call that moves the lifecycle out of `running` reports the
    /// drain outcome; any later call is a no-op returning `Ok`. The outcome
    /// stays available through [`outcome`](Self::outcome).
    pub async fn close(&self) -> Result<(), LifecycleError> {
        {
            let mut inner = self.shared.lock();
            match inner.state {
                LifecycleState::Idle => {
                    inner.state = LifecycleState::Stopped;
                    self.shared.stopped.cancel();
                    return Ok(());
                }
                LifecycleState::Draining | LifecycleState::Stopped => return Ok(()),
                LifecycleState::Running => inner.state = LifecycleState::Draining,
            }
        }

        self.shared.stop.cancel();
        self.shared.stopped.cancelled().await;
        self.shared.lock().drain_outcome.clone()
    }

    /// Resolves once the listener and the watcher have both exited.
    pub async fn wait(&self) {
        self.shared.tasks.wait().await;
    }

    /// Result of the drain, whichever path triggered it. `Ok` until stopped.
    pub fn outcome(&self) -> Result<(), LifecycleError> {
        self.shared.lock().drain_outcome.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::ManualTermination;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const WAIT_LIMIT: Duration = Duration::from_secs(5);

    #[derive(Default)]
    struct FakeListener {
        served: AtomicUsize,
        drained: AtomicUsize,
        drain_delay: Duration,
        fail_on_start: bool,
    }

    #[async_trait::async_trait]
    impl Listener for FakeListener {
        fn name(&self) -> &str {
            "fake"
        }

        async fn serve(&self, drain: CancellationToken) -> anyhow::Result<()> {
            self.served.fetch_add(1, Ordering::SeqCst);
            if self.fail_on_start {
                anyhow::bail!("address already in use");
            }
            drain.cancelled().await;
            tokio::time::sleep(self.drain_delay).await;
            self.drained.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn lifecycle_with(
        listener: Arc<FakeListener>,
        shutdown_timeout: Duration,
    ) -> (ServiceLifecycle, ManualTermination) {
        let termination = ManualTermination::new();
        let lifecycle =
            ServiceLifecycle::new(listener, Arc::new(termination.clone()), shutdown_timeout);
        (lifecycle, termination)
    }

    async fn wait_bounded(lifecycle: &ServiceLifecycle) {
        tokio::time::timeout(WAIT_LIMIT, lifecycle.wait())
            .await
            .expect("wait() did not return");
    }

    #[tokio::test]
    async fn close_twice_is_a_no_op_the_second_time() {
        let listener = Arc::new(FakeListener::default());
        let (lifecycle, _) = lifecycle_with(listener.clone(), Duration::from_secs(1));

        lifecycle.start().unwrap();
        assert_eq!(lifecycle.state(), LifecycleState::Running);

        assert_eq!(lifecycle.close().await, Ok(()));
        assert_eq!(lifecycle.close().await, Ok(()));
        wait_bounded(&lifecycle).await;

        assert_eq!(lifecycle.state(), LifecycleState::Stopped);
        assert_eq!(listener.drained.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn start_is_idempotent_while_running() {
        let listener = Arc::new(FakeListener::default());
        let (lifecycle, _) = lifecycle_with(listener.clone(), Duration::from_secs(1));

        lifecycle.start().unwrap();
        lifecycle.start().unwrap();
        lifecycle.close().await.unwrap();
        wait_bounded(&lifecycle).await;

        assert_eq!(listener.served.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn termination_event_drains_and_stops() {
        let listener = Arc::new(FakeListener::default());
        let (lifecycle, termination) = lifecycle_with(listener.clone(), Duration::from_secs(1));

        lifecycle.start().unwrap();
        termination.trigger();
        wait_bounded(&lifecycle).await;

        assert_eq!(lifecycle.state(), LifecycleState::Stopped);
        assert_eq!(listener.drained.load(Ordering::SeqCst), 1);
        assert_eq!(lifecycle.outcome(), Ok(()));
        // the explicit path after a signal has nothing left to do
        assert_eq!(lifecycle.close().await, Ok(()));
    }

    #[tokio::test]
    async fn drain_deadline_breach_is_reported_but_shutdown_completes() {
        let listener = Arc::new(FakeListener {
            drain_delay: Duration::from_secs(30),
            ..Default::default()
        });
        let (lifecycle, _) = lifecycle_with(listener.clone(), Duration::from_millis(50));

        lifecycle.start().unwrap();
        assert_eq!(
            lifecycle.close().await,
            Err(LifecycleError::DrainTimeout(Duration::from_millis(50)))
        );
        wait_bounded(&lifecycle).await;

        assert_eq!(lifecycle.state(), LifecycleState::Stopped);
        assert_eq!(listener.drained.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn drain_deadline_breach_after_termination_is_reported() {
        let listener = Arc::new(FakeListener {
            drain_delay: Duration::from_secs(30),
            ..Default::default()
        });
        let (lifecycle, termination) = lifecycle_with(listener.clone(), Duration::from_millis(50));

        lifecycle.start().unwrap();
        termination.trigger();
        wait_bounded(&lifecycle).await;

        assert_eq!(lifecycle.state(), LifecycleState::Stopped);
        assert_eq!(
            lifecycle.outcome(),
            Err(LifecycleError::DrainTimeout(Duration::from_millis(50)))
        );
        assert_eq!(listener.drained.load(Ordering::SeqCst), 0);
        // a later close has nothing to drain but the outcome is kept
        assert_eq!(lifecycle.close().await, Ok(()));
        assert!(lifecycle.outcome().is_err());
    }

    #[tokio::test]
    async fn close_before_start_stops_for_good() {
        let listener = Arc::new(FakeListener::default());
        let (lifecycle, _) = lifecycle_with(listener.clone(), Duration::from_secs(1));

        wait_bounded(&lifecycle).await;
        assert_eq!(lifecycle.close().await, Ok(()));
        assert_eq!(lifecycle.state(), LifecycleState::Stopped);
        assert_eq!(lifecycle.start(), Err(LifecycleError::AlreadyStopped));
        wait_bounded(&lifecycle).await;
        assert_eq!(listener.served.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn listener_failure_ends_the_lifecycle() {
        let listener = Arc::new(FakeListener {
            fail_on_start: true,
            ..Default::default()
        });
        let (lifecycle, _) = lifecycle_with(listener, Duration::from_secs(1));

        lifecycle.start().unwrap();
        wait_bounded(&lifecycle).await;
        assert_eq!(lifecycle.state(), LifecycleState::Stopped);
    }

    #[tokio::test]
    async fn concurrent_closers_converge() {
        let listener = Arc::new(FakeListener {
            drain_delay: Duration::from_millis(50),
            ..Default::default()
        });
        let (lifecycle, termination) = lifecycle_with(listener.clone(), Duration::from_secs(1));
        let lifecycle = Arc::new(lifecycle);

        lifecycle.start().unwrap();
        let closers: Vec<_> = (0..4)
            .map(|_| {
                let lifecycle = lifecycle.clone();
                tokio::spawn(async move { lifecycle.close().await })
            })
            .collect();
        termination.trigger();

        for closer in closers {
            assert_eq!(closer.await.unwrap(), Ok(()));
        }
        wait_bounded(&lifecycle).await;
        assert_eq!(listener.drained.load(Ordering::SeqCst), 1);
    }
}
