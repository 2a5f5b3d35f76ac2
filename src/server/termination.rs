use crate::logger::*;
use tokio_util::sync::CancellationToken;

/// Event source that resolves once the process is asked to terminate.
#[async_trait::async_trait]
pub trait TerminationSource: Send + Sync {
    async fn terminated(&self);
}

/// SIGINT or SIGTERM on unix, ctrl-c elsewhere.
#[derive(Debug, Default)]
pub struct OsSignals;

#[async_trait::async_trait]
impl TerminationSource for OsSignals {
    async fn terminated(&self) {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};

            let mut sigterm = match signal(SignalKind::terminate()) {
                Ok(sigterm) => sigterm,
                Err(e) => {
                    error!(error = %e, "could not register SIGTERM handler");
                    return wait_for_ctrl_c().await;
                }
            };
            tokio::select! {
                _ = wait_for_ctrl_c() => {}
                _ = sigterm.recv() => info!("SIGTERM received"),
            }
        }

        #[cfg(not(unix))]
        wait_for_ctrl_c().await;
    }
}

async fn wait_for_ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("SIGINT received"),
        Err(e) => {
            // without a handler there is nothing to wait for
            error!(error = %e, "could not register SIGINT handler");
            std::future::pending::<()>().await;
        }
    }
}

/// Termination fired by hand, for embedding processes and tests.
#[derive(Debug, Clone, Default)]
pub struct ManualTermination {
    token: CancellationToken,
}

impl ManualTermination {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.token.cancel();
    }
}

#[async_trait::async_trait]
impl TerminationSource for ManualTermination {
    async fn terminated(&self) {
        self.token.cancelled().await;
    }
}
