use crate::api::{ApiContext, ServiceInfo};
use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_port::*;
use crate::infra_jwt::*;
use crate::infra_memory::*;
use crate::infra_redis::*;
use crate::logger::*;
use crate::server::*;
use crate::settings::Settings;
use std::sync::Arc;
use std::time::Duration;

/// Composition root: picks adapters from settings and wires the services.
pub struct Server {
    pub token_service: Arc<dyn TokenService>,
    pub distributed_lock: Arc<DistributedLock>,
    pub store: Arc<dyn KeyValueStore>,
    pub lifecycle: ServiceLifecycle,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        Self::try_new_with_termination(settings, Arc::new(OsSignals)).await
    }

    pub async fn try_new_with_termination(
        settings: &Settings,
        termination: Arc<dyn TerminationSource>,
    ) -> anyhow::Result<Self> {
        let store: Arc<dyn KeyValueStore> = match settings.store.backend.as_str() {
            "memory" => Arc::new(MemoryKeyValueStore::new()),
            "redis" => {
                let url = settings
                    .store
                    .redis_url
                    .as_deref()
                    .ok_or_else(|| anyhow::anyhow!("store.redis_url is required for redis"))?;
                Arc::new(RedisKeyValueStore::connect(url).await?)
            }
            other => return Err(anyhow::anyhow!("Unknown store backend: {}", other)),
        };
        info!(backend = %settings.store.backend, "key-value store ready");

        let token_codec: Arc<dyn TokenCodec> = Arc::new(JwtHs256Codec::new(JwtConfig {
            issuer: settings.jwt.issuer.clone(),
            signing_key: settings.jwt.secret.clone().into_bytes(),
        }));
        let token_service: Arc<dyn TokenService> = Arc::new(RealTokenService::new(
            token_codec,
            store.clone(),
            TokenConfig {
                issuer: settings.jwt.issuer.clone(),
                access_ttl: settings.access_ttl(),
            },
        ));

        let distributed_lock = Arc::new(DistributedLock::new(
            store.clone(),
            LockOptions {
                min_refresh_interval: Duration::from_millis(settings.lock.min_refresh_interval_ms),
                release_timeout: Duration::from_millis(settings.lock.release_timeout_ms),
            },
        ));

        let context = Arc::new(ApiContext {
            token_service: token_service.clone(),
            service: ServiceInfo {
                name: settings.http.name.clone(),
                version: settings.http.version.clone(),
            },
        });
        let listener: Arc<dyn Listener> = Arc::new(HttpListener::new(settings.address()?, context));
        let lifecycle = ServiceLifecycle::new(listener, termination, settings.shutdown_timeout());

        Ok(Self {
            token_service,
            distributed_lock,
            store,
            lifecycle,
        })
    }

    /// Starts serving and returns the drain outcome once the lifecycle has
    /// stopped, however the stop was requested.
    pub async fn run(&self) -> Result<(), LifecycleError> {
        self.lifecycle.start()?;
        info!("server started");
        self.lifecycle.wait().await;
        self.lifecycle.outcome()
    }

    pub async fn shutdown(&self) -> Result<(), LifecycleError> {
        info!("server shutting down...");

        let result = self.lifecycle.close().await;
        self.lifecycle.wait().await;
        match &result {
            Ok(()) => info!(state = ?self.lifecycle.state(), "server shutdown successfully"),
            Err(e) => error!(error = %e, "server shutdown incomplete"),
        }
        result
    }
}
