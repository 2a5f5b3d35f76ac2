use crate::api::{self, ApiContext};
use crate::logger::*;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Network endpoint driven by [`ServiceLifecycle`](super::ServiceLifecycle).
#[async_trait::async_trait]
pub trait Listener: Send + Sync {
    fn name(&self) -> &str;

    /// Serves until `drain` fires, then lets in-flight requests finish and returns.
    async fn serve(&self, drain: CancellationToken) -> anyhow::Result<()>;
}

pub struct HttpListener {
    address: SocketAddr,
    context: Arc<ApiContext>,
}

impl HttpListener {
    pub fn new(address: SocketAddr, context: Arc<ApiContext>) -> Self {
        Self { address, context }
    }
}

#[async_trait::async_trait]
impl Listener for HttpListener {
    fn name(&self) -> &str {
        "http"
    }

    async fn serve(&self, drain: CancellationToken) -> anyhow::Result<()> {
        let routes = api::routes(self.context.clone());
        let (address, server) = warp::serve(routes)
            .try_bind_with_graceful_shutdown(self.address, drain.cancelled_owned())?;
        info!(%address, "http listener bound");

        server.await;
        info!(%address, "http listener drained");
        Ok(())
    }
}
