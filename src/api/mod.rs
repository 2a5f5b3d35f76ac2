mod health;
pub mod v1;

use crate::application_port::TokenService;
use std::convert::Infallible;
use std::sync::Arc;
use warp::Filter;

#[derive(Debug, Clone)]
pub struct ServiceInfo {
    pub name: String,
    pub version: String,
}

/// Everything the HTTP handlers need, shared across requests.
pub struct ApiContext {
    pub token_service: Arc<dyn TokenService>,
    pub service: ServiceInfo,
}

/// Probes at the root, the versioned API under `/api/v1`, and one recovery
/// handler turning every rejection into an `ApiResponse`.
pub fn routes(
    context: Arc<ApiContext>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = Infallible> + Clone {
    let api_v1 = warp::path("api")
        .and(warp::path("v1"))
        .and(v1::routes(context.clone()));

    health::routes(context)
        .or(api_v1)
        .recover(v1::recover_error)
}

pub(crate) fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}
