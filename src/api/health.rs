use super::{ApiContext, with};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use warp::Filter;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: String,
    version: String,
    timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct ReadyResponse {
    status: &'static str,
    service: String,
}

/// Liveness and readiness probes, outside the versioned API and unauthenticated.
pub fn routes(
    context: Arc<ApiContext>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .and(with(context.clone()))
        .map(|context: Arc<ApiContext>| {
            warp::reply::json(&HealthResponse {
                status: "healthy",
                service: context.service.name.clone(),
                version: context.service.version.clone(),
                timestamp: Utc::now(),
            })
        });

    let ready = warp::path("ready")
        .and(warp::path::end())
        .and(warp::get())
        .and(with(context))
        .map(|context: Arc<ApiContext>| {
            warp::reply::json(&ReadyResponse {
                status: "ready",
                service: context.service.name.clone(),
            })
        });

    health.or(ready)
}
