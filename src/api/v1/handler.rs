use super::error::*;
use super::router::Authenticated;
use crate::application_port::TokenService;
use crate::logger::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::hyper::body::Bytes;
use warp::{self, reject};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(code: ApiErrorCode, message: impl Into<String>) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(ApiError {
                code,
                message: message.into(),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

pub async fn refresh(
    body: RefreshRequest,
    token_service: Arc<dyn TokenService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    if body.refresh_token.is_empty() {
        return Err(reject::custom(ApiErrorCode::BadRequest));
    }

    let pair = token_service
        .refresh_token_pair(&body.refresh_token)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(pair)))
}

#[derive(Debug, Default, Deserialize)]
pub struct LogoutRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub user_id: i64,
}

pub async fn logout(
    auth: Authenticated,
    body: Bytes,
    token_service: Arc<dyn TokenService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    // the body is optional, an empty one only revokes the access token
    let body: LogoutRequest = if body.is_empty() {
        LogoutRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|_| reject::custom(ApiErrorCode::BadRequest))?
    };

    token_service
        .logout(&auth.token, body.refresh_token.as_deref().unwrap_or(""))
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;
    info!(user_id = auth.claims.user_id, "logged out");

    Ok(warp::reply::json(&ApiResponse::ok(LogoutResponse {
        user_id: auth.claims.user_id,
    })))
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user_id: i64,
    pub email: String,
    pub capabilities: Vec<String>,
}

pub async fn me(auth: Authenticated) -> Result<impl warp::Reply, warp::Rejection> {
    let claims = auth.claims;
    Ok(warp::reply::json(&ApiResponse::ok(MeResponse {
        user_id: claims.user_id,
        email: claims.email,
        capabilities: claims.capabilities,
    })))
}
