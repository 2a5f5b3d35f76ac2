use crate::api::v1::handler::ApiResponse;
use crate::application_port::*;
use serde::Serialize;
use std::convert::Infallible;
use thiserror::Error;
use tracing::warn;
use warp::filters::body::BodyDeserializeError;
use warp::http::StatusCode;
use warp::{Rejection, reject};

pub async fn recover_error(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    let (code, message) = if let Some(code) = err.find::<ApiErrorCode>() {
        (code.clone(), code.to_string())
    } else if let Some(e) = err.find::<BodyDeserializeError>() {
        (ApiErrorCode::BadRequest, e.to_string())
    } else if let Some(e) = err.find::<reject::UnsupportedMediaType>() {
        (ApiErrorCode::BadRequest, e.to_string())
    } else if err.find::<reject::MethodNotAllowed>().is_some() {
        let code = ApiErrorCode::MethodNotAllowed;
        let message = code.to_string();
        (code, message)
    } else if err.is_not_found() {
        let code = ApiErrorCode::NotFound;
        let message = code.to_string();
        (code, message)
    } else {
        warn!(rejection = ?err, "unhandled rejection");
        (
            ApiErrorCode::InternalError,
            format!("Unhandled error: {:?}", err),
        )
    };

    let json = warp::reply::json(&ApiResponse::<()>::err(code.clone(), message));
    Ok(warp::reply::with_status(json, code.status()))
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum ApiErrorCode {
    #[error("Authorization header is missing")]
    MissingAuthorization,
    #[error("Authorization header must be `Bearer <token>`")]
    InvalidAuthorizationHeader,
    #[error("Token is not valid")]
    InvalidToken,
    #[error("Token has expired")]
    TokenExpired,
    #[error("Token has been revoked")]
    TokenRevoked,
    #[error("Missing required capability")]
    InsufficientPermissions,
    #[error("Malformed request")]
    BadRequest,
    #[error("Not found")]
    NotFound,
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("Internal error")]
    InternalError,
}

impl ApiErrorCode {
    pub fn internal<E: std::fmt::Display>(error: E) -> ApiErrorCode {
        warn!("Internal error: {}", error);
        ApiErrorCode::InternalError
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiErrorCode::MissingAuthorization
            | ApiErrorCode::InvalidAuthorizationHeader
            | ApiErrorCode::InvalidToken
            | ApiErrorCode::TokenExpired
            | ApiErrorCode::TokenRevoked => StatusCode::UNAUTHORIZED,
            ApiErrorCode::InsufficientPermissions => StatusCode::FORBIDDEN,
            ApiErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ApiErrorCode::NotFound => StatusCode::NOT_FOUND,
            ApiErrorCode::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl reject::Reject for ApiErrorCode {}

impl From<AuthError> for ApiErrorCode {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::TokenExpired => ApiErrorCode::TokenExpired,
            AuthError::TokenRevoked(_) => ApiErrorCode::TokenRevoked,
            AuthError::InvalidToken | AuthError::MissingExpiry => ApiErrorCode::InvalidToken,
            AuthError::Store(e) => ApiErrorCode::internal(e),
            AuthError::Internal(e) => ApiErrorCode::internal(e),
        }
    }
}
