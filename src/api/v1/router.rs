use super::error::*;
use super::handler;
use crate::api::{ApiContext, with};
use crate::application_port::TokenService;
use crate::domain_model::Claims;
use std::sync::Arc;
use warp::{Filter, Rejection, reject};

/// A request whose bearer access token passed validation.
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub token: String,
    pub claims: Claims,
}

pub fn routes(
    context: Arc<ApiContext>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let token_service = context.token_service.clone();

    let refresh = warp::path("auth")
        .and(warp::path("refresh"))
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::json())
        .and(with(token_service.clone()))
        .and_then(handler::refresh);

    let logout = warp::path("auth")
        .and(warp::path("logout"))
        .and(warp::path::end())
        .and(warp::post())
        .and(with_verification(token_service.clone(), None))
        .and(warp::body::bytes())
        .and(with(token_service.clone()))
        .and_then(handler::logout);

    let me = warp::path("auth")
        .and(warp::path("me"))
        .and(warp::path::end())
        .and(warp::get())
        .and(with_verification(token_service, None))
        .and_then(handler::me);

    refresh.or(logout).or(me)
}

/// Validates `Authorization: Bearer <access token>` and, when given, checks
/// that the token grants `required_capability`.
pub fn with_verification(
    token_service: Arc<dyn TokenService>,
    required_capability: Option<&'static str>,
) -> impl Filter<Extract = (Authenticated,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(move |header: Option<String>| {
        let token_service = token_service.clone();
        async move {
            let header = header.ok_or_else(|| reject::custom(ApiErrorCode::MissingAuthorization))?;
            let token = header
                .strip_prefix("Bearer ")
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .ok_or_else(|| reject::custom(ApiErrorCode::InvalidAuthorizationHeader))?;

            let claims = token_service
                .validate_access_token(token)
                .await
                .map_err(ApiErrorCode::from)
                .map_err(reject::custom)?;

            if let Some(capability) = required_capability {
                if !claims.has_capability(capability) {
                    return Err(reject::custom(ApiErrorCode::InsufficientPermissions));
                }
            }

            Ok(Authenticated {
                token: token.to_string(),
                claims,
            })
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_impl::{RealTokenService, TokenConfig};
    use crate::infra_jwt::{JwtConfig, JwtHs256Codec};
    use crate::infra_memory::MemoryKeyValueStore;
    use std::time::Duration;

    fn token_service() -> Arc<dyn TokenService> {
        Arc::new(RealTokenService::new(
            Arc::new(JwtHs256Codec::new(JwtConfig {
                issuer: "keel.test".to_string(),
                signing_key: b"router-test-secret".to_vec(),
            })),
            Arc::new(MemoryKeyValueStore::new()),
            TokenConfig {
                issuer: "keel.test".to_string(),
                access_ttl: Duration::from_secs(60),
            },
        ))
    }

    #[tokio::test]
    async fn capability_is_enforced_after_authentication() {
        let token_service = token_service();
        let pair = token_service
            .issue_token_pair(3, "ops@example.com", &["orders.read".to_string()])
            .await
            .unwrap();
        let bearer = format!("Bearer {}", pair.access_token);

        let readers = with_verification(token_service.clone(), Some("orders.read"));
        let auth = warp::test::request()
            .header("authorization", &bearer)
            .filter(&readers)
            .await
            .unwrap();
        assert_eq!(auth.claims.user_id, 3);
        assert_eq!(auth.token, pair.access_token);

        let admins = with_verification(token_service, Some("admin"));
        let rejection = warp::test::request()
            .header("authorization", &bearer)
            .filter(&admins)
            .await
            .unwrap_err();
        assert_eq!(
            rejection.find::<ApiErrorCode>(),
            Some(&ApiErrorCode::InsufficientPermissions)
        );
    }

    #[tokio::test]
    async fn garbage_tokens_are_rejected() {
        let filter = with_verification(token_service(), None);
        let rejection = warp::test::request()
            .header("authorization", "Bearer not.a.jwt")
            .filter(&filter)
            .await
            .unwrap_err();
        assert_eq!(rejection.find::<ApiErrorCode>(), Some(&ApiErrorCode::InvalidToken));
    }
}
