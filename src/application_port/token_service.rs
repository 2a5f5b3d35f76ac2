use crate::domain_model::*;
use crate::domain_port::{CodecError, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("token invalid")]
    InvalidToken,
    #[error("token expired")]
    TokenExpired,
    #[error("{0} revoked")]
    TokenRevoked(TokenKind),
    #[error("token has no expiration time")]
    MissingExpiry,
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<CodecError> for AuthError {
    fn from(error: CodecError) -> Self {
        match error {
            CodecError::Expired => AuthError::TokenExpired,
            CodecError::Invalid(reason) => {
                tracing::debug!(%reason, "token rejected by codec");
                AuthError::InvalidToken
            }
            CodecError::Signing(e) => AuthError::Internal(e),
        }
    }
}

impl AuthError {
    /// Failures that should reach the client as "unauthorized".
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            AuthError::InvalidToken
                | AuthError::TokenExpired
                | AuthError::TokenRevoked(_)
                | AuthError::MissingExpiry
        )
    }
}

#[async_trait::async_trait]
pub trait TokenService: Send + Sync {
    async fn issue_token_pair(
        &self,
        user_id: i64,
        email: &str,
        capabilities: &[String],
    ) -> Result<TokenPair, AuthError>;
    async fn validate_access_token(&self, token: &str) -> Result<Claims, AuthError>;
    async fn validate_refresh_token(&self, token: &str) -> Result<Claims, AuthError>;
    /// Issues a fresh pair for the holder of a valid refresh token.
    /// The presented refresh token stays usable until it expires or is logged out.
    async fn refresh_token_pair(&self, refresh_token: &str) -> Result<TokenPair, AuthError>;
    async fn extract_user_id(&self, access_token: &str) -> Result<i64, AuthError>;
    /// Revokes both tokens; an empty string skips that token.
    async fn logout(&self, access_token: &str, refresh_token: &str) -> Result<(), AuthError>;
}
