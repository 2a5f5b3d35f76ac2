use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::logger::*;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

/// Refresh tokens live this many access-token lifetimes.
pub const REFRESH_TTL_MULTIPLIER: u32 = 24;

const REVOKED_SENTINEL: &str = "1";

#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub issuer: String,
    pub access_ttl: Duration,
}

pub struct RealTokenService {
    codec: Arc<dyn TokenCodec>,
    store: Arc<dyn KeyValueStore>,
    config: TokenConfig,
}

impl RealTokenService {
    pub fn new(
        codec: Arc<dyn TokenCodec>,
        store: Arc<dyn KeyValueStore>,
        config: TokenConfig,
    ) -> Self {
        Self {
            codec,
            store,
            config,
        }
    }

    fn refresh_ttl(&self) -> Duration {
        self.config.access_ttl * REFRESH_TTL_MULTIPLIER
    }

    async fn validate(&self, token: &str, kind: TokenKind) -> Result<Claims, AuthError> {
        let claims = self.codec.verify(token).await?;
        if claims.kind != kind {
            debug!(expected = %kind, found = %claims.kind, "token presented as the wrong kind");
            return Err(AuthError::InvalidToken);
        }

        if self.store.get(&kind.denylist_key(token)).await?.is_some() {
            return Err(AuthError::TokenRevoked(kind));
        }

        Ok(claims)
    }

    async fn revoke(&self, token: &str, kind: TokenKind) -> Result<(), AuthError> {
        if token.is_empty() {
            return Ok(());
        }

        let claims = self.validate(token, kind).await?;

        if claims.exp.is_none() {
            return Err(AuthError::MissingExpiry);
        }
        let Some(ttl) = claims.remaining_ttl(Utc::now()) else {
            return Ok(());
        };

        self.store
            .set(&kind.denylist_key(token), REVOKED_SENTINEL, Some(ttl))
            .await?;
        info!(user_id = claims.user_id, %kind, ttl_secs = ttl.as_secs(), "token revoked");
        Ok(())
    }
}

#[async_trait::async_trait]
impl TokenService for RealTokenService {
    async fn issue_token_pair(
        &self,
        user_id: i64,
        email: &str,
        capabilities: &[String],
    ) -> Result<TokenPair, AuthError> {
        let now = Utc::now();
        let issuer = &self.config.issuer;

        let access = Claims::new(
            TokenKind::Access,
            user_id,
            email,
            capabilities,
            issuer,
            now,
            self.config.access_ttl,
        );
        let refresh = Claims::new(
            TokenKind::Refresh,
            user_id,
            email,
            capabilities,
            issuer,
            now,
            self.refresh_ttl(),
        );

        let access_token = self.codec.sign(&access).await?;
        let refresh_token = self.codec.sign(&refresh).await?;
        debug!(user_id, "token pair issued");

        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_in: self.config.access_ttl.as_secs() as i64,
        })
    }

    async fn validate_access_token(&self, token: &str) -> Result<Claims, AuthError> {
        self.validate(token, TokenKind::Access).await
    }

    async fn validate_refresh_token(&self, token: &str) -> Result<Claims, AuthError> {
        self.validate(token, TokenKind::Refresh).await
    }

    async fn refresh_token_pair(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let claims = self.validate_refresh_token(refresh_token).await?;

        let exp = claims.exp.ok_or(AuthError::MissingExpiry)?;
        if exp <= Utc::now().timestamp() {
            return Err(AuthError::TokenExpired);
        }

        self.issue_token_pair(claims.user_id, &claims.email, &claims.capabilities)
            .await
    }

    async fn extract_user_id(&self, access_token: &str) -> Result<i64, AuthError> {
        Ok(self.validate_access_token(access_token).await?.user_id)
    }

    async fn logout(&self, access_token: &str, refresh_token: &str) -> Result<(), AuthError> {
        self.revoke(access_token, TokenKind::Access).await?;
        self.revoke(refresh_token, TokenKind::Refresh).await?;
        Ok(())
    }
}
