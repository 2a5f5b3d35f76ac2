use super::TokenKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Signed payload carried by both access and refresh tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    pub sub: String,
    pub iat: i64,
    pub nbf: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    pub jti: String,
    pub kind: TokenKind,
    pub user_id: i64,
    pub email: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
}

impl Claims {
    pub fn new(
        kind: TokenKind,
        user_id: i64,
        email: &str,
        capabilities: &[String],
        issuer: &str,
        issued_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        let iat = issued_at.timestamp();
        Self {
            iss: issuer.to_owned(),
            sub: user_id.to_string(),
            iat,
            nbf: iat,
            exp: Some(iat.saturating_add(ttl.as_secs() as i64)),
            jti: nanoid::nanoid!(),
            kind,
            user_id,
            email: email.to_owned(),
            capabilities: capabilities.to_vec(),
        }
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|exp| DateTime::from_timestamp(exp, 0))
    }

    /// Time left before expiry, `None` when already expired or when no expiry is set.
    pub fn remaining_ttl(&self, now: DateTime<Utc>) -> Option<Duration> {
        let secs = self.exp? - now.timestamp();
        if secs <= 0 {
            None
        } else {
            Some(Duration::from_secs(secs as u64))
        }
    }

    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|c| c == capability)
    }
}
