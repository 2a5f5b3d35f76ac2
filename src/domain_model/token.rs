use serde::{Deserialize, Serialize};
use std::fmt;

pub const ACCESS_TOKEN_DENYLIST_PREFIX: &str = "jwt:blacklist:accesstoken";
pub const REFRESH_TOKEN_DENYLIST_PREFIX: &str = "jwt:blacklist:refreshtoken";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn denylist_prefix(&self) -> &'static str {
        match self {
            TokenKind::Access => ACCESS_TOKEN_DENYLIST_PREFIX,
            TokenKind::Refresh => REFRESH_TOKEN_DENYLIST_PREFIX,
        }
    }

    /// Store key whose presence marks `token` as revoked.
    pub fn denylist_key(&self, token: &str) -> String {
        format!("{}:{}", self.denylist_prefix(), token)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Access => write!(f, "access token"),
            TokenKind::Refresh => write!(f, "refresh token"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn denylist_keys_are_namespaced_by_kind() {
        assert_eq!(
            TokenKind::Access.denylist_key("abc"),
            "jwt:blacklist:accesstoken:abc"
        );
        assert_eq!(
            TokenKind::Refresh.denylist_key("abc"),
            "jwt:blacklist:refreshtoken:abc"
        );
    }
}
