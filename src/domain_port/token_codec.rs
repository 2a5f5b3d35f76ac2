use crate::domain_model::Claims;

/// Symmetric signer/verifier for [`Claims`].
#[async_trait::async_trait]
pub trait TokenCodec: Send + Sync {
    async fn sign(&self, claims: &Claims) -> Result<String, CodecError>;

    /// Checks the signature, issuer and time claims, then decodes the payload.
    async fn verify(&self, token: &str) -> Result<Claims, CodecError>;
}

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("token expired")]
    Expired,
    #[error("token invalid: {0}")]
    Invalid(String),
    #[error("token signing failed: {0}")]
    Signing(String),
}
