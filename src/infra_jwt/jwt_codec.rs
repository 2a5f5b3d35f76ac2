use crate::domain_model::Claims;
use crate::domain_port::*;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub issuer: String,
    pub signing_key: Vec<u8>,
}

pub struct JwtHs256Codec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtHs256Codec {
    pub fn new(cfg: JwtConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.set_issuer(&[cfg.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        JwtHs256Codec {
            encoding_key: EncodingKey::from_secret(&cfg.signing_key),
            decoding_key: DecodingKey::from_secret(&cfg.signing_key),
            validation,
        }
    }
}

#[async_trait::async_trait]
impl TokenCodec for JwtHs256Codec {
    async fn sign(&self, claims: &Claims) -> Result<String, CodecError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| CodecError::Signing(e.to_string()))
    }

    async fn verify(&self, token: &str) -> Result<Claims, CodecError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(
            |e| match e.kind() {
                ErrorKind::ExpiredSignature => CodecError::Expired,
                _ => CodecError::Invalid(e.to_string()),
            },
        )?;
        let claims = data.claims;
        if claims.sub != claims.user_id.to_string() {
            return Err(CodecError::Invalid("subject does not match user id".into()));
        }
        Ok(claims)
    }
}
