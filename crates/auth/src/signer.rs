//! JWT signing and verification behind the [`TokenSigner`] seam.
//!
//! Claims are a JSON object supplied by the caller. The signer adds the
//! registered `iat`/`exp` claims and a random `jti`, so two tokens signed in
//! the same second for the same payload still differ.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde_json::{Map, Value};
use uuid::Uuid;

pub type Claims = Map<String, Value>;

#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    #[error("token has expired")]
    Expired,

    #[error("signature does not match")]
    InvalidSignature,

    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("algorithm {0:?} is not supported")]
    UnsupportedAlgorithm(Algorithm),

    #[error("encoding failed: {0}")]
    Encoding(#[source] jsonwebtoken::errors::Error),
}

/// Signs and verifies claim sets with a shared secret.
pub trait TokenSigner: Send + Sync {
    fn sign(
        &self,
        claims: &Claims,
        secret: &str,
        algorithm: Algorithm,
        expiry_secs: i64,
    ) -> Result<String, SignerError>;

    /// Check the signature and registered claims, returning the full claim set.
    fn verify(&self, token: &str, secret: &str, algorithm: Algorithm)
        -> Result<Claims, SignerError>;
}

/// HMAC-only JWT signer backed by `jsonwebtoken`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JwtSigner;

pub fn is_hmac(algorithm: Algorithm) -> bool {
    matches!(
        algorithm,
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
    )
}

impl TokenSigner for JwtSigner {
    fn sign(
        &self,
        claims: &Claims,
        secret: &str,
        algorithm: Algorithm,
        expiry_secs: i64,
    ) -> Result<String, SignerError> {
        if !is_hmac(algorithm) {
            return Err(SignerError::UnsupportedAlgorithm(algorithm));
        }
        let now = chrono::Utc::now().timestamp();
        let mut claims = claims.clone();
        claims.insert("iat".into(), Value::from(now));
        claims.insert("exp".into(), Value::from(now + expiry_secs));
        claims.insert("jti".into(), Value::from(Uuid::new_v4().to_string()));

        encode(
            &Header::new(algorithm),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .map_err(SignerError::Encoding)
    }

    fn verify(
        &self,
        token: &str,
        secret: &str,
        algorithm: Algorithm,
    ) -> Result<Claims, SignerError> {
        if !is_hmac(algorithm) {
            return Err(SignerError::UnsupportedAlgorithm(algorithm));
        }
        let mut validation = Validation::new(algorithm);
        // The token ledger is authoritative on expiry; no grace window here.
        validation.leeway = 0;

        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &validation,
        )
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => SignerError::Expired,
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                SignerError::InvalidSignature
            }
            _ => SignerError::Malformed(e.to_string()),
        })?;
        Ok(data.claims)
    }
}
