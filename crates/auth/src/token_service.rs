//! Issuance, verification and revocation of signed tokens.
//!
//! Every issued token has a ledger row keyed by the SHA-256 digest of its
//! string. Verification consults the ledger first (existence, kind,
//! revocation, expiry) and only then checks the signature.

use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use warden_core::hashing::token_digest;
use warden_core::tokens::{TokenKind, ENVELOPE_KEY, KIND_CLAIM};
use warden_core::types::{DbId, Timestamp};
use warden_db::models::token::{CreateToken, Token};

use crate::config::AuthConfig;
use crate::error::{AuthError, AuthResult};
use crate::signer::{Claims, SignerError, TokenSigner};
use crate::store::TokenStore;

/// A freshly signed token and its lifetime.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    /// Lifetime in milliseconds.
    pub expires_in: i64,
    pub expires_at: Timestamp,
    #[serde(skip)]
    pub record_id: DbId,
}

/// A token that passed every check, with its decoded payload.
#[derive(Debug, Clone)]
pub struct VerifiedToken<T> {
    pub payload: T,
    pub record: Token,
}

#[derive(Clone)]
pub struct TokenService {
    store: Arc<dyn TokenStore>,
    signer: Arc<dyn TokenSigner>,
    config: Arc<AuthConfig>,
}

impl TokenService {
    pub fn new(
        store: Arc<dyn TokenStore>,
        signer: Arc<dyn TokenSigner>,
        config: Arc<AuthConfig>,
    ) -> Self {
        Self {
            store,
            signer,
            config,
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Sign `payload` as a token of `kind` and record it in the ledger.
    ///
    /// Nothing is returned unless the ledger row was written.
    pub async fn issue<T>(&self, kind: TokenKind, payload: &T) -> AuthResult<IssuedToken>
    where
        T: Serialize + ?Sized + Sync,
    {
        let payload = serde_json::to_value(payload)
            .map_err(|e| AuthError::Internal(format!("unserializable {kind} payload: {e}")))?;
        let mut claims = Claims::new();
        claims.insert(ENVELOPE_KEY.into(), payload);
        claims.insert(KIND_CLAIM.into(), Value::from(kind.as_str()));

        let cfg = self.config.for_kind(kind);
        let issued_at = Utc::now();
        let expires_at = TimeDelta::try_milliseconds(cfg.expiry_ms)
            .and_then(|lifetime| issued_at.checked_add_signed(lifetime))
            .ok_or_else(|| {
                AuthError::Internal(format!("{kind} expiry of {}ms is out of range", cfg.expiry_ms))
            })?;

        let token = self
            .signer
            .sign(&claims, &cfg.secret, self.config.algorithm, cfg.expiry_secs())
            .map_err(|source| AuthError::SigningFailure { kind, source })?;

        let record = self
            .store
            .insert_token(&CreateToken {
                token_hash: token_digest(&token),
                token_type: kind,
                issued_at,
                expires_at,
            })
            .await?;

        tracing::debug!(token_id = record.id, kind = %kind, "Token issued");
        Ok(IssuedToken {
            token,
            expires_in: cfg.expiry_ms,
            expires_at,
            record_id: record.id,
        })
    }

    /// Check a presented token against the ledger and its signature.
    pub async fn verify<T>(&self, token: &str, kind: TokenKind) -> AuthResult<VerifiedToken<T>>
    where
        T: DeserializeOwned,
    {
        let record = self
            .store
            .find_token_by_hash(&token_digest(token))
            .await?
            .ok_or(AuthError::TokenNotFound)?;

        if record.token_type != kind.as_str() {
            return Err(AuthError::TokenKindMismatch {
                expected: kind,
                stored: record.token_type,
            });
        }
        if !record.is_usable_at(Utc::now()) {
            return Err(AuthError::TokenExpiredOrRevoked);
        }

        let cfg = self.config.for_kind(kind);
        let mut claims = self
            .signer
            .verify(token, &cfg.secret, self.config.algorithm)
            .map_err(|e| match e {
                SignerError::Expired => AuthError::TokenExpiredOrRevoked,
                _ => AuthError::InvalidSignature,
            })?;

        let payload = match claims.remove(ENVELOPE_KEY) {
            Some(value @ Value::Object(_)) => value,
            _ => {
                return Err(AuthError::InvalidTokenPayload(format!(
                    "missing `{ENVELOPE_KEY}` object"
                )))
            }
        };
        let payload = serde_json::from_value(payload)
            .map_err(|e| AuthError::InvalidTokenPayload(e.to_string()))?;

        Ok(VerifiedToken { payload, record })
    }

    /// Revoke a ledger row. Idempotent; unknown ids are `TokenNotFound`.
    pub async fn revoke(&self, token_id: DbId) -> AuthResult<()> {
        if !self.store.revoke_token(token_id).await? {
            return Err(AuthError::TokenNotFound);
        }
        tracing::debug!(token_id, "Token revoked");
        Ok(())
    }

    /// Verify a single-use token and revoke it in the same step.
    ///
    /// Of several concurrent presentations at most one succeeds; the rest
    /// see `TokenExpiredOrRevoked`.
    pub async fn consume<T>(&self, token: &str, kind: TokenKind) -> AuthResult<VerifiedToken<T>>
    where
        T: DeserializeOwned,
    {
        let verified = self.verify(token, kind).await?;
        if !self.store.claim_token(verified.record.id).await? {
            return Err(AuthError::TokenExpiredOrRevoked);
        }
        tracing::debug!(token_id = verified.record.id, kind = %kind, "Token consumed");
        Ok(verified)
    }

    /// Revoke whichever ledger row carries `token`, if any.
    pub async fn revoke_by_token(&self, token: &str) -> AuthResult<()> {
        self.revoke_by_digest(&token_digest(token)).await
    }

    /// Like [`Self::revoke_by_token`], for callers that only hold the digest.
    pub async fn revoke_by_digest(&self, hash: &str) -> AuthResult<()> {
        match self.store.find_token_by_hash(hash).await? {
            Some(record) => self.revoke(record.id).await,
            None => {
                tracing::debug!("Revocation skipped, token not in ledger");
                Ok(())
            }
        }
    }
}
