//! Typed outcomes of the credential and session core.
//!
//! [`AuthError`] separates three families: domain refusals the caller may
//! show, security-sensitive token/session failures that collapse into a
//! generic "Unauthorized", and infrastructure faults.

use warden_core::error::CoreError;
use warden_core::providers::AuthProvider;
use warden_core::tokens::TokenKind;
use warden_core::types::DbId;

use crate::signer::SignerError;
use crate::store::StoreError;

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    // -- domain --------------------------------------------------------------
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("This account does not support email and password sign-in")]
    CannotLoginWithEmail,

    #[error("Email address has not been verified")]
    EmailNotVerified,

    #[error("A user with this email already exists")]
    UserAlreadyExists,

    #[error("Email address is already verified")]
    EmailAlreadyVerified,

    #[error("User not found")]
    UserNotFound,

    #[error("Account is linked to a different {provider} identity")]
    ProviderAccountMismatch { provider: AuthProvider },

    #[error("{0}")]
    WeakPassword(String),

    #[error("{0}")]
    Validation(String),

    // -- security-sensitive --------------------------------------------------
    #[error("token not found")]
    TokenNotFound,

    #[error("token kind mismatch: expected {expected}, stored {stored}")]
    TokenKindMismatch { expected: TokenKind, stored: String },

    #[error("token expired or revoked")]
    TokenExpiredOrRevoked,

    #[error("token signature rejected")]
    InvalidSignature,

    #[error("token payload rejected: {0}")]
    InvalidTokenPayload(String),

    #[error("session not found")]
    SessionNotFound,

    #[error("session already closed")]
    SessionAlreadyClosed,

    // -- infrastructure ------------------------------------------------------
    #[error("failed to sign {kind} token")]
    SigningFailure {
        kind: TokenKind,
        #[source]
        source: SignerError,
    },

    #[error("store operation failed")]
    PersistenceFailure(#[from] StoreError),

    #[error("failed to record new session")]
    SessionInitFailure(#[source] StoreError),

    #[error("failed to terminate sessions of user {user_id}")]
    BulkTerminationFailure {
        user_id: DbId,
        #[source]
        source: StoreError,
    },

    #[error("{0}")]
    Internal(String),
}

impl AuthError {
    /// Failures whose precise reason must not reach the client.
    pub fn is_security_sensitive(&self) -> bool {
        matches!(
            self,
            Self::TokenNotFound
                | Self::TokenKindMismatch { .. }
                | Self::TokenExpiredOrRevoked
                | Self::InvalidSignature
                | Self::InvalidTokenPayload(_)
                | Self::SessionNotFound
                | Self::SessionAlreadyClosed
        )
    }

    /// Render the error with its full `source()` chain for logs.
    pub fn chain(&self) -> String {
        let mut out = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            out.push_str(": ");
            out.push_str(&cause.to_string());
            source = cause.source();
        }
        out
    }
}

impl From<AuthError> for CoreError {
    fn from(err: AuthError) -> Self {
        if err.is_security_sensitive() {
            tracing::debug!(reason = %err, "Authentication rejected");
            return CoreError::Unauthorized("Unauthorized".into());
        }
        match err {
            AuthError::InvalidCredentials
            | AuthError::CannotLoginWithEmail
            | AuthError::EmailNotVerified
            | AuthError::ProviderAccountMismatch { .. } => CoreError::Unauthorized(err.to_string()),
            AuthError::UserAlreadyExists => CoreError::Conflict(err.to_string()),
            AuthError::EmailAlreadyVerified => CoreError::Forbidden(err.to_string()),
            AuthError::UserNotFound => CoreError::NotFound { entity: "User" },
            AuthError::WeakPassword(msg) | AuthError::Validation(msg) => CoreError::Validation(msg),
            other => CoreError::Internal(other.chain()),
        }
    }
}
