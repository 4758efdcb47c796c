//! Token ledger model and DTOs.

use serde::Serialize;
use sqlx::FromRow;
use warden_core::error::CoreError;
use warden_core::tokens::TokenKind;
use warden_core::types::{DbId, Timestamp};

/// A row from the `tokens` table.
///
/// Only the SHA-256 digest of the signed token string is stored.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Token {
    pub id: DbId,
    #[serde(skip_serializing)]
    pub token_hash: String,
    pub token_type: String,
    pub issued_at: Timestamp,
    pub expires_at: Timestamp,
    pub is_revoked: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Token {
    /// Parse the stored `token_type` column.
    pub fn kind(&self) -> Result<TokenKind, CoreError> {
        self.token_type.parse()
    }

    /// A token is usable while it is unrevoked and strictly before its expiry.
    pub fn is_usable_at(&self, now: Timestamp) -> bool {
        !self.is_revoked && now < self.expires_at
    }
}

/// DTO for recording a freshly signed token.
#[derive(Debug, Clone)]
pub struct CreateToken {
    pub token_hash: String,
    pub token_type: TokenKind,
    pub issued_at: Timestamp,
    pub expires_at: Timestamp,
}
