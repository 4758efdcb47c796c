//! Repository for the `tokens` table.

use sqlx::PgPool;
use warden_core::types::DbId;

use crate::models::token::{CreateToken, Token};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, token_hash, token_type, issued_at, expires_at, is_revoked, \
                        created_at, updated_at";

/// Ledger operations for issued tokens. Rows are never deleted here.
pub struct TokenRepo;

impl TokenRepo {
    /// Record a freshly signed token, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateToken) -> Result<Token, sqlx::Error> {
        let query = format!(
            "INSERT INTO tokens (token_hash, token_type, issued_at, expires_at)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Token>(&query)
            .bind(&input.token_hash)
            .bind(input.token_type.as_str())
            .bind(input.issued_at)
            .bind(input.expires_at)
            .fetch_one(pool)
            .await
    }

    /// Find a token by the digest of its signed string, revoked or not.
    pub async fn find_by_hash(pool: &PgPool, hash: &str) -> Result<Option<Token>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tokens WHERE token_hash = $1");
        sqlx::query_as::<_, Token>(&query)
            .bind(hash)
            .fetch_optional(pool)
            .await
    }

    /// Mark a token revoked.
    ///
    /// Returns `true` if a row with this id exists. Revoking an already
    /// revoked token matches the row and leaves it revoked.
    pub async fn revoke(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE tokens SET is_revoked = true WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Revoke a token only if it is still unrevoked.
    ///
    /// Returns `true` for exactly one caller when several race to redeem
    /// the same single-use token.
    pub async fn claim(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE tokens SET is_revoked = true WHERE id = $1 AND is_revoked = false")
                .bind(id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}
