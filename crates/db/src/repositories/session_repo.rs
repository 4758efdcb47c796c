//! Repository for the `sessions` table.

use sqlx::PgPool;
use warden_core::types::DbId;

use crate::models::session::{CreateSession, RotateSession, SessionLookup, UserSession};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, user_id, access_token_hash, refresh_token_hash, device_token, \
                        time_zone, login_at, logout_at, is_logged_in, \
                        created_at, updated_at, deleted_at, created_by, updated_by, deleted_by";

/// Predicate for rows that still represent a live login.
const ACTIVE: &str = "is_logged_in = true AND logout_at IS NULL";

/// Provides lifecycle operations for login sessions.
pub struct SessionRepo;

impl SessionRepo {
    /// Insert a new logged-in session, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateSession) -> Result<UserSession, sqlx::Error> {
        let query = format!(
            "INSERT INTO sessions
                (user_id, access_token_hash, refresh_token_hash, device_token, time_zone,
                 login_at, is_logged_in, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, true, $1)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UserSession>(&query)
            .bind(input.user_id)
            .bind(&input.access_token_hash)
            .bind(&input.refresh_token_hash)
            .bind(&input.device_token)
            .bind(&input.time_zone)
            .bind(input.login_at)
            .fetch_one(pool)
            .await
    }

    /// Find a session by any lookup criterion, active or not.
    ///
    /// Token lookups prefer the most recent login if digests ever repeat.
    pub async fn find(
        pool: &PgPool,
        lookup: &SessionLookup,
    ) -> Result<Option<UserSession>, sqlx::Error> {
        match lookup {
            SessionLookup::Id(id) => {
                let query = format!("SELECT {COLUMNS} FROM sessions WHERE id = $1");
                sqlx::query_as::<_, UserSession>(&query)
                    .bind(id)
                    .fetch_optional(pool)
                    .await
            }
            SessionLookup::AccessToken(hash) => {
                let query = format!(
                    "SELECT {COLUMNS} FROM sessions
                     WHERE access_token_hash = $1
                     ORDER BY login_at DESC LIMIT 1"
                );
                sqlx::query_as::<_, UserSession>(&query)
                    .bind(hash)
                    .fetch_optional(pool)
                    .await
            }
            SessionLookup::RefreshToken {
                refresh_hash,
                user_id,
            } => {
                let query = format!(
                    "SELECT {COLUMNS} FROM sessions
                     WHERE refresh_token_hash = $1 AND user_id = $2
                     ORDER BY login_at DESC LIMIT 1"
                );
                sqlx::query_as::<_, UserSession>(&query)
                    .bind(refresh_hash)
                    .bind(user_id)
                    .fetch_optional(pool)
                    .await
            }
            SessionLookup::TokenPair {
                access_hash,
                refresh_hash,
            } => {
                let query = format!(
                    "SELECT {COLUMNS} FROM sessions
                     WHERE access_token_hash = $1 AND refresh_token_hash = $2
                     ORDER BY login_at DESC LIMIT 1"
                );
                sqlx::query_as::<_, UserSession>(&query)
                    .bind(access_hash)
                    .bind(refresh_hash)
                    .fetch_optional(pool)
                    .await
            }
        }
    }

    /// Swap the token digests of an active session in one guarded statement.
    ///
    /// Returns `None` when the row is gone, closed, or no longer carries
    /// `input.expected_refresh_hash` (another refresh won the race).
    pub async fn rotate(
        pool: &PgPool,
        id: DbId,
        input: &RotateSession,
    ) -> Result<Option<UserSession>, sqlx::Error> {
        let query = format!(
            "UPDATE sessions SET
                access_token_hash = $3,
                refresh_token_hash = $4,
                device_token = COALESCE($5, device_token),
                time_zone = COALESCE($6, time_zone),
                updated_by = user_id
             WHERE id = $1 AND refresh_token_hash = $2 AND {ACTIVE}
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UserSession>(&query)
            .bind(id)
            .bind(&input.expected_refresh_hash)
            .bind(&input.access_token_hash)
            .bind(&input.refresh_token_hash)
            .bind(&input.device_token)
            .bind(&input.time_zone)
            .fetch_optional(pool)
            .await
    }

    /// Close a session. `logout_at` is only set the first time.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn close(pool: &PgPool, id: DbId) -> Result<Option<UserSession>, sqlx::Error> {
        let query = format!(
            "UPDATE sessions SET
                is_logged_in = false,
                logout_at = COALESCE(logout_at, NOW())
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UserSession>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Close every active session of a user. Returns the count of closed rows.
    pub async fn close_all_for_user(pool: &PgPool, user_id: DbId) -> Result<u64, sqlx::Error> {
        let query = format!(
            "UPDATE sessions SET is_logged_in = false, logout_at = NOW()
             WHERE user_id = $1 AND {ACTIVE}"
        );
        let result = sqlx::query(&query).bind(user_id).execute(pool).await?;
        Ok(result.rows_affected())
    }

    /// List a user's active sessions, most recent login first.
    pub async fn list_active_for_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<UserSession>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM sessions
             WHERE user_id = $1 AND {ACTIVE}
             ORDER BY login_at DESC, id DESC"
        );
        sqlx::query_as::<_, UserSession>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }
}
