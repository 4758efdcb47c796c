//! Persistence seams of the core.
//!
//! Method names are distinct across traits so a single adapter can
//! implement all four without call-site ambiguity.

use async_trait::async_trait;
use warden_core::types::DbId;
use warden_db::models::audit::{AuthAuditLog, CreateAuthAuditLog};
use warden_db::models::session::{CreateSession, RotateSession, SessionLookup, UserSession};
use warden_db::models::token::{CreateToken, Token};
use warden_db::models::user::{
    CreateUser, LinkProvider, ProfileSetting, UpdateProfileSetting, User,
};

/// PostgreSQL unique-violation SQLSTATE.
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unique constraint `{constraint}` violated")]
    UniqueViolation { constraint: String },

    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
                return Self::UniqueViolation {
                    constraint: db_err.constraint().unwrap_or_default().to_string(),
                };
            }
        }
        Self::Database(err)
    }
}

#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn insert_token(&self, input: &CreateToken) -> Result<Token, StoreError>;

    async fn find_token_by_hash(&self, hash: &str) -> Result<Option<Token>, StoreError>;

    /// Set `is_revoked`. `false` means no such row; revoking twice is `true`.
    async fn revoke_token(&self, id: DbId) -> Result<bool, StoreError>;

    /// Revoke only if currently unrevoked. `true` means this call did it.
    async fn claim_token(&self, id: DbId) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert_session(&self, input: &CreateSession) -> Result<UserSession, StoreError>;

    async fn find_session(&self, lookup: &SessionLookup)
        -> Result<Option<UserSession>, StoreError>;

    /// Guarded token swap; `None` when the guard does not match.
    async fn rotate_session(
        &self,
        id: DbId,
        input: &RotateSession,
    ) -> Result<Option<UserSession>, StoreError>;

    /// Close a session, keeping the first `logout_at`. `None` if unknown.
    async fn close_session(&self, id: DbId) -> Result<Option<UserSession>, StoreError>;

    async fn close_user_sessions(&self, user_id: DbId) -> Result<u64, StoreError>;

    async fn list_active_sessions(&self, user_id: DbId) -> Result<Vec<UserSession>, StoreError>;
}

/// The identity directory as the core sees it.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Create the user and its profile settings atomically.
    async fn create_user(&self, input: &CreateUser)
        -> Result<(User, ProfileSetting), StoreError>;

    async fn find_user_by_id(&self, id: DbId) -> Result<Option<User>, StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn update_password(&self, id: DbId, password_hash: &str) -> Result<bool, StoreError>;

    async fn link_provider(
        &self,
        id: DbId,
        input: &LinkProvider,
    ) -> Result<Option<User>, StoreError>;

    async fn find_profile_setting(
        &self,
        user_id: DbId,
    ) -> Result<Option<ProfileSetting>, StoreError>;

    async fn update_profile_setting(
        &self,
        user_id: DbId,
        input: &UpdateProfileSetting,
    ) -> Result<Option<ProfileSetting>, StoreError>;
}

#[async_trait]
pub trait AuditLogStore: Send + Sync {
    async fn append_audit(&self, entry: &CreateAuthAuditLog) -> Result<AuthAuditLog, StoreError>;
}
