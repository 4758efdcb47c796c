//! PostgreSQL adapter for the store traits, delegating to `warden_db` repos.

use async_trait::async_trait;
use warden_core::types::DbId;
use warden_db::models::audit::{AuthAuditLog, CreateAuthAuditLog};
use warden_db::models::session::{CreateSession, RotateSession, SessionLookup, UserSession};
use warden_db::models::token::{CreateToken, Token};
use warden_db::models::user::{
    CreateUser, LinkProvider, ProfileSetting, UpdateProfileSetting, User,
};
use warden_db::repositories::{AuthAuditRepo, SessionRepo, TokenRepo, UserRepo};
use warden_db::DbPool;

use crate::store::{AuditLogStore, SessionStore, StoreError, TokenStore, UserDirectory};

#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl TokenStore for PgStore {
    async fn insert_token(&self, input: &CreateToken) -> Result<Token, StoreError> {
        Ok(TokenRepo::create(&self.pool, input).await?)
    }

    async fn find_token_by_hash(&self, hash: &str) -> Result<Option<Token>, StoreError> {
        Ok(TokenRepo::find_by_hash(&self.pool, hash).await?)
    }

    async fn revoke_token(&self, id: DbId) -> Result<bool, StoreError> {
        Ok(TokenRepo::revoke(&self.pool, id).await?)
    }

    async fn claim_token(&self, id: DbId) -> Result<bool, StoreError> {
        Ok(TokenRepo::claim(&self.pool, id).await?)
    }
}

#[async_trait]
impl SessionStore for PgStore {
    async fn insert_session(&self, input: &CreateSession) -> Result<UserSession, StoreError> {
        Ok(SessionRepo::create(&self.pool, input).await?)
    }

    async fn find_session(
        &self,
        lookup: &SessionLookup,
    ) -> Result<Option<UserSession>, StoreError> {
        Ok(SessionRepo::find(&self.pool, lookup).await?)
    }

    async fn rotate_session(
        &self,
        id: DbId,
        input: &RotateSession,
    ) -> Result<Option<UserSession>, StoreError> {
        Ok(SessionRepo::rotate(&self.pool, id, input).await?)
    }

    async fn close_session(&self, id: DbId) -> Result<Option<UserSession>, StoreError> {
        Ok(SessionRepo::close(&self.pool, id).await?)
    }

    async fn close_user_sessions(&self, user_id: DbId) -> Result<u64, StoreError> {
        Ok(SessionRepo::close_all_for_user(&self.pool, user_id).await?)
    }

    async fn list_active_sessions(&self, user_id: DbId) -> Result<Vec<UserSession>, StoreError> {
        Ok(SessionRepo::list_active_for_user(&self.pool, user_id).await?)
    }
}

#[async_trait]
impl UserDirectory for PgStore {
    async fn create_user(
        &self,
        input: &CreateUser,
    ) -> Result<(User, ProfileSetting), StoreError> {
        Ok(UserRepo::create(&self.pool, input).await?)
    }

    async fn find_user_by_id(&self, id: DbId) -> Result<Option<User>, StoreError> {
        Ok(UserRepo::find_by_id(&self.pool, id).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(UserRepo::find_by_email(&self.pool, email).await?)
    }

    async fn update_password(&self, id: DbId, password_hash: &str) -> Result<bool, StoreError> {
        Ok(UserRepo::update_password(&self.pool, id, password_hash).await?)
    }

    async fn link_provider(
        &self,
        id: DbId,
        input: &LinkProvider,
    ) -> Result<Option<User>, StoreError> {
        Ok(UserRepo::link_provider(&self.pool, id, input).await?)
    }

    async fn find_profile_setting(
        &self,
        user_id: DbId,
    ) -> Result<Option<ProfileSetting>, StoreError> {
        Ok(UserRepo::find_profile_setting(&self.pool, user_id).await?)
    }

    async fn update_profile_setting(
        &self,
        user_id: DbId,
        input: &UpdateProfileSetting,
    ) -> Result<Option<ProfileSetting>, StoreError> {
        Ok(UserRepo::update_profile_setting(&self.pool, user_id, input).await?)
    }
}

#[async_trait]
impl AuditLogStore for PgStore {
    async fn append_audit(&self, entry: &CreateAuthAuditLog) -> Result<AuthAuditLog, StoreError> {
        Ok(AuthAuditRepo::create(&self.pool, entry).await?)
    }
}
