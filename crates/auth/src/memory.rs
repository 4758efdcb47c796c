//! In-process adapter for the store traits.
//!
//! Mirrors the PostgreSQL semantics (unique emails and token digests, the
//! guarded session rotation, first-wins `logout_at`) so the services behave
//! the same against either backend. [`FailurePoint`] switches make a chosen
//! operation fail with [`StoreError::Unavailable`].

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use tokio::sync::Mutex;
use warden_core::types::DbId;
use warden_db::models::audit::{AuthAuditLog, CreateAuthAuditLog};
use warden_db::models::session::{CreateSession, RotateSession, SessionLookup, UserSession};
use warden_db::models::stamps::RecordStamps;
use warden_db::models::token::{CreateToken, Token};
use warden_db::models::user::{
    CreateUser, LinkProvider, ProfileSetting, UpdateProfileSetting, User,
};

use crate::store::{AuditLogStore, SessionStore, StoreError, TokenStore, UserDirectory};

/// Operations that can be made to fail on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePoint {
    TokenInsert,
    TokenRevoke,
    SessionInsert,
    SessionRotate,
    SessionBulkClose,
    AuditAppend,
}

impl FailurePoint {
    const COUNT: usize = 6;

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Default)]
struct MemoryState {
    last_id: DbId,
    tokens: Vec<Token>,
    sessions: Vec<UserSession>,
    users: Vec<User>,
    settings: Vec<ProfileSetting>,
    audit: Vec<AuthAuditLog>,
}

impl MemoryState {
    fn next_id(&mut self) -> DbId {
        self.last_id += 1;
        self.last_id
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    failures: Arc<[AtomicBool; FailurePoint::COUNT]>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Turn an injected failure on or off.
    pub fn fail(&self, point: FailurePoint, enabled: bool) {
        self.failures[point.index()].store(enabled, Ordering::SeqCst);
    }

    fn check(&self, point: FailurePoint) -> Result<(), StoreError> {
        if self.failures[point.index()].load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("injected failure: {point:?}")));
        }
        Ok(())
    }

    /// Snapshot of every token row, in insertion order.
    pub async fn tokens(&self) -> Vec<Token> {
        self.state.lock().await.tokens.clone()
    }

    /// Snapshot of every session row, in insertion order.
    pub async fn sessions(&self) -> Vec<UserSession> {
        self.state.lock().await.sessions.clone()
    }

    pub async fn audit_entries(&self) -> Vec<AuthAuditLog> {
        self.state.lock().await.audit.clone()
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn insert_token(&self, input: &CreateToken) -> Result<Token, StoreError> {
        self.check(FailurePoint::TokenInsert)?;
        let mut state = self.state.lock().await;
        if state.tokens.iter().any(|t| t.token_hash == input.token_hash) {
            return Err(StoreError::UniqueViolation {
                constraint: "uq_tokens_token_hash".into(),
            });
        }
        let now = Utc::now();
        let token = Token {
            id: state.next_id(),
            token_hash: input.token_hash.clone(),
            token_type: input.token_type.as_str().to_string(),
            issued_at: input.issued_at,
            expires_at: input.expires_at,
            is_revoked: false,
            created_at: now,
            updated_at: now,
        };
        state.tokens.push(token.clone());
        Ok(token)
    }

    async fn find_token_by_hash(&self, hash: &str) -> Result<Option<Token>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.tokens.iter().find(|t| t.token_hash == hash).cloned())
    }

    async fn revoke_token(&self, id: DbId) -> Result<bool, StoreError> {
        self.check(FailurePoint::TokenRevoke)?;
        let mut state = self.state.lock().await;
        match state.tokens.iter_mut().find(|t| t.id == id) {
            Some(token) => {
                token.is_revoked = true;
                token.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn claim_token(&self, id: DbId) -> Result<bool, StoreError> {
        self.check(FailurePoint::TokenRevoke)?;
        let mut state = self.state.lock().await;
        match state.tokens.iter_mut().find(|t| t.id == id && !t.is_revoked) {
            Some(token) => {
                token.is_revoked = true;
                token.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn insert_session(&self, input: &CreateSession) -> Result<UserSession, StoreError> {
        self.check(FailurePoint::SessionInsert)?;
        let mut state = self.state.lock().await;
        let mut stamps = RecordStamps::new(Utc::now());
        stamps.created_by = Some(input.user_id);
        let session = UserSession {
            id: state.next_id(),
            user_id: input.user_id,
            access_token_hash: input.access_token_hash.clone(),
            refresh_token_hash: input.refresh_token_hash.clone(),
            device_token: input.device_token.clone(),
            time_zone: input.time_zone.clone(),
            login_at: input.login_at,
            logout_at: None,
            is_logged_in: true,
            stamps,
        };
        state.sessions.push(session.clone());
        Ok(session)
    }

    async fn find_session(
        &self,
        lookup: &SessionLookup,
    ) -> Result<Option<UserSession>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .sessions
            .iter()
            .filter(|s| lookup.matches(s))
            .max_by_key(|s| (s.login_at, s.id))
            .cloned())
    }

    async fn rotate_session(
        &self,
        id: DbId,
        input: &RotateSession,
    ) -> Result<Option<UserSession>, StoreError> {
        self.check(FailurePoint::SessionRotate)?;
        let mut state = self.state.lock().await;
        let Some(session) = state.sessions.iter_mut().find(|s| {
            s.id == id && s.refresh_token_hash == input.expected_refresh_hash && s.is_active()
        }) else {
            return Ok(None);
        };
        session.access_token_hash = input.access_token_hash.clone();
        session.refresh_token_hash = input.refresh_token_hash.clone();
        if let Some(device_token) = &input.device_token {
            session.device_token = Some(device_token.clone());
        }
        if let Some(time_zone) = &input.time_zone {
            session.time_zone = Some(time_zone.clone());
        }
        session.stamps.updated_at = Utc::now();
        session.stamps.updated_by = Some(session.user_id);
        Ok(Some(session.clone()))
    }

    async fn close_session(&self, id: DbId) -> Result<Option<UserSession>, StoreError> {
        let mut state = self.state.lock().await;
        let Some(session) = state.sessions.iter_mut().find(|s| s.id == id) else {
            return Ok(None);
        };
        let now = Utc::now();
        session.is_logged_in = false;
        session.logout_at.get_or_insert(now);
        session.stamps.updated_at = now;
        Ok(Some(session.clone()))
    }

    async fn close_user_sessions(&self, user_id: DbId) -> Result<u64, StoreError> {
        self.check(FailurePoint::SessionBulkClose)?;
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let mut closed = 0;
        for session in state
            .sessions
            .iter_mut()
            .filter(|s| s.user_id == user_id && s.is_active())
        {
            session.is_logged_in = false;
            session.logout_at = Some(now);
            session.stamps.updated_at = now;
            closed += 1;
        }
        Ok(closed)
    }

    async fn list_active_sessions(&self, user_id: DbId) -> Result<Vec<UserSession>, StoreError> {
        let state = self.state.lock().await;
        let mut sessions: Vec<UserSession> = state
            .sessions
            .iter()
            .filter(|s| s.user_id == user_id && s.is_active())
            .cloned()
            .collect();
        sessions.sort_by(|a, b| (b.login_at, b.id).cmp(&(a.login_at, a.id)));
        Ok(sessions)
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn create_user(
        &self,
        input: &CreateUser,
    ) -> Result<(User, ProfileSetting), StoreError> {
        let mut state = self.state.lock().await;
        if state.users.iter().any(|u| u.email == input.email) {
            return Err(StoreError::UniqueViolation {
                constraint: "uq_users_email".into(),
            });
        }

        let mut subjects = BTreeMap::new();
        if let Some(subject) = &input.provider_subject {
            subjects.insert(input.provider.as_str().to_string(), subject.clone());
        }
        let now = Utc::now();
        let user = User {
            id: state.next_id(),
            email: input.email.clone(),
            password_hash: input.password_hash.clone(),
            first_name: input.first_name.clone(),
            last_name: input.last_name.clone(),
            role: input.role.clone(),
            auth_providers: vec![input.provider.as_str().to_string()],
            provider_subjects: Json(subjects),
            profile_picture: input.profile_picture.clone(),
            stamps: RecordStamps::new(now),
        };
        let mut stamps = RecordStamps::new(now);
        stamps.created_by = Some(user.id);
        let settings = ProfileSetting {
            id: state.next_id(),
            user_id: user.id,
            is_email_verified: input.email_verified,
            is_password_reset_required: false,
            stamps,
        };
        state.users.push(user.clone());
        state.settings.push(settings.clone());
        Ok((user, settings))
    }

    async fn find_user_by_id(&self, id: DbId) -> Result<Option<User>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .users
            .iter()
            .find(|u| u.id == id && !u.stamps.is_deleted())
            .cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .users
            .iter()
            .find(|u| u.email == email && !u.stamps.is_deleted())
            .cloned())
    }

    async fn update_password(&self, id: DbId, password_hash: &str) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        match state.users.iter_mut().find(|u| u.id == id) {
            Some(user) => {
                user.password_hash = password_hash.to_string();
                user.stamps.updated_at = Utc::now();
                user.stamps.updated_by = Some(id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn link_provider(
        &self,
        id: DbId,
        input: &LinkProvider,
    ) -> Result<Option<User>, StoreError> {
        let mut state = self.state.lock().await;
        let Some(user) = state.users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        let provider = input.provider.as_str().to_string();
        if !user.auth_providers.contains(&provider) {
            user.auth_providers.push(provider.clone());
        }
        user.provider_subjects.insert(provider, input.subject.clone());
        if let Some(picture) = &input.profile_picture {
            user.profile_picture = Some(picture.clone());
        }
        user.stamps.updated_at = Utc::now();
        user.stamps.updated_by = Some(id);
        Ok(Some(user.clone()))
    }

    async fn find_profile_setting(
        &self,
        user_id: DbId,
    ) -> Result<Option<ProfileSetting>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.settings.iter().find(|s| s.user_id == user_id).cloned())
    }

    async fn update_profile_setting(
        &self,
        user_id: DbId,
        input: &UpdateProfileSetting,
    ) -> Result<Option<ProfileSetting>, StoreError> {
        let mut state = self.state.lock().await;
        let Some(settings) = state.settings.iter_mut().find(|s| s.user_id == user_id) else {
            return Ok(None);
        };
        if let Some(verified) = input.is_email_verified {
            settings.is_email_verified = verified;
        }
        if let Some(reset_required) = input.is_password_reset_required {
            settings.is_password_reset_required = reset_required;
        }
        settings.stamps.updated_at = Utc::now();
        settings.stamps.updated_by = Some(user_id);
        Ok(Some(settings.clone()))
    }
}

#[async_trait]
impl AuditLogStore for MemoryStore {
    async fn append_audit(&self, entry: &CreateAuthAuditLog) -> Result<AuthAuditLog, StoreError> {
        self.check(FailurePoint::AuditAppend)?;
        let mut state = self.state.lock().await;
        let log = AuthAuditLog {
            id: state.next_id(),
            user_id: entry.user_id,
            event_type: entry.event_type.clone(),
            ip_address: entry.ip_address.clone(),
            device_info: entry.device_info.clone(),
            details: entry.details.clone(),
            event_timestamp: Utc::now(),
        };
        state.audit.push(log.clone());
        Ok(log)
    }
}
