//! Login sessions: start, validate, refresh, terminate.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use warden_core::hashing::token_digest;
use warden_core::tokens::TokenKind;
use warden_core::types::DbId;
use warden_db::models::session::{CreateSession, RotateSession, SessionLookup, UserSession};

use crate::error::{AuthError, AuthResult};
use crate::store::SessionStore;
use crate::token_service::{IssuedToken, TokenService};

/// Payload carried by access and refresh tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub user_id: DbId,
    pub role: String,
}

/// Client device metadata attached to a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub device_token: Option<String>,
    pub time_zone: Option<String>,
}

/// The token pair handed to a client for one session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionTokens {
    pub session_id: DbId,
    pub access: IssuedToken,
    pub refresh: IssuedToken,
}

#[derive(Clone)]
pub struct SessionService {
    store: Arc<dyn SessionStore>,
    tokens: TokenService,
}

impl SessionService {
    pub fn new(store: Arc<dyn SessionStore>, tokens: TokenService) -> Self {
        Self { store, tokens }
    }

    async fn issue_pair(&self, claims: &SessionClaims) -> AuthResult<(IssuedToken, IssuedToken)> {
        tokio::try_join!(
            self.tokens.issue(TokenKind::Access, claims),
            self.tokens.issue(TokenKind::Refresh, claims),
        )
    }

    /// Issue an access/refresh pair and open a session for it.
    ///
    /// If the session row cannot be written the pair is abandoned; its
    /// ledger rows simply expire.
    pub async fn start(
        &self,
        user_id: DbId,
        role: &str,
        device: DeviceInfo,
    ) -> AuthResult<SessionTokens> {
        let claims = SessionClaims {
            user_id,
            role: role.to_string(),
        };
        let (access, refresh) = self.issue_pair(&claims).await?;

        let session = self
            .store
            .insert_session(&CreateSession {
                user_id,
                access_token_hash: token_digest(&access.token),
                refresh_token_hash: token_digest(&refresh.token),
                device_token: device.device_token,
                time_zone: device.time_zone,
                login_at: Utc::now(),
            })
            .await
            .map_err(AuthError::SessionInitFailure)?;

        tracing::info!(user_id, session_id = session.id, "Session started");
        Ok(SessionTokens {
            session_id: session.id,
            access,
            refresh,
        })
    }

    /// Load a session and require it to be active.
    pub async fn validate(&self, lookup: &SessionLookup) -> AuthResult<UserSession> {
        let session = self
            .store
            .find_session(lookup)
            .await?
            .ok_or(AuthError::SessionNotFound)?;
        if !session.is_active() {
            return Err(AuthError::SessionAlreadyClosed);
        }
        Ok(session)
    }

    /// Replace the session's token pair.
    ///
    /// The swap only applies if `session` is still active and still holds
    /// the refresh token it was loaded with; otherwise `SessionAlreadyClosed`.
    pub async fn refresh(
        &self,
        session: &UserSession,
        user_id: DbId,
        role: &str,
        device: DeviceInfo,
    ) -> AuthResult<SessionTokens> {
        let claims = SessionClaims {
            user_id,
            role: role.to_string(),
        };
        let (access, refresh) = self.issue_pair(&claims).await?;

        let rotated = self
            .store
            .rotate_session(
                session.id,
                &RotateSession {
                    expected_refresh_hash: session.refresh_token_hash.clone(),
                    access_token_hash: token_digest(&access.token),
                    refresh_token_hash: token_digest(&refresh.token),
                    device_token: device.device_token,
                    time_zone: device.time_zone,
                },
            )
            .await?
            .ok_or(AuthError::SessionAlreadyClosed)?;

        tracing::info!(user_id, session_id = rotated.id, "Session refreshed");
        Ok(SessionTokens {
            session_id: rotated.id,
            access,
            refresh,
        })
    }

    /// Close a session. Safe to repeat; the first logout time is kept.
    pub async fn terminate(&self, session: &UserSession) -> AuthResult<UserSession> {
        let closed = self
            .store
            .close_session(session.id)
            .await?
            .ok_or(AuthError::SessionNotFound)?;
        tracing::info!(user_id = closed.user_id, session_id = closed.id, "Session terminated");
        Ok(closed)
    }

    /// Close every active session of a user. Zero sessions is success.
    pub async fn terminate_all_for_user(&self, user_id: DbId) -> AuthResult<u64> {
        let closed = self
            .store
            .close_user_sessions(user_id)
            .await
            .map_err(|source| AuthError::BulkTerminationFailure { user_id, source })?;
        tracing::info!(user_id, closed, "Sessions terminated");
        Ok(closed)
    }

    /// Active sessions of a user, most recent login first.
    pub async fn list_active(&self, user_id: DbId) -> AuthResult<Vec<UserSession>> {
        Ok(self.store.list_active_sessions(user_id).await?)
    }
}
