//! Login session model, DTOs and lookup criteria.

use serde::Serialize;
use sqlx::FromRow;
use warden_core::hashing::token_digest;
use warden_core::types::{DbId, Timestamp};

use super::stamps::RecordStamps;

/// A row from the `sessions` table.
///
/// Access and refresh tokens are held as SHA-256 digests.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct UserSession {
    pub id: DbId,
    pub user_id: DbId,
    pub access_token_hash: String,
    pub refresh_token_hash: String,
    pub device_token: Option<String>,
    pub time_zone: Option<String>,
    pub login_at: Timestamp,
    pub logout_at: Option<Timestamp>,
    pub is_logged_in: bool,
    #[sqlx(flatten)]
    pub stamps: RecordStamps,
}

impl UserSession {
    pub fn is_active(&self) -> bool {
        self.is_logged_in && self.logout_at.is_none()
    }

    pub fn to_response(&self) -> SessionResponse {
        SessionResponse {
            id: self.id,
            device_token: self.device_token.clone(),
            time_zone: self.time_zone.clone(),
            login_at: self.login_at,
            logout_at: self.logout_at,
            is_active: self.is_active(),
        }
    }
}

/// Session summary safe to return to clients (no token digests).
#[derive(Debug, Clone, Serialize)]
pub struct SessionResponse {
    pub id: DbId,
    pub device_token: Option<String>,
    pub time_zone: Option<String>,
    pub login_at: Timestamp,
    pub logout_at: Option<Timestamp>,
    pub is_active: bool,
}

/// DTO for opening a session.
#[derive(Debug, Clone)]
pub struct CreateSession {
    pub user_id: DbId,
    pub access_token_hash: String,
    pub refresh_token_hash: String,
    pub device_token: Option<String>,
    pub time_zone: Option<String>,
    pub login_at: Timestamp,
}

/// DTO for the guarded token swap performed on refresh.
///
/// The update only applies while the row is active and still carries
/// `expected_refresh_hash`. `None` device fields keep their stored value.
#[derive(Debug, Clone)]
pub struct RotateSession {
    pub expected_refresh_hash: String,
    pub access_token_hash: String,
    pub refresh_token_hash: String,
    pub device_token: Option<String>,
    pub time_zone: Option<String>,
}

/// How a session is located. Token variants carry digests, never raw tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionLookup {
    Id(DbId),
    AccessToken(String),
    RefreshToken { refresh_hash: String, user_id: DbId },
    TokenPair { access_hash: String, refresh_hash: String },
}

impl SessionLookup {
    pub fn access_token(token: &str) -> Self {
        Self::AccessToken(token_digest(token))
    }

    pub fn refresh_token(token: &str, user_id: DbId) -> Self {
        Self::RefreshToken {
            refresh_hash: token_digest(token),
            user_id,
        }
    }

    pub fn token_pair(access: &str, refresh: &str) -> Self {
        Self::TokenPair {
            access_hash: token_digest(access),
            refresh_hash: token_digest(refresh),
        }
    }

    /// Whether `session` satisfies these criteria.
    pub fn matches(&self, session: &UserSession) -> bool {
        match self {
            Self::Id(id) => session.id == *id,
            Self::AccessToken(hash) => session.access_token_hash == *hash,
            Self::RefreshToken {
                refresh_hash,
                user_id,
            } => session.refresh_token_hash == *refresh_hash && session.user_id == *user_id,
            Self::TokenPair {
                access_hash,
                refresh_hash,
            } => {
                session.access_token_hash == *access_hash
                    && session.refresh_token_hash == *refresh_hash
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn session() -> UserSession {
        let now = Utc::now();
        UserSession {
            id: 7,
            user_id: 3,
            access_token_hash: token_digest("access"),
            refresh_token_hash: token_digest("refresh"),
            device_token: None,
            time_zone: Some("Europe/Berlin".into()),
            login_at: now,
            logout_at: None,
            is_logged_in: true,
            stamps: RecordStamps::new(now),
        }
    }

    #[test]
    fn lookups_hash_raw_tokens() {
        let s = session();
        assert!(SessionLookup::access_token("access").matches(&s));
        assert!(SessionLookup::refresh_token("refresh", 3).matches(&s));
        assert!(!SessionLookup::refresh_token("refresh", 4).matches(&s));
        assert!(SessionLookup::token_pair("access", "refresh").matches(&s));
        assert!(!SessionLookup::token_pair("refresh", "access").matches(&s));
        assert!(SessionLookup::Id(7).matches(&s));
    }

    #[test]
    fn logout_makes_session_inactive() {
        let mut s = session();
        assert!(s.is_active());
        s.logout_at = Some(Utc::now());
        assert!(!s.is_active());
        assert!(!s.to_response().is_active);
    }
}
