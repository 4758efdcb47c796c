//! User identity model, profile settings and DTOs.

use std::collections::BTreeMap;

use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;
use warden_core::providers::AuthProvider;
use warden_core::types::{DbId, Timestamp};

use super::stamps::RecordStamps;

/// Full user row from the `users` table.
///
/// Contains the password hash -- NEVER serialize this to API responses directly.
/// Use [`UserResponse`] for external-facing output.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct User {
    pub id: DbId,
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: String,
    pub auth_providers: Vec<String>,
    /// Provider name -> provider-specific subject id (e.g. the Google `sub`).
    pub provider_subjects: Json<BTreeMap<String, String>>,
    pub profile_picture: Option<String>,
    #[sqlx(flatten)]
    pub stamps: RecordStamps,
}

impl User {
    pub fn has_provider(&self, provider: AuthProvider) -> bool {
        self.auth_providers.iter().any(|p| p == provider.as_str())
    }

    pub fn provider_subject(&self, provider: AuthProvider) -> Option<&str> {
        self.provider_subjects.get(provider.as_str()).map(String::as_str)
    }

    pub fn to_response(&self) -> UserResponse {
        UserResponse {
            id: self.id,
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            role: self.role.clone(),
            auth_providers: self.auth_providers.clone(),
            profile_picture: self.profile_picture.clone(),
            created_at: self.stamps.created_at,
        }
    }
}

/// Safe user representation for API responses (no password hash).
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: DbId,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: String,
    pub auth_providers: Vec<String>,
    pub profile_picture: Option<String>,
    pub created_at: Timestamp,
}

/// DTO for creating a user together with its profile settings row.
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: String,
    /// Initial (and only) provider in `auth_providers`.
    pub provider: AuthProvider,
    /// Subject id recorded for federated providers.
    pub provider_subject: Option<String>,
    pub profile_picture: Option<String>,
    pub email_verified: bool,
}

/// DTO for attaching a federated provider to an existing user.
#[derive(Debug, Clone)]
pub struct LinkProvider {
    pub provider: AuthProvider,
    pub subject: String,
    /// Replaces the stored picture only when `Some`.
    pub profile_picture: Option<String>,
}

/// A row from the `profile_settings` table (1:1 with `users`).
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct ProfileSetting {
    pub id: DbId,
    pub user_id: DbId,
    pub is_email_verified: bool,
    pub is_password_reset_required: bool,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub stamps: RecordStamps,
}

/// DTO for patching profile flags. Only `Some` fields are applied.
#[derive(Debug, Clone, Default)]
pub struct UpdateProfileSetting {
    pub is_email_verified: Option<bool>,
    pub is_password_reset_required: Option<bool>,
}
