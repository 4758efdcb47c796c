//! Orchestration of identity, credentials and verification state.
//!
//! This is the only component that combines the user directory with the
//! token and session services. It never touches the token or session
//! stores directly.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use warden_core::providers::{is_usable_password_hash, AuthProvider, UNUSABLE_PASSWORD_HASH};
use warden_core::roles::{is_known_role, ROLE_USER};
use warden_core::tokens::TokenKind;
use warden_core::types::DbId;
use warden_db::models::session::{SessionLookup, UserSession};
use warden_db::models::token::Token;
use warden_db::models::user::{
    CreateUser, LinkProvider, ProfileSetting, UpdateProfileSetting, User,
};

use crate::error::{AuthError, AuthResult};
use crate::password::{validate_password_strength, CredentialHasher};
use crate::session_service::{DeviceInfo, SessionClaims, SessionService, SessionTokens};
use crate::store::{StoreError, UserDirectory};
use crate::token_service::TokenService;

// ---------------------------------------------------------------------------
// Inputs and outcomes
// ---------------------------------------------------------------------------

/// Payload of CONFIRM_EMAIL and PASSWORD_RESET tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailClaims {
    pub user_id: DbId,
    pub email: String,
    pub role: String,
}

impl EmailClaims {
    fn for_user(user: &User) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
            role: user.role.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: User,
    pub password_reset_required: bool,
}

#[derive(Debug, Clone)]
pub struct SignupInput {
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Defaults to `user`.
    pub role: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SignupOutcome {
    pub user: User,
    /// To be issued as a CONFIRM_EMAIL token by the caller.
    pub confirm_claims: EmailClaims,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PasswordUpdate {
    pub sessions_terminated: u64,
}

/// Identity asserted by an external provider after its own verification.
#[derive(Debug, Clone)]
pub struct FederatedProfile {
    pub provider: AuthProvider,
    pub subject: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub picture: Option<String>,
}

/// An authenticated caller: the user, their live session, the token claims
/// and the ledger row of the token they presented.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user: User,
    pub session: UserSession,
    pub claims: SessionClaims,
    pub token: Token,
}

#[derive(Debug, Clone)]
pub struct UserProfile {
    pub user: User,
    pub settings: ProfileSetting,
}

/// Lowercase and trim an email address before any lookup or write.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct CredentialService {
    users: Arc<dyn UserDirectory>,
    hasher: Arc<dyn CredentialHasher>,
    tokens: TokenService,
    sessions: SessionService,
    min_password_length: usize,
}

impl CredentialService {
    pub fn new(
        users: Arc<dyn UserDirectory>,
        hasher: Arc<dyn CredentialHasher>,
        tokens: TokenService,
        sessions: SessionService,
        min_password_length: usize,
    ) -> Self {
        Self {
            users,
            hasher,
            tokens,
            sessions,
            min_password_length,
        }
    }

    async fn user_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        Ok(self.users.find_user_by_email(&normalize_email(email)).await?)
    }

    async fn user_by_id(&self, user_id: DbId) -> AuthResult<User> {
        self.users
            .find_user_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    async fn settings_of(&self, user_id: DbId) -> AuthResult<ProfileSetting> {
        self.users
            .find_profile_setting(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    fn hash_password(&self, password: &str) -> AuthResult<String> {
        validate_password_strength(password, self.min_password_length)
            .map_err(AuthError::WeakPassword)?;
        self.hasher
            .hash(password)
            .map_err(|e| AuthError::Internal(e.to_string()))
    }

    // -- email + password ----------------------------------------------------

    /// Check an email/password pair. Issues no tokens.
    pub async fn login(&self, email: &str, password: &str) -> AuthResult<LoginOutcome> {
        let user = self
            .user_by_email(email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !user.has_provider(AuthProvider::Email) || !is_usable_password_hash(&user.password_hash)
        {
            return Err(AuthError::CannotLoginWithEmail);
        }
        let matches = self
            .hasher
            .verify(password, &user.password_hash)
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        if !matches {
            return Err(AuthError::InvalidCredentials);
        }

        let settings = self.settings_of(user.id).await?;
        if !settings.is_email_verified {
            return Err(AuthError::EmailNotVerified);
        }

        tracing::info!(user_id = user.id, "Password login accepted");
        Ok(LoginOutcome {
            user,
            password_reset_required: settings.is_password_reset_required,
        })
    }

    /// Register an unverified email/password account.
    pub async fn signup(&self, input: SignupInput) -> AuthResult<SignupOutcome> {
        let email = normalize_email(&input.email);
        if email.is_empty() || !email.contains('@') {
            return Err(AuthError::Validation("A valid email address is required".into()));
        }
        let role = input.role.unwrap_or_else(|| ROLE_USER.to_string());
        if !is_known_role(&role) {
            return Err(AuthError::Validation(format!("Unknown role `{role}`")));
        }
        if self.users.find_user_by_email(&email).await?.is_some() {
            return Err(AuthError::UserAlreadyExists);
        }
        let password_hash = self.hash_password(&input.password)?;

        let (user, _settings) = self
            .users
            .create_user(&CreateUser {
                email,
                password_hash,
                first_name: input.first_name,
                last_name: input.last_name,
                role,
                provider: AuthProvider::Email,
                provider_subject: None,
                profile_picture: None,
                email_verified: false,
            })
            .await
            .map_err(|e| match e {
                StoreError::UniqueViolation { .. } => AuthError::UserAlreadyExists,
                other => AuthError::PersistenceFailure(other),
            })?;

        tracing::info!(user_id = user.id, "User signed up");
        Ok(SignupOutcome {
            confirm_claims: EmailClaims::for_user(&user),
            user,
        })
    }

    /// Mark a user's email as verified.
    pub async fn verify_email(&self, user_id: DbId) -> AuthResult<ProfileSetting> {
        self.user_by_id(user_id).await?;
        let settings = self.settings_of(user_id).await?;
        if settings.is_email_verified {
            return Err(AuthError::EmailAlreadyVerified);
        }
        let settings = self
            .users
            .update_profile_setting(
                user_id,
                &UpdateProfileSetting {
                    is_email_verified: Some(true),
                    ..Default::default()
                },
            )
            .await?
            .ok_or(AuthError::UserNotFound)?;
        tracing::info!(user_id, "Email verified");
        Ok(settings)
    }

    /// Redeem a CONFIRM_EMAIL token and verify its user.
    pub async fn confirm_email(&self, token: &str) -> AuthResult<ProfileSetting> {
        let verified = self
            .tokens
            .consume::<EmailClaims>(token, TokenKind::ConfirmEmail)
            .await?;
        self.verify_email(verified.payload.user_id).await
    }

    /// Claims for a new CONFIRM_EMAIL token. Earlier tokens stay valid.
    pub async fn resend_verification(&self, email: &str) -> AuthResult<EmailClaims> {
        let user = self
            .user_by_email(email)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        if self.settings_of(user.id).await?.is_email_verified {
            return Err(AuthError::EmailAlreadyVerified);
        }
        Ok(EmailClaims::for_user(&user))
    }

    /// Claims for a PASSWORD_RESET token.
    pub async fn forgot_password(&self, email: &str) -> AuthResult<EmailClaims> {
        let user = self
            .user_by_email(email)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        Ok(EmailClaims::for_user(&user))
    }

    /// Set a new password without proof of the old one.
    pub async fn reset_password(
        &self,
        user_id: DbId,
        new_password: &str,
        terminate_all: bool,
    ) -> AuthResult<PasswordUpdate> {
        self.set_password(user_id, new_password, terminate_all).await
    }

    /// Redeem a PASSWORD_RESET token and set the new password.
    pub async fn redeem_password_reset(
        &self,
        token: &str,
        new_password: &str,
        terminate_all: bool,
    ) -> AuthResult<PasswordUpdate> {
        // Reject a weak password before the single-use token is spent.
        validate_password_strength(new_password, self.min_password_length)
            .map_err(AuthError::WeakPassword)?;
        let verified = self
            .tokens
            .consume::<EmailClaims>(token, TokenKind::PasswordReset)
            .await?;
        self.reset_password(verified.payload.user_id, new_password, terminate_all)
            .await
    }

    /// Authenticated password change.
    pub async fn change_password(
        &self,
        user_id: DbId,
        new_password: &str,
        terminate_all: bool,
    ) -> AuthResult<PasswordUpdate> {
        self.set_password(user_id, new_password, terminate_all).await
    }

    async fn set_password(
        &self,
        user_id: DbId,
        new_password: &str,
        terminate_all: bool,
    ) -> AuthResult<PasswordUpdate> {
        self.user_by_id(user_id).await?;
        let password_hash = self.hash_password(new_password)?;
        if !self.users.update_password(user_id, &password_hash).await? {
            return Err(AuthError::UserNotFound);
        }
        self.users
            .update_profile_setting(
                user_id,
                &UpdateProfileSetting {
                    is_password_reset_required: Some(false),
                    ..Default::default()
                },
            )
            .await?;

        let sessions_terminated = if terminate_all {
            self.sessions.terminate_all_for_user(user_id).await?
        } else {
            0
        };
        tracing::info!(user_id, sessions_terminated, "Password updated");
        Ok(PasswordUpdate {
            sessions_terminated,
        })
    }

    // -- federated -----------------------------------------------------------

    /// Resolve a provider-verified identity to a user, creating or linking
    /// as needed.
    pub async fn federated_login(&self, profile: FederatedProfile) -> AuthResult<User> {
        if !profile.provider.is_federated() {
            return Err(AuthError::Validation(format!(
                "`{}` is not a federated provider",
                profile.provider
            )));
        }
        let email = normalize_email(&profile.email);

        if let Some(user) = self.users.find_user_by_email(&email).await? {
            return self.link_federated(user, &profile).await;
        }

        let created = self
            .users
            .create_user(&CreateUser {
                email: email.clone(),
                password_hash: UNUSABLE_PASSWORD_HASH.to_string(),
                first_name: profile.first_name.clone(),
                last_name: profile.last_name.clone(),
                role: ROLE_USER.to_string(),
                provider: profile.provider,
                provider_subject: Some(profile.subject.clone()),
                profile_picture: profile.picture.clone(),
                email_verified: true,
            })
            .await;

        match created {
            Ok((user, _)) => {
                tracing::info!(user_id = user.id, provider = %profile.provider, "Federated user created");
                Ok(user)
            }
            // Lost a creation race; the winner's row is linked instead.
            Err(StoreError::UniqueViolation { .. }) => {
                let user = self
                    .users
                    .find_user_by_email(&email)
                    .await?
                    .ok_or(AuthError::UserNotFound)?;
                self.link_federated(user, &profile).await
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn link_federated(&self, user: User, profile: &FederatedProfile) -> AuthResult<User> {
        if user.has_provider(profile.provider) {
            return match user.provider_subject(profile.provider) {
                Some(subject) if subject == profile.subject => Ok(user),
                _ => Err(AuthError::ProviderAccountMismatch {
                    provider: profile.provider,
                }),
            };
        }

        let user = self
            .users
            .link_provider(
                user.id,
                &LinkProvider {
                    provider: profile.provider,
                    subject: profile.subject.clone(),
                    profile_picture: profile.picture.clone(),
                },
            )
            .await?
            .ok_or(AuthError::UserNotFound)?;
        tracing::info!(user_id = user.id, provider = %profile.provider, "Provider linked");
        Ok(user)
    }

    // -- sessions ------------------------------------------------------------

    pub async fn check_session(&self, lookup: &SessionLookup) -> AuthResult<UserSession> {
        self.sessions.validate(lookup).await
    }

    /// Bearer strategy: an ACCESS token backed by a live session.
    pub async fn authenticate_access(&self, token: &str) -> AuthResult<Principal> {
        let verified = self
            .tokens
            .verify::<SessionClaims>(token, TokenKind::Access)
            .await?;
        let session = self
            .check_session(&SessionLookup::access_token(token))
            .await?;
        self.principal(session, verified.payload, verified.record)
            .await
    }

    /// Refresh strategy: a REFRESH token backed by a live session of the
    /// user it names.
    pub async fn authenticate_refresh(&self, token: &str) -> AuthResult<Principal> {
        let verified = self
            .tokens
            .verify::<SessionClaims>(token, TokenKind::Refresh)
            .await?;
        let session = self
            .check_session(&SessionLookup::refresh_token(
                token,
                verified.payload.user_id,
            ))
            .await?;
        self.principal(session, verified.payload, verified.record)
            .await
    }

    async fn principal(
        &self,
        session: UserSession,
        claims: SessionClaims,
        token: Token,
    ) -> AuthResult<Principal> {
        if session.user_id != claims.user_id {
            return Err(AuthError::SessionNotFound);
        }
        let user = self.user_by_id(claims.user_id).await?;
        Ok(Principal {
            user,
            session,
            claims,
            token,
        })
    }

    /// Rotate the caller's session and revoke the refresh token they used.
    ///
    /// A failed revoke is logged and does not fail the refresh; the old
    /// token no longer matches the session either way.
    pub async fn refresh_session(
        &self,
        principal: &Principal,
        device: DeviceInfo,
    ) -> AuthResult<SessionTokens> {
        let tokens = self
            .sessions
            .refresh(
                &principal.session,
                principal.user.id,
                &principal.user.role,
                device,
            )
            .await?;

        if let Err(e) = self.tokens.revoke(principal.token.id).await {
            tracing::warn!(
                token_id = principal.token.id,
                session_id = principal.session.id,
                error = %e.chain(),
                "Failed to revoke rotated refresh token"
            );
        }
        Ok(tokens)
    }

    /// Revoke both tokens of a session and close it.
    pub async fn logout(&self, session: &UserSession) -> AuthResult<UserSession> {
        for hash in [&session.access_token_hash, &session.refresh_token_hash] {
            self.tokens.revoke_by_digest(hash).await?;
        }
        self.sessions.terminate(session).await
    }

    /// Administrative: close every active session of `user_id`.
    pub async fn terminate_user_sessions(&self, user_id: DbId) -> AuthResult<u64> {
        self.user_by_id(user_id).await?;
        self.sessions.terminate_all_for_user(user_id).await
    }

    pub async fn me(&self, user_id: DbId) -> AuthResult<UserProfile> {
        let user = self.user_by_id(user_id).await?;
        let settings = self.settings_of(user_id).await?;
        Ok(UserProfile { user, settings })
    }

    pub async fn list_sessions(&self, user_id: DbId) -> AuthResult<Vec<UserSession>> {
        self.sessions.list_active(user_id).await
    }
}
