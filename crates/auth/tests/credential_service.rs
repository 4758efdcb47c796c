//! End-to-end credential flows over the in-memory stores.

mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use warden_auth::credential_service::{EmailClaims, FederatedProfile};
use warden_auth::error::AuthError;
use warden_auth::memory::{FailurePoint, MemoryStore};
use warden_auth::password::Argon2Hasher;
use warden_auth::session_service::DeviceInfo;
use warden_auth::signer::JwtSigner;
use warden_auth::AuthServices;
use warden_core::providers::{AuthProvider, UNUSABLE_PASSWORD_HASH};
use warden_core::tokens::TokenKind;
use warden_db::models::session::SessionLookup;

use common::{services, signup_input, test_config, verified_user, PASSWORD};

fn google(subject: &str, email: &str) -> FederatedProfile {
    FederatedProfile {
        provider: AuthProvider::Google,
        subject: subject.to_string(),
        email: email.to_string(),
        first_name: Some("Gia".to_string()),
        last_name: None,
        picture: Some("https://lh3.example.com/photo.jpg".to_string()),
    }
}

// ---------------------------------------------------------------------------
// Signup, verification, login
// ---------------------------------------------------------------------------

#[tokio::test]
async fn signup_confirm_token_is_single_use() {
    let (services, _) = services();
    let outcome = services
        .credentials
        .signup(signup_input("  New.User@Example.com "))
        .await
        .unwrap();
    assert_eq!(outcome.user.email, "new.user@example.com");
    assert_eq!(outcome.user.auth_providers, vec!["email".to_string()]);
    assert_eq!(outcome.confirm_claims.user_id, outcome.user.id);

    let issued = services
        .tokens
        .issue(TokenKind::ConfirmEmail, &outcome.confirm_claims)
        .await
        .unwrap();
    let settings = services.credentials.confirm_email(&issued.token).await.unwrap();
    assert!(settings.is_email_verified);

    assert_matches!(
        services.credentials.confirm_email(&issued.token).await,
        Err(AuthError::TokenExpiredOrRevoked)
    );
}

#[tokio::test]
async fn duplicate_signup_is_rejected() {
    let (services, _) = services();
    services.credentials.signup(signup_input("dup@example.com")).await.unwrap();
    assert_matches!(
        services.credentials.signup(signup_input("DUP@example.com")).await,
        Err(AuthError::UserAlreadyExists)
    );
}

#[tokio::test]
async fn weak_password_is_rejected_before_any_write() {
    let (services, _) = services();
    let mut input = signup_input("weak@example.com");
    input.password = "short".into();
    assert_matches!(
        services.credentials.signup(input).await,
        Err(AuthError::WeakPassword(_))
    );
    assert_matches!(
        services.credentials.login("weak@example.com", "short").await,
        Err(AuthError::InvalidCredentials)
    );
}

#[tokio::test]
async fn login_requires_password_and_verification() {
    let (services, _) = services();
    let outcome = services
        .credentials
        .signup(signup_input("ana@example.com"))
        .await
        .unwrap();

    assert_matches!(
        services.credentials.login("ana@example.com", "wrong-password").await,
        Err(AuthError::InvalidCredentials)
    );
    assert_matches!(
        services.credentials.login("nobody@example.com", PASSWORD).await,
        Err(AuthError::InvalidCredentials)
    );
    assert_matches!(
        services.credentials.login("ana@example.com", PASSWORD).await,
        Err(AuthError::EmailNotVerified)
    );

    services.credentials.verify_email(outcome.user.id).await.unwrap();
    let login = services
        .credentials
        .login("ANA@example.com", PASSWORD)
        .await
        .unwrap();
    assert_eq!(login.user.id, outcome.user.id);
    assert!(!login.password_reset_required);
}

#[tokio::test]
async fn verify_email_twice_is_rejected() {
    let (services, _) = services();
    let user = verified_user(&services, "twice@example.com").await;
    assert_matches!(
        services.credentials.verify_email(user.id).await,
        Err(AuthError::EmailAlreadyVerified)
    );
    assert_matches!(
        services.credentials.verify_email(9_999).await,
        Err(AuthError::UserNotFound)
    );
}

#[tokio::test]
async fn resend_keeps_earlier_tokens_valid() {
    let (services, _) = services();
    let outcome = services
        .credentials
        .signup(signup_input("resend@example.com"))
        .await
        .unwrap();
    let first = services
        .tokens
        .issue(TokenKind::ConfirmEmail, &outcome.confirm_claims)
        .await
        .unwrap();

    let claims = services
        .credentials
        .resend_verification("resend@example.com")
        .await
        .unwrap();
    assert_eq!(claims, outcome.confirm_claims);
    services
        .tokens
        .issue(TokenKind::ConfirmEmail, &claims)
        .await
        .unwrap();

    services.credentials.confirm_email(&first.token).await.unwrap();
    assert_matches!(
        services.credentials.resend_verification("resend@example.com").await,
        Err(AuthError::EmailAlreadyVerified)
    );
    assert_matches!(
        services.credentials.resend_verification("ghost@example.com").await,
        Err(AuthError::UserNotFound)
    );
}

#[tokio::test]
async fn real_argon2_hashes_round_trip_through_login() {
    let store = MemoryStore::new();
    let shared = Arc::new(store);
    let services = AuthServices::new(
        Arc::new(test_config()),
        shared.clone(),
        shared.clone(),
        shared.clone(),
        shared,
        Arc::new(JwtSigner),
        Arc::new(Argon2Hasher),
    );
    let user = verified_user(&services, "argon@example.com").await;
    assert!(user.password_hash.starts_with("$argon2id$"));
    services
        .credentials
        .login("argon@example.com", PASSWORD)
        .await
        .unwrap();
}

// ---------------------------------------------------------------------------
// Passwords
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reset_password_can_close_every_session() {
    let (services, _) = services();
    let user = verified_user(&services, "reset@example.com").await;
    let a = services.sessions.start(user.id, "user", DeviceInfo::default()).await.unwrap();
    services.sessions.start(user.id, "user", DeviceInfo::default()).await.unwrap();

    let update = services
        .credentials
        .reset_password(user.id, "brand-new-password", true)
        .await
        .unwrap();
    assert_eq!(update.sessions_terminated, 2);

    services
        .credentials
        .login("reset@example.com", "brand-new-password")
        .await
        .unwrap();
    assert_matches!(
        services.credentials.login("reset@example.com", PASSWORD).await,
        Err(AuthError::InvalidCredentials)
    );
    assert_matches!(
        services.credentials.authenticate_access(&a.access.token).await,
        Err(AuthError::SessionAlreadyClosed)
    );
}

#[tokio::test]
async fn password_reset_token_redeems_once() {
    let (services, _) = services();
    let user = verified_user(&services, "forgot@example.com").await;
    let claims = services
        .credentials
        .forgot_password("Forgot@Example.com")
        .await
        .unwrap();
    assert_eq!(claims.user_id, user.id);
    let issued = services
        .tokens
        .issue(TokenKind::PasswordReset, &claims)
        .await
        .unwrap();

    // A weak password does not burn the token.
    assert_matches!(
        services
            .credentials
            .redeem_password_reset(&issued.token, "short", false)
            .await,
        Err(AuthError::WeakPassword(_))
    );
    let update = services
        .credentials
        .redeem_password_reset(&issued.token, "another-good-password", false)
        .await
        .unwrap();
    assert_eq!(update.sessions_terminated, 0);
    assert_matches!(
        services
            .credentials
            .redeem_password_reset(&issued.token, "third-good-password", false)
            .await,
        Err(AuthError::TokenExpiredOrRevoked)
    );
}

#[tokio::test]
async fn confirm_token_cannot_reset_a_password() {
    let (services, _) = services();
    let user = verified_user(&services, "kinds@example.com").await;
    let claims = EmailClaims {
        user_id: user.id,
        email: user.email.clone(),
        role: user.role.clone(),
    };
    let confirm = services
        .tokens
        .issue(TokenKind::ConfirmEmail, &claims)
        .await
        .unwrap();
    assert_matches!(
        services
            .credentials
            .redeem_password_reset(&confirm.token, "another-good-password", false)
            .await,
        Err(AuthError::TokenKindMismatch { .. })
    );
}

#[tokio::test]
async fn forgot_password_for_unknown_email_is_not_found() {
    let (services, _) = services();
    assert_matches!(
        services.credentials.forgot_password("ghost@example.com").await,
        Err(AuthError::UserNotFound)
    );
}

#[tokio::test]
async fn change_password_keeps_sessions_unless_asked() {
    let (services, _) = services();
    let user = verified_user(&services, "change@example.com").await;
    let tokens = services.sessions.start(user.id, "user", DeviceInfo::default()).await.unwrap();

    let update = services
        .credentials
        .change_password(user.id, "changed-password", false)
        .await
        .unwrap();
    assert_eq!(update.sessions_terminated, 0);
    services
        .credentials
        .authenticate_access(&tokens.access.token)
        .await
        .unwrap();
}

// ---------------------------------------------------------------------------
// Federated login
// ---------------------------------------------------------------------------

#[tokio::test]
async fn federated_login_creates_then_reuses_the_user() {
    let (services, _) = services();
    let created = services
        .credentials
        .federated_login(google("g-123", "gia@example.com"))
        .await
        .unwrap();
    assert_eq!(created.auth_providers, vec!["google".to_string()]);
    assert_eq!(created.password_hash, UNUSABLE_PASSWORD_HASH);
    assert_eq!(created.provider_subject(AuthProvider::Google), Some("g-123"));

    let again = services
        .credentials
        .federated_login(google("g-123", "gia@example.com"))
        .await
        .unwrap();
    assert_eq!(again.id, created.id);

    assert_matches!(
        services
            .credentials
            .federated_login(google("g-999", "gia@example.com"))
            .await,
        Err(AuthError::ProviderAccountMismatch { provider: AuthProvider::Google })
    );

    // Provider-only accounts cannot use the password flow.
    assert_matches!(
        services.credentials.login("gia@example.com", PASSWORD).await,
        Err(AuthError::CannotLoginWithEmail)
    );
    let me = services.credentials.me(created.id).await.unwrap();
    assert!(me.settings.is_email_verified);
}

#[tokio::test]
async fn federated_login_links_an_email_account() {
    let (services, _) = services();
    let user = verified_user(&services, "link@example.com").await;

    let linked = services
        .credentials
        .federated_login(google("g-link", "link@example.com"))
        .await
        .unwrap();
    assert_eq!(linked.id, user.id);
    assert_eq!(
        linked.auth_providers,
        vec!["email".to_string(), "google".to_string()]
    );
    assert_eq!(linked.profile_picture.as_deref(), Some("https://lh3.example.com/photo.jpg"));

    // Password login still works after linking.
    services
        .credentials
        .login("link@example.com", PASSWORD)
        .await
        .unwrap();
}

#[tokio::test]
async fn email_is_not_a_federated_provider() {
    let (services, _) = services();
    let mut profile = google("x", "x@example.com");
    profile.provider = AuthProvider::Email;
    assert_matches!(
        services.credentials.federated_login(profile).await,
        Err(AuthError::Validation(_))
    );
}

// ---------------------------------------------------------------------------
// Bearer / refresh strategies
// ---------------------------------------------------------------------------

#[tokio::test]
async fn access_and_refresh_tokens_authenticate_their_own_strategy() {
    let (services, _) = services();
    let user = verified_user(&services, "bearer@example.com").await;
    let tokens = services.sessions.start(user.id, &user.role, DeviceInfo::default()).await.unwrap();

    let principal = services
        .credentials
        .authenticate_access(&tokens.access.token)
        .await
        .unwrap();
    assert_eq!(principal.user.id, user.id);
    assert_eq!(principal.session.id, tokens.session_id);
    assert_eq!(principal.claims.role, "user");

    assert_matches!(
        services.credentials.authenticate_access(&tokens.refresh.token).await,
        Err(AuthError::TokenKindMismatch { .. })
    );
    services
        .credentials
        .authenticate_refresh(&tokens.refresh.token)
        .await
        .unwrap();
}

#[tokio::test]
async fn refresh_session_rotates_and_revokes_the_used_token() {
    let (services, _) = services();
    let user = verified_user(&services, "rotate@example.com").await;
    let first = services.sessions.start(user.id, &user.role, DeviceInfo::default()).await.unwrap();

    let principal = services
        .credentials
        .authenticate_refresh(&first.refresh.token)
        .await
        .unwrap();
    let second = services
        .credentials
        .refresh_session(&principal, DeviceInfo::default())
        .await
        .unwrap();

    assert_matches!(
        services.credentials.authenticate_refresh(&first.refresh.token).await,
        Err(AuthError::TokenExpiredOrRevoked)
    );
    assert_matches!(
        services.credentials.authenticate_access(&first.access.token).await,
        Err(AuthError::SessionNotFound)
    );
    services
        .credentials
        .authenticate_access(&second.access.token)
        .await
        .unwrap();
}

#[tokio::test]
async fn failed_revoke_does_not_fail_the_refresh() {
    let (services, store) = services();
    let user = verified_user(&services, "revoke@example.com").await;
    let first = services.sessions.start(user.id, &user.role, DeviceInfo::default()).await.unwrap();
    let principal = services
        .credentials
        .authenticate_refresh(&first.refresh.token)
        .await
        .unwrap();

    store.fail(FailurePoint::TokenRevoke, true);
    let second = services
        .credentials
        .refresh_session(&principal, DeviceInfo::default())
        .await
        .unwrap();
    store.fail(FailurePoint::TokenRevoke, false);

    // The old token is still unrevoked in the ledger but matches no session.
    assert_matches!(
        services.credentials.authenticate_refresh(&first.refresh.token).await,
        Err(AuthError::SessionNotFound)
    );
    services
        .credentials
        .authenticate_refresh(&second.refresh.token)
        .await
        .unwrap();
}

#[tokio::test]
async fn logout_revokes_tokens_and_closes_the_session() {
    let (services, store) = services();
    let user = verified_user(&services, "bye@example.com").await;
    let tokens = services.sessions.start(user.id, &user.role, DeviceInfo::default()).await.unwrap();
    let principal = services
        .credentials
        .authenticate_access(&tokens.access.token)
        .await
        .unwrap();

    let closed = services.credentials.logout(&principal.session).await.unwrap();
    assert!(!closed.is_active());
    assert!(store.tokens().await.iter().all(|t| t.is_revoked));
    assert_matches!(
        services.credentials.authenticate_access(&tokens.access.token).await,
        Err(AuthError::TokenExpiredOrRevoked)
    );
    assert_matches!(
        services
            .credentials
            .check_session(&SessionLookup::Id(tokens.session_id))
            .await,
        Err(AuthError::SessionAlreadyClosed)
    );
}

#[tokio::test]
async fn terminate_user_sessions_requires_a_known_user() {
    let (services, _) = services();
    let user = verified_user(&services, "admin-target@example.com").await;
    services.sessions.start(user.id, &user.role, DeviceInfo::default()).await.unwrap();

    assert_eq!(services.credentials.terminate_user_sessions(user.id).await.unwrap(), 1);
    assert_eq!(services.credentials.terminate_user_sessions(user.id).await.unwrap(), 0);
    assert_matches!(
        services.credentials.terminate_user_sessions(9_999).await,
        Err(AuthError::UserNotFound)
    );
}
