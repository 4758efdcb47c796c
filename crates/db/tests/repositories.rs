//! Integration tests for the token, session, user and audit repositories.
//!
//! These need a live PostgreSQL reachable through `DATABASE_URL`:
//! `cargo test -p warden-db -- --ignored`.

use chrono::{Duration, Utc};
use sqlx::PgPool;
use warden_core::hashing::token_digest;
use warden_core::providers::AuthProvider;
use warden_core::tokens::TokenKind;
use warden_db::models::audit::CreateAuthAuditLog;
use warden_db::models::session::{CreateSession, RotateSession, SessionLookup};
use warden_db::models::token::CreateToken;
use warden_db::models::user::{CreateUser, LinkProvider, UpdateProfileSetting};
use warden_db::repositories::{AuthAuditRepo, SessionRepo, TokenRepo, UserRepo};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn new_user(email: &str) -> CreateUser {
    CreateUser {
        email: email.to_string(),
        password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string(),
        first_name: Some("Ada".to_string()),
        last_name: None,
        role: "user".to_string(),
        provider: AuthProvider::Email,
        provider_subject: None,
        profile_picture: None,
        email_verified: false,
    }
}

fn new_session(user_id: i64, access: &str, refresh: &str) -> CreateSession {
    CreateSession {
        user_id,
        access_token_hash: token_digest(access),
        refresh_token_hash: token_digest(refresh),
        device_token: Some("device-1".to_string()),
        time_zone: None,
        login_at: Utc::now(),
    }
}

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn token_revoke_is_idempotent(pool: PgPool) {
    let now = Utc::now();
    let token = TokenRepo::create(
        &pool,
        &CreateToken {
            token_hash: token_digest("signed.jwt.value"),
            token_type: TokenKind::Refresh,
            issued_at: now,
            expires_at: now + Duration::days(7),
        },
    )
    .await
    .unwrap();
    assert!(!token.is_revoked);
    assert_eq!(token.kind().unwrap(), TokenKind::Refresh);

    assert!(TokenRepo::claim(&pool, token.id).await.unwrap());
    assert!(!TokenRepo::claim(&pool, token.id).await.unwrap());
    assert!(TokenRepo::revoke(&pool, token.id).await.unwrap());
    assert!(TokenRepo::revoke(&pool, token.id).await.unwrap());
    assert!(!TokenRepo::revoke(&pool, token.id + 1000).await.unwrap());

    let found = TokenRepo::find_by_hash(&pool, &token_digest("signed.jwt.value"))
        .await
        .unwrap()
        .unwrap();
    assert!(found.is_revoked);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn token_digest_is_unique(pool: PgPool) {
    let now = Utc::now();
    let input = CreateToken {
        token_hash: token_digest("dup"),
        token_type: TokenKind::Access,
        issued_at: now,
        expires_at: now + Duration::minutes(15),
    };
    TokenRepo::create(&pool, &input).await.unwrap();

    let err = TokenRepo::create(&pool, &input).await.unwrap_err();
    let db_err = err.as_database_error().expect("database error");
    assert_eq!(db_err.constraint(), Some("uq_tokens_token_hash"));
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn user_create_writes_profile_settings(pool: PgPool) {
    let (user, settings) = UserRepo::create(&pool, &new_user("ada@example.com"))
        .await
        .unwrap();
    assert_eq!(user.auth_providers, vec!["email".to_string()]);
    assert!(user.provider_subjects.is_empty());
    assert_eq!(settings.user_id, user.id);
    assert!(!settings.is_email_verified);
    assert!(!settings.is_password_reset_required);

    let err = UserRepo::create(&pool, &new_user("ada@example.com"))
        .await
        .unwrap_err();
    assert_eq!(
        err.as_database_error().and_then(|e| e.constraint()),
        Some("uq_users_email")
    );
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn link_provider_is_a_set_union(pool: PgPool) {
    let (user, _) = UserRepo::create(&pool, &new_user("grace@example.com"))
        .await
        .unwrap();
    let link = LinkProvider {
        provider: AuthProvider::Google,
        subject: "google-sub-1".to_string(),
        profile_picture: Some("https://img.example.com/g.png".to_string()),
    };

    UserRepo::link_provider(&pool, user.id, &link).await.unwrap();
    let linked = UserRepo::link_provider(&pool, user.id, &LinkProvider {
        profile_picture: None,
        ..link
    })
    .await
    .unwrap()
    .unwrap();

    assert_eq!(linked.auth_providers, vec!["email".to_string(), "google".to_string()]);
    assert_eq!(linked.provider_subject(AuthProvider::Google), Some("google-sub-1"));
    assert_eq!(
        linked.profile_picture.as_deref(),
        Some("https://img.example.com/g.png")
    );
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn profile_setting_patch_applies_only_some_fields(pool: PgPool) {
    let (user, _) = UserRepo::create(&pool, &new_user("lin@example.com"))
        .await
        .unwrap();

    UserRepo::update_profile_setting(
        &pool,
        user.id,
        &UpdateProfileSetting {
            is_password_reset_required: Some(true),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    let settings = UserRepo::update_profile_setting(
        &pool,
        user.id,
        &UpdateProfileSetting {
            is_email_verified: Some(true),
            ..Default::default()
        },
    )
    .await
    .unwrap()
    .unwrap();

    assert!(settings.is_email_verified);
    assert!(settings.is_password_reset_required);
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn rotate_only_matches_current_refresh_digest(pool: PgPool) {
    let (user, _) = UserRepo::create(&pool, &new_user("sam@example.com"))
        .await
        .unwrap();
    let session = SessionRepo::create(&pool, &new_session(user.id, "a1", "r1"))
        .await
        .unwrap();

    let rotate = |expected: &str, access: &str, refresh: &str| RotateSession {
        expected_refresh_hash: token_digest(expected),
        access_token_hash: token_digest(access),
        refresh_token_hash: token_digest(refresh),
        device_token: None,
        time_zone: Some("UTC".to_string()),
    };

    let rotated = SessionRepo::rotate(&pool, session.id, &rotate("r1", "a2", "r2"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(rotated.device_token.as_deref(), Some("device-1"));
    assert_eq!(rotated.time_zone.as_deref(), Some("UTC"));

    // A second refresh presenting the old digest loses.
    let stale = SessionRepo::rotate(&pool, session.id, &rotate("r1", "a3", "r3"))
        .await
        .unwrap();
    assert!(stale.is_none());

    let found = SessionRepo::find(&pool, &SessionLookup::refresh_token("r2", user.id))
        .await
        .unwrap();
    assert_eq!(found.map(|s| s.id), Some(session.id));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn close_keeps_first_logout_time(pool: PgPool) {
    let (user, _) = UserRepo::create(&pool, &new_user("kim@example.com"))
        .await
        .unwrap();
    let session = SessionRepo::create(&pool, &new_session(user.id, "a", "r"))
        .await
        .unwrap();

    let first = SessionRepo::close(&pool, session.id).await.unwrap().unwrap();
    let second = SessionRepo::close(&pool, session.id).await.unwrap().unwrap();
    assert!(!first.is_active());
    assert_eq!(first.logout_at, second.logout_at);
    assert!(SessionRepo::close(&pool, session.id + 1000)
        .await
        .unwrap()
        .is_none());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn close_all_for_user_leaves_no_active_sessions(pool: PgPool) {
    let (user, _) = UserRepo::create(&pool, &new_user("noa@example.com"))
        .await
        .unwrap();
    for i in 0..3 {
        SessionRepo::create(&pool, &new_session(user.id, &format!("a{i}"), &format!("r{i}")))
            .await
            .unwrap();
    }

    assert_eq!(SessionRepo::close_all_for_user(&pool, user.id).await.unwrap(), 3);
    assert_eq!(SessionRepo::close_all_for_user(&pool, user.id).await.unwrap(), 0);
    assert!(SessionRepo::list_active_for_user(&pool, user.id)
        .await
        .unwrap()
        .is_empty());
}

// ---------------------------------------------------------------------------
// Audit
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn audit_entries_are_appended(pool: PgPool) {
    let (user, _) = UserRepo::create(&pool, &new_user("eve@example.com"))
        .await
        .unwrap();
    for event in ["login_failure", "login_success"] {
        let entry = AuthAuditRepo::create(
            &pool,
            &CreateAuthAuditLog {
                user_id: Some(user.id),
                event_type: event.to_string(),
                ip_address: Some("127.0.0.1".to_string()),
                device_info: None,
                details: serde_json::json!({ "email": "eve@example.com" }),
            },
        )
        .await
        .unwrap();
        assert_eq!(entry.user_id, Some(user.id));
        assert_eq!(entry.event_type, event);
        assert_eq!(entry.details["email"], "eve@example.com");
    }

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM auth_audit_logs WHERE user_id = $1")
        .bind(user.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 2);
}
