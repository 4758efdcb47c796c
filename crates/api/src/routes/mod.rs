pub mod auth;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /auth/email/login                  login (public)
/// /auth/email/signup                 signup (public)
/// /auth/email/verify                 confirm email, redirects (public)
/// /auth/email/resend                 resend confirmation (public)
/// /auth/password/forgot              request reset link (public)
/// /auth/password/reset               redeem reset link (public)
/// /auth/password/change              change password (requires auth)
/// /auth/me                           current user (requires auth)
/// /auth/refresh                      rotate tokens (x-refresh-token)
/// /auth/logout                       close current session (requires auth)
/// /auth/sessions                     own active sessions (requires auth)
/// /auth/terminate-user-sessions      close a user's sessions (admin only)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/auth", auth::router())
}
