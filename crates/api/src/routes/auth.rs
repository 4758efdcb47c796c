//! Route definitions for the `/auth` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::auth;
use crate::state::AppState;

/// Routes mounted at `/auth`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/email/login", post(auth::login))
        .route("/email/signup", post(auth::signup))
        .route("/email/verify", get(auth::verify_email))
        .route("/email/resend", get(auth::resend_verification))
        .route("/password/forgot", post(auth::forgot_password))
        .route("/password/reset", post(auth::reset_password))
        .route("/password/change", post(auth::change_password))
        .route("/me", get(auth::me))
        .route("/refresh", post(auth::refresh))
        .route("/logout", post(auth::logout))
        .route("/sessions", get(auth::list_sessions))
        .route(
            "/terminate-user-sessions",
            post(auth::terminate_user_sessions),
        )
}
