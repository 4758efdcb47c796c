//! Handlers for the `/auth` resource.
//!
//! Every public operation records a success or failure entry in the auth
//! audit log. Recording never changes the response.

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::response::Redirect;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;
use warden_auth::credential_service::{EmailClaims, PasswordUpdate, SignupInput};
use warden_auth::error::{AuthError, AuthResult};
use warden_auth::session_service::{DeviceInfo, SessionTokens};
use warden_core::audit::{AuthEvent, EventPair};
use warden_core::error::CoreError;
use warden_core::tokens::TokenKind;
use warden_core::types::DbId;
use warden_db::models::session::SessionResponse;
use warden_db::models::user::{ProfileSetting, UserResponse};

use crate::error::{AppError, AppResult};
use crate::mail::{AuthMail, MailKind};
use crate::middleware::auth::{AuthUser, RefreshToken};
use crate::middleware::rbac::RequireAdmin;
use crate::middleware::request_meta::ClientMeta;
use crate::response::{DataResponse, MessageResponse};
use crate::state::AppState;

const LOGIN: EventPair = EventPair::new(AuthEvent::LoginSuccess, AuthEvent::LoginFailure);
const SIGNUP: EventPair = EventPair::new(AuthEvent::SignupSuccess, AuthEvent::SignupFailure);
const EMAIL_VERIFY: EventPair =
    EventPair::new(AuthEvent::EmailVerifiedSuccess, AuthEvent::EmailVerifiedError);
const EMAIL_RESEND: EventPair =
    EventPair::new(AuthEvent::EmailResendSuccess, AuthEvent::EmailResendError);
const FORGOT_PASSWORD: EventPair = EventPair::new(
    AuthEvent::ForgotPasswordSuccess,
    AuthEvent::ForgotPasswordFailure,
);
const RESET_PASSWORD: EventPair = EventPair::new(
    AuthEvent::ResetPasswordSuccess,
    AuthEvent::ResetPasswordFailure,
);
const CHANGE_PASSWORD: EventPair = EventPair::new(
    AuthEvent::ChangePasswordSuccess,
    AuthEvent::ChangePasswordFailure,
);
const ME: EventPair = EventPair::new(AuthEvent::MeSuccess, AuthEvent::MeFailure);
const REFRESH: EventPair = EventPair::new(AuthEvent::RefreshSuccess, AuthEvent::RefreshFailure);
const LOGOUT: EventPair = EventPair::new(AuthEvent::LogoutSuccess, AuthEvent::LogoutFailure);
const TERMINATE_SESSIONS: EventPair = EventPair::new(
    AuthEvent::TerminateSessionsSuccess,
    AuthEvent::TerminateSessionsFailure,
);

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/email/login`.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
    #[serde(flatten)]
    pub device: DeviceInfo,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: UserResponse,
    pub tokens: SessionTokens,
    /// The client should route the user to a set-password screen.
    pub password_reset_required: bool,
}

/// Request body for `POST /auth/email/signup`.
#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
    #[validate(length(max = 255))]
    pub first_name: Option<String>,
    #[validate(length(max = 255))]
    pub last_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub user: UserResponse,
}

/// `?token=` on the verify and reset endpoints.
#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    pub token: Option<String>,
}

/// `?email=` on `GET /auth/email/resend`.
#[derive(Debug, Deserialize, Validate)]
pub struct EmailQuery {
    #[validate(email)]
    pub email: String,
}

/// Request body for `POST /auth/password/forgot`.
#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email)]
    pub email: String,
}

/// Request body for `POST /auth/password/reset`.
#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
    #[serde(default)]
    pub should_logout_all_sessions: bool,
}

/// Request body for `POST /auth/password/change`.
#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
    pub confirm_password: String,
    #[serde(default)]
    pub should_logout_all_sessions: bool,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: UserResponse,
    pub settings: ProfileSetting,
    pub session: SessionResponse,
}

/// Request body for `POST /auth/terminate-user-sessions`.
#[derive(Debug, Deserialize)]
pub struct TerminateSessionsRequest {
    pub user_id: DbId,
}

#[derive(Debug, Serialize)]
pub struct TerminateSessionsResponse {
    pub user_id: DbId,
    pub sessions_terminated: u64,
}

// ---------------------------------------------------------------------------
// Email + password
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/email/login
///
/// Check the credentials and start a session. Returns the token pair.
pub async fn login(
    State(state): State<AppState>,
    ClientMeta(meta): ClientMeta,
    Json(input): Json<LoginRequest>,
) -> AppResult<Json<DataResponse<LoginResponse>>> {
    input.validate()?;

    let outcome = start_login(&state, &input).await;
    state
        .auth
        .audit
        .record_outcome(
            LOGIN,
            outcome.as_ref().ok().map(|r| r.user.id),
            &meta,
            json!({ "email": input.email }),
            &outcome,
        )
        .await;

    Ok(Json(DataResponse { data: outcome? }))
}

async fn start_login(state: &AppState, input: &LoginRequest) -> AuthResult<LoginResponse> {
    let login = state
        .auth
        .credentials
        .login(&input.email, &input.password)
        .await?;
    let tokens = state
        .auth
        .sessions
        .start(login.user.id, &login.user.role, input.device.clone())
        .await?;
    Ok(LoginResponse {
        user: login.user.to_response(),
        tokens,
        password_reset_required: login.password_reset_required,
    })
}

/// POST /api/v1/auth/email/signup
///
/// Register an unverified account and mail a confirmation link.
pub async fn signup(
    State(state): State<AppState>,
    ClientMeta(meta): ClientMeta,
    Json(input): Json<SignupRequest>,
) -> AppResult<Json<DataResponse<SignupResponse>>> {
    input.validate()?;
    let email = input.email.clone();

    let outcome = register(&state, input).await;
    state
        .auth
        .audit
        .record_outcome(
            SIGNUP,
            outcome.as_ref().ok().map(|(user, _)| user.id),
            &meta,
            json!({ "email": email }),
            &outcome,
        )
        .await;

    let (user, mail) = outcome?;
    deliver(&state, &mail).await;
    Ok(Json(DataResponse {
        data: SignupResponse { user },
    }))
}

async fn register(state: &AppState, input: SignupRequest) -> AuthResult<(UserResponse, AuthMail)> {
    let outcome = state
        .auth
        .credentials
        .signup(SignupInput {
            email: input.email,
            password: input.password,
            first_name: input.first_name,
            last_name: input.last_name,
            role: None,
        })
        .await?;
    let mail = confirmation_mail(state, &outcome.confirm_claims).await?;
    Ok((outcome.user.to_response(), mail))
}

/// GET /api/v1/auth/email/verify?token=
///
/// Redeem a confirmation link and redirect the browser: to the
/// set-password page if the account still needs one, to the success page
/// otherwise, and to the error page on any failure.
pub async fn verify_email(
    State(state): State<AppState>,
    ClientMeta(meta): ClientMeta,
    Query(query): Query<TokenQuery>,
) -> Redirect {
    let outcome = match query.token.as_deref() {
        Some(token) => state.auth.credentials.confirm_email(token).await,
        None => Err(AuthError::Validation("token is required".into())),
    };
    state
        .auth
        .audit
        .record_outcome(
            EMAIL_VERIFY,
            outcome.as_ref().ok().map(|s| s.user_id),
            &meta,
            json!({}),
            &outcome,
        )
        .await;

    let redirects = &state.auth.tokens.config().redirects;
    let target = match &outcome {
        Ok(settings) if settings.is_password_reset_required => &redirects.password_reset,
        Ok(_) => &redirects.success,
        Err(e) => {
            tracing::info!(error = %e, "Email verification failed");
            &redirects.error
        }
    };
    Redirect::to(target)
}

/// GET /api/v1/auth/email/resend?email=
///
/// Mail a fresh confirmation link to an unverified account.
pub async fn resend_verification(
    State(state): State<AppState>,
    ClientMeta(meta): ClientMeta,
    Query(query): Query<EmailQuery>,
) -> AppResult<Json<DataResponse<MessageResponse>>> {
    query.validate()?;

    let outcome = resend_mail(&state, &query.email).await;
    state
        .auth
        .audit
        .record_outcome(
            EMAIL_RESEND,
            outcome.as_ref().ok().map(|(id, _)| *id),
            &meta,
            json!({ "email": query.email }),
            &outcome,
        )
        .await;

    let (_, mail) = outcome?;
    deliver(&state, &mail).await;
    Ok(Json(DataResponse::message("Confirmation email sent")))
}

// ---------------------------------------------------------------------------
// Passwords
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/password/forgot
///
/// Mail a password-reset link. Answers 200 whether or not the account
/// exists.
pub async fn forgot_password(
    State(state): State<AppState>,
    ClientMeta(meta): ClientMeta,
    Json(input): Json<ForgotPasswordRequest>,
) -> AppResult<Json<DataResponse<MessageResponse>>> {
    input.validate()?;

    let outcome = reset_mail(&state, &input.email).await;
    state
        .auth
        .audit
        .record_outcome(
            FORGOT_PASSWORD,
            outcome.as_ref().ok().map(|(id, _)| *id),
            &meta,
            json!({ "email": input.email }),
            &outcome,
        )
        .await;

    match outcome {
        Ok((_, mail)) => deliver(&state, &mail).await,
        Err(AuthError::UserNotFound) => {
            tracing::debug!("Password reset requested for unknown email");
        }
        Err(e) => {
            tracing::warn!(error = %e.chain(), "Password reset request failed");
        }
    }
    Ok(Json(DataResponse::message(
        "If an account exists for this email, a password reset link has been sent",
    )))
}

/// POST /api/v1/auth/password/reset?token=
///
/// Redeem a password-reset link and set the new password.
pub async fn reset_password(
    State(state): State<AppState>,
    ClientMeta(meta): ClientMeta,
    Query(query): Query<TokenQuery>,
    Json(input): Json<ResetPasswordRequest>,
) -> AppResult<Json<DataResponse<PasswordUpdate>>> {
    input.validate()?;

    let outcome = match query.token.as_deref() {
        Some(token) => {
            state
                .auth
                .credentials
                .redeem_password_reset(token, &input.password, input.should_logout_all_sessions)
                .await
        }
        None => Err(AuthError::Validation("token is required".into())),
    };
    state
        .auth
        .audit
        .record_outcome(
            RESET_PASSWORD,
            None,
            &meta,
            json!({ "should_logout_all_sessions": input.should_logout_all_sessions }),
            &outcome,
        )
        .await;

    Ok(Json(DataResponse { data: outcome? }))
}

/// POST /api/v1/auth/password/change
///
/// Set a new password for the authenticated caller.
pub async fn change_password(
    State(state): State<AppState>,
    ClientMeta(meta): ClientMeta,
    auth_user: AuthUser,
    Json(input): Json<ChangePasswordRequest>,
) -> AppResult<Json<DataResponse<PasswordUpdate>>> {
    input.validate()?;

    let outcome = if input.password != input.confirm_password {
        Err(AuthError::Validation("Passwords do not match".into()))
    } else {
        state
            .auth
            .credentials
            .change_password(
                auth_user.user_id,
                &input.password,
                input.should_logout_all_sessions,
            )
            .await
    };
    state
        .auth
        .audit
        .record_outcome(
            CHANGE_PASSWORD,
            Some(auth_user.user_id),
            &meta,
            json!({ "should_logout_all_sessions": input.should_logout_all_sessions }),
            &outcome,
        )
        .await;

    Ok(Json(DataResponse { data: outcome? }))
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

/// GET /api/v1/auth/me
pub async fn me(
    State(state): State<AppState>,
    ClientMeta(meta): ClientMeta,
    auth_user: AuthUser,
) -> AppResult<Json<DataResponse<MeResponse>>> {
    let outcome = state.auth.credentials.me(auth_user.user_id).await;
    state
        .auth
        .audit
        .record_outcome(ME, Some(auth_user.user_id), &meta, json!({}), &outcome)
        .await;

    let profile = outcome?;
    Ok(Json(DataResponse {
        data: MeResponse {
            user: profile.user.to_response(),
            settings: profile.settings,
            session: auth_user.session.to_response(),
        },
    }))
}

/// POST /api/v1/auth/refresh
///
/// Exchange the refresh token in `x-refresh-token` for a new pair. The body
/// may carry updated device fields.
pub async fn refresh(
    State(state): State<AppState>,
    ClientMeta(meta): ClientMeta,
    RefreshToken(token): RefreshToken,
    body: Bytes,
) -> AppResult<Json<DataResponse<SessionTokens>>> {
    let device = parse_device(&body)?;

    let outcome = rotate_session(&state, &token, device).await;
    state
        .auth
        .audit
        .record_outcome(
            REFRESH,
            outcome.as_ref().ok().map(|(id, _)| *id),
            &meta,
            json!({}),
            &outcome,
        )
        .await;

    let (_, tokens) = outcome?;
    Ok(Json(DataResponse { data: tokens }))
}

/// POST /api/v1/auth/logout
///
/// Revoke both tokens of the caller's session and close it.
pub async fn logout(
    State(state): State<AppState>,
    ClientMeta(meta): ClientMeta,
    auth_user: AuthUser,
) -> AppResult<Json<DataResponse<MessageResponse>>> {
    let outcome = state.auth.credentials.logout(&auth_user.session).await;
    state
        .auth
        .audit
        .record_outcome(
            LOGOUT,
            Some(auth_user.user_id),
            &meta,
            json!({ "session_id": auth_user.session.id }),
            &outcome,
        )
        .await;

    outcome?;
    Ok(Json(DataResponse::message("Logged out")))
}

/// GET /api/v1/auth/sessions
///
/// The caller's active sessions, newest first.
pub async fn list_sessions(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<DataResponse<Vec<SessionResponse>>>> {
    let sessions = state
        .auth
        .credentials
        .list_sessions(auth_user.user_id)
        .await?;
    Ok(Json(DataResponse {
        data: sessions.iter().map(|s| s.to_response()).collect(),
    }))
}

/// POST /api/v1/auth/terminate-user-sessions
///
/// Administrative: close every active session of the named user.
pub async fn terminate_user_sessions(
    State(state): State<AppState>,
    ClientMeta(meta): ClientMeta,
    RequireAdmin(admin): RequireAdmin,
    Json(input): Json<TerminateSessionsRequest>,
) -> AppResult<Json<DataResponse<TerminateSessionsResponse>>> {
    let outcome = state
        .auth
        .credentials
        .terminate_user_sessions(input.user_id)
        .await;
    state
        .auth
        .audit
        .record_outcome(
            TERMINATE_SESSIONS,
            Some(admin.user_id),
            &meta,
            json!({ "target_user_id": input.user_id }),
            &outcome,
        )
        .await;

    Ok(Json(DataResponse {
        data: TerminateSessionsResponse {
            user_id: input.user_id,
            sessions_terminated: outcome?,
        },
    }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Issue a CONFIRM_EMAIL token for `claims` and wrap its link in a message.
async fn confirmation_mail(state: &AppState, claims: &EmailClaims) -> AuthResult<AuthMail> {
    let issued = state
        .auth
        .tokens
        .issue(TokenKind::ConfirmEmail, claims)
        .await?;
    Ok(AuthMail {
        to: claims.email.clone(),
        kind: MailKind::ConfirmEmail,
        link: state.config.verify_email_link(&issued.token),
        expires_at: issued.expires_at,
    })
}

async fn resend_mail(state: &AppState, email: &str) -> AuthResult<(DbId, AuthMail)> {
    let claims = state.auth.credentials.resend_verification(email).await?;
    let mail = confirmation_mail(state, &claims).await?;
    Ok((claims.user_id, mail))
}

async fn reset_mail(state: &AppState, email: &str) -> AuthResult<(DbId, AuthMail)> {
    let claims = state.auth.credentials.forgot_password(email).await?;
    let issued = state
        .auth
        .tokens
        .issue(TokenKind::PasswordReset, &claims)
        .await?;
    let mail = AuthMail {
        to: claims.email,
        kind: MailKind::PasswordReset,
        link: state.config.password_reset_link(&issued.token),
        expires_at: issued.expires_at,
    };
    Ok((claims.user_id, mail))
}

async fn rotate_session(
    state: &AppState,
    refresh_token: &str,
    device: DeviceInfo,
) -> AuthResult<(DbId, SessionTokens)> {
    let principal = state
        .auth
        .credentials
        .authenticate_refresh(refresh_token)
        .await?;
    let tokens = state
        .auth
        .credentials
        .refresh_session(&principal, device)
        .await?;
    Ok((principal.user.id, tokens))
}

/// Send `mail`. Failures are logged, never returned.
async fn deliver(state: &AppState, mail: &AuthMail) {
    if let Err(e) = state.mailer.send(mail).await {
        tracing::error!(
            to = %mail.to,
            kind = mail.kind.as_str(),
            error = %e,
            "Failed to send auth email"
        );
    }
}

/// An empty body keeps the session's device fields.
fn parse_device(body: &[u8]) -> AppResult<DeviceInfo> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(DeviceInfo::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::Core(CoreError::Validation(format!("Invalid request body: {e}"))))
}
