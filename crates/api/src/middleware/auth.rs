//! Token-based authentication extractors for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use warden_auth::credential_service::Principal;
use warden_core::error::CoreError;
use warden_core::types::DbId;
use warden_db::models::session::UserSession;
use warden_db::models::user::User;

use crate::error::AppError;
use crate::state::AppState;

/// Header carrying the refresh token on `POST /auth/refresh`.
pub const REFRESH_TOKEN_HEADER: &str = "x-refresh-token";

/// Authenticated caller extracted from an ACCESS token in the
/// `Authorization: Bearer <token>` header.
///
/// The token must verify, exist unrevoked in the ledger, and belong to a
/// live session of the user it names.
///
/// ```ignore
/// async fn my_handler(user: AuthUser) -> AppResult<Json<()>> {
///     tracing::info!(user_id = user.user_id, role = %user.role, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: DbId,
    /// The user's current role name (`"admin"` or `"user"`).
    pub role: String,
    pub user: User,
    /// The session the presented token belongs to.
    pub session: UserSession,
}

impl From<Principal> for AuthUser {
    fn from(principal: Principal) -> Self {
        Self {
            user_id: principal.user.id,
            role: principal.user.role.clone(),
            user: principal.user,
            session: principal.session,
        }
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(
                    "Missing Authorization header".into(),
                ))
            })?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid Authorization format. Expected: Bearer <token>".into(),
            ))
        })?;

        let principal = state.auth.credentials.authenticate_access(token.trim()).await?;
        Ok(principal.into())
    }
}

/// The raw refresh token presented in the `x-refresh-token` header.
///
/// Only extracts the header; verification happens in the handler so that
/// failures are audited.
#[derive(Debug, Clone)]
pub struct RefreshToken(pub String);

impl<S> FromRequestParts<S> for RefreshToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(REFRESH_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| RefreshToken(v.to_string()))
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(format!(
                    "Missing {REFRESH_TOKEN_HEADER} header"
                )))
            })
    }
}
