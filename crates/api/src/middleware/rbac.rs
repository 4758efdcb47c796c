//! Role checks layered on top of [`AuthUser`].

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use warden_core::error::CoreError;
use warden_core::roles::ROLE_ADMIN;

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

/// An authenticated caller whose access token carries the `admin` role.
///
/// A missing or invalid bearer token still answers 401; a valid token for
/// any other role answers 403.
pub struct RequireAdmin(pub AuthUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let caller = AuthUser::from_request_parts(parts, state).await?;
        ensure_role(&caller, ROLE_ADMIN)?;
        Ok(RequireAdmin(caller))
    }
}

fn ensure_role(caller: &AuthUser, role: &str) -> Result<(), AppError> {
    if caller.role == role {
        return Ok(());
    }
    tracing::debug!(user_id = caller.user_id, role = %caller.role, required = role, "Role check failed");
    Err(AppError::Core(CoreError::Forbidden(format!(
        "{role} role required"
    ))))
}
