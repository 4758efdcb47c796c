use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use uuid::Uuid;
use warden_auth::error::AuthError;
use warden_core::error::CoreError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] and [`AuthError`]. Implements [`IntoResponse`] to
/// produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `warden_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A typed outcome of the credential/session core, classified through
    /// `From<AuthError> for CoreError`.
    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Core(CoreError::Validation(errors.to_string()))
    }
}

/// Rendered pieces of an error response.
struct ErrorParts {
    status: StatusCode,
    code: &'static str,
    message: String,
    correlation_id: Option<Uuid>,
}

impl ErrorParts {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            correlation_id: None,
        }
    }

    /// Log `detail` under a fresh correlation id and hide it from the client.
    fn internal(detail: &str) -> Self {
        let correlation_id = Uuid::new_v4();
        tracing::error!(%correlation_id, error = %detail, "Internal error");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "INTERNAL_ERROR",
            message: "An internal error occurred".to_string(),
            correlation_id: Some(correlation_id),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let parts = match self {
            AppError::Core(core) => classify_core_error(core),
            AppError::Auth(err) => classify_core_error(CoreError::from(err)),
        };

        let mut body = json!({
            "error": parts.message,
            "code": parts.code,
        });
        if let Some(id) = parts.correlation_id {
            body["correlation_id"] = json!(id);
        }

        (parts.status, axum::Json(body)).into_response()
    }
}

fn classify_core_error(core: CoreError) -> ErrorParts {
    match core {
        CoreError::NotFound { entity } => ErrorParts::new(
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{entity} not found"),
        ),
        CoreError::Validation(msg) => {
            ErrorParts::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg)
        }
        CoreError::Conflict(msg) => ErrorParts::new(StatusCode::CONFLICT, "CONFLICT", msg),
        CoreError::Unauthorized(msg) => {
            ErrorParts::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg)
        }
        CoreError::Forbidden(msg) => ErrorParts::new(StatusCode::FORBIDDEN, "FORBIDDEN", msg),
        CoreError::Internal(msg) => ErrorParts::internal(&msg),
    }
}
