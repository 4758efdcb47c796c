//! Auth audit event names and detail redaction.
//!
//! Lives in `core` (zero internal deps) so both the recorder in
//! `warden-auth` and the HTTP layer share one vocabulary.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// Every outcome the audit log distinguishes. Stored in
/// `auth_audit_logs.event_type` via [`AuthEvent::as_str`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthEvent {
    LoginSuccess,
    LoginFailure,
    SignupSuccess,
    SignupFailure,
    EmailVerifiedSuccess,
    EmailVerifiedError,
    EmailResendSuccess,
    EmailResendError,
    ForgotPasswordSuccess,
    ForgotPasswordFailure,
    ResetPasswordSuccess,
    ResetPasswordFailure,
    ChangePasswordSuccess,
    ChangePasswordFailure,
    MeSuccess,
    MeFailure,
    RefreshSuccess,
    RefreshFailure,
    LogoutSuccess,
    LogoutFailure,
    TerminateSessionsSuccess,
    TerminateSessionsFailure,
}

impl AuthEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthEvent::LoginSuccess => "login_success",
            AuthEvent::LoginFailure => "login_failure",
            AuthEvent::SignupSuccess => "signup_success",
            AuthEvent::SignupFailure => "signup_failure",
            AuthEvent::EmailVerifiedSuccess => "email_verified_success",
            AuthEvent::EmailVerifiedError => "email_verified_error",
            AuthEvent::EmailResendSuccess => "email_resend_success",
            AuthEvent::EmailResendError => "email_resend_error",
            AuthEvent::ForgotPasswordSuccess => "forgot_password_success",
            AuthEvent::ForgotPasswordFailure => "forgot_password_failure",
            AuthEvent::ResetPasswordSuccess => "reset_password_success",
            AuthEvent::ResetPasswordFailure => "reset_password_failure",
            AuthEvent::ChangePasswordSuccess => "change_password_success",
            AuthEvent::ChangePasswordFailure => "change_password_failure",
            AuthEvent::MeSuccess => "me_success",
            AuthEvent::MeFailure => "me_failure",
            AuthEvent::RefreshSuccess => "refresh_success",
            AuthEvent::RefreshFailure => "refresh_failure",
            AuthEvent::LogoutSuccess => "logout_success",
            AuthEvent::LogoutFailure => "logout_failure",
            AuthEvent::TerminateSessionsSuccess => "terminate_sessions_success",
            AuthEvent::TerminateSessionsFailure => "terminate_sessions_failure",
        }
    }

    pub fn is_failure(&self) -> bool {
        let name = self.as_str();
        name.ends_with("_failure") || name.ends_with("_error")
    }
}

impl fmt::Display for AuthEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A success/failure pair for one public operation.
#[derive(Debug, Clone, Copy)]
pub struct EventPair {
    pub success: AuthEvent,
    pub failure: AuthEvent,
}

impl EventPair {
    pub const fn new(success: AuthEvent, failure: AuthEvent) -> Self {
        Self { success, failure }
    }

    /// Pick the event matching an operation's outcome.
    pub fn for_outcome<T, E>(&self, outcome: &Result<T, E>) -> AuthEvent {
        if outcome.is_ok() {
            self.success
        } else {
            self.failure
        }
    }
}

// ---------------------------------------------------------------------------
// Sensitive field redaction
// ---------------------------------------------------------------------------

/// Fields that should be redacted from audit log details before storage.
pub const SENSITIVE_FIELDS: &[&str] = &[
    "password",
    "token",
    "secret",
    "authorization",
    "credential",
    "hash",
];

/// Redact sensitive fields from a JSON value.
///
/// Replaces the value of any key containing one of [`SENSITIVE_FIELDS`] with
/// `"[REDACTED]"`, recursing into nested objects and arrays.
pub fn redact_sensitive_fields(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut redacted = serde_json::Map::new();
            for (key, val) in map {
                let lower_key = key.to_lowercase();
                if SENSITIVE_FIELDS.iter().any(|f| lower_key.contains(f)) {
                    redacted.insert(
                        key.clone(),
                        serde_json::Value::String("[REDACTED]".to_string()),
                    );
                } else {
                    redacted.insert(key.clone(), redact_sensitive_fields(val));
                }
            }
            serde_json::Value::Object(redacted)
        }
        serde_json::Value::Array(arr) => {
            serde_json::Value::Array(arr.iter().map(redact_sensitive_fields).collect())
        }
        other => other.clone(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
