//! Token-kind configuration loaded from the environment.

use std::str::FromStr;

use jsonwebtoken::Algorithm;
use warden_core::duration::parse_duration_ms;
use warden_core::tokens::TokenKind;

use crate::password::DEFAULT_MIN_PASSWORD_LENGTH;
use crate::signer::is_hmac;

/// Secret and lifetime of one token kind.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub secret: String,
    pub expiry_ms: i64,
}

impl TokenConfig {
    /// Lifetime in whole seconds, rounded up, at least one.
    pub fn expiry_secs(&self) -> i64 {
        (self.expiry_ms.saturating_add(999) / 1000).max(1)
    }
}

/// Where the email-confirmation link sends the browser.
#[derive(Debug, Clone)]
pub struct RedirectConfig {
    pub success: String,
    pub error: String,
    /// Target for verified users who must still set a new password.
    pub password_reset: String,
}

/// Immutable configuration of the credential core.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub algorithm: Algorithm,
    pub access: TokenConfig,
    pub refresh: TokenConfig,
    pub confirm_email: TokenConfig,
    pub password_reset: TokenConfig,
    pub redirects: RedirectConfig,
    pub min_password_length: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

impl AuthConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var                                | Required | Default          |
    /// |----------------------------------------|----------|------------------|
    /// | `JWT_ACCESS_TOKEN_SECRET`              | **yes**  | --               |
    /// | `JWT_ACCESS_TOKEN_EXPIRY`              | no       | `15m`            |
    /// | `JWT_REFRESH_TOKEN_SECRET`             | **yes**  | --               |
    /// | `JWT_REFRESH_TOKEN_EXPIRY`             | no       | `7d`             |
    /// | `JWT_CONFIRM_EMAIL_TOKEN_SECRET`       | **yes**  | --               |
    /// | `JWT_CONFIRM_EMAIL_TOKEN_EXPIRY`       | no       | `1d`             |
    /// | `JWT_PASSWORD_RESET_TOKEN_SECRET`      | **yes**  | --               |
    /// | `JWT_PASSWORD_RESET_TOKEN_EXPIRY`      | no       | `1h`             |
    /// | `JWT_ALGORITHM`                        | no       | `HS256`          |
    /// | `VERIFY_EMAIL_SUCCESS_REDIRECT`        | **yes**  | --               |
    /// | `VERIFY_EMAIL_ERROR_REDIRECT`          | **yes**  | --               |
    /// | `VERIFY_EMAIL_PASSWORD_RESET_REDIRECT` | no       | success redirect |
    /// | `PASSWORD_MIN_LENGTH`                  | no       | `8`              |
    ///
    /// # Panics
    ///
    /// Panics on any missing or invalid value. Misconfiguration is fatal at
    /// startup, never a runtime error.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
            .unwrap_or_else(|e| panic!("invalid auth configuration: {e}"))
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let token = |secret_var: &'static str, expiry_var: &'static str, default: &str| {
            let secret = required(secret_var)?;
            let raw = get(expiry_var).unwrap_or_else(|| default.to_string());
            let expiry_ms = parse_duration_ms(&raw).map_err(|e| ConfigError::Invalid {
                var: expiry_var,
                reason: e.to_string(),
            })?;
            Ok::<_, ConfigError>(TokenConfig { secret, expiry_ms })
        };

        let algorithm = match get("JWT_ALGORITHM") {
            None => Algorithm::HS256,
            Some(raw) => {
                let alg = Algorithm::from_str(raw.trim()).map_err(|e| ConfigError::Invalid {
                    var: "JWT_ALGORITHM",
                    reason: e.to_string(),
                })?;
                if !is_hmac(alg) {
                    return Err(ConfigError::Invalid {
                        var: "JWT_ALGORITHM",
                        reason: format!("{alg:?} is not an HMAC algorithm"),
                    });
                }
                alg
            }
        };

        let success = required("VERIFY_EMAIL_SUCCESS_REDIRECT")?;
        let redirects = RedirectConfig {
            error: required("VERIFY_EMAIL_ERROR_REDIRECT")?,
            password_reset: get("VERIFY_EMAIL_PASSWORD_RESET_REDIRECT")
                .unwrap_or_else(|| success.clone()),
            success,
        };

        let min_password_length = match get("PASSWORD_MIN_LENGTH") {
            None => DEFAULT_MIN_PASSWORD_LENGTH,
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|len| *len > 0)
                .ok_or_else(|| ConfigError::Invalid {
                    var: "PASSWORD_MIN_LENGTH",
                    reason: format!("`{raw}` is not a positive integer"),
                })?,
        };

        Ok(Self {
            algorithm,
            access: token("JWT_ACCESS_TOKEN_SECRET", "JWT_ACCESS_TOKEN_EXPIRY", "15m")?,
            refresh: token("JWT_REFRESH_TOKEN_SECRET", "JWT_REFRESH_TOKEN_EXPIRY", "7d")?,
            confirm_email: token(
                "JWT_CONFIRM_EMAIL_TOKEN_SECRET",
                "JWT_CONFIRM_EMAIL_TOKEN_EXPIRY",
                "1d",
            )?,
            password_reset: token(
                "JWT_PASSWORD_RESET_TOKEN_SECRET",
                "JWT_PASSWORD_RESET_TOKEN_EXPIRY",
                "1h",
            )?,
            redirects,
            min_password_length,
        })
    }

    pub fn for_kind(&self, kind: TokenKind) -> &TokenConfig {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
            TokenKind::ConfirmEmail => &self.confirm_email,
            TokenKind::PasswordReset => &self.password_reset,
        }
    }
}
