//! Authentication providers a user identity can be linked to.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Password hash stored for accounts that can only sign in through a
/// federated provider. It is not a PHC string, so it can never verify.
pub const UNUSABLE_PASSWORD_HASH: &str = "!unusable";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    /// Email + password.
    Email,
    Google,
}

impl AuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthProvider::Email => "email",
            AuthProvider::Google => "google",
        }
    }

    pub fn is_federated(&self) -> bool {
        !matches!(self, AuthProvider::Email)
    }
}

impl fmt::Display for AuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthProvider {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Ok(AuthProvider::Email),
            "google" => Ok(AuthProvider::Google),
            other => Err(CoreError::Validation(format!("Unknown auth provider '{other}'"))),
        }
    }
}

/// Whether a stored password hash can ever match a password.
pub fn is_usable_password_hash(hash: &str) -> bool {
    !hash.is_empty() && hash != UNUSABLE_PASSWORD_HASH
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_names_round_trip() {
        assert_eq!("google".parse::<AuthProvider>().unwrap(), AuthProvider::Google);
        assert_eq!(AuthProvider::Email.to_string(), "email");
        assert!("github".parse::<AuthProvider>().is_err());
    }

    #[test]
    fn sentinel_hash_is_unusable() {
        assert!(!is_usable_password_hash(UNUSABLE_PASSWORD_HASH));
        assert!(!is_usable_password_hash(""));
        assert!(is_usable_password_hash("$argon2id$v=19$m=19456,t=2,p=1$abc$def"));
    }

    #[test]
    fn only_email_is_not_federated() {
        assert!(!AuthProvider::Email.is_federated());
        assert!(AuthProvider::Google.is_federated());
    }
}
