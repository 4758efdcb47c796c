//! Token kinds and the signed-envelope layout shared by issuer and verifier.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Key under which the caller-supplied payload is embedded in every token.
pub const ENVELOPE_KEY: &str = "payload";

/// Envelope claim carrying the token kind.
pub const KIND_CLAIM: &str = "typ";

/// The four kinds of signed credential. The kind picks the secret, the
/// expiry and the semantic use; it never changes after issuance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TokenKind {
    Access,
    Refresh,
    ConfirmEmail,
    PasswordReset,
}

impl TokenKind {
    pub const ALL: [TokenKind; 4] = [
        TokenKind::Access,
        TokenKind::Refresh,
        TokenKind::ConfirmEmail,
        TokenKind::PasswordReset,
    ];

    /// Value stored in `tokens.token_type`.
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
            TokenKind::ConfirmEmail => "confirm-email",
            TokenKind::PasswordReset => "password-reset",
        }
    }

    /// Single-use kinds must be revoked as soon as they verify.
    pub fn is_single_use(&self) -> bool {
        matches!(self, TokenKind::ConfirmEmail | TokenKind::PasswordReset)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TokenKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("Unknown token kind '{s}'")))
    }
}
