//! SHA-256 digest of bearer secrets.
//!
//! Token and session rows never hold a signed token verbatim: they hold this
//! digest, so a database leak does not hand out live credentials. Lookups
//! hash the presented string first.

use sha2::{Digest, Sha256};

/// Compute a SHA-256 hex digest of the given bytes.
pub fn sha256_hex(data: &[u8]) -> String {
    let hash = Sha256::digest(data);
    format!("{hash:x}")
}

/// Digest of a token string as stored in the `tokens` and `sessions` tables.
pub fn token_digest(token: &str) -> String {
    sha256_hex(token.as_bytes())
}
