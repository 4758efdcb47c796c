//! Domain vocabulary shared by every warden crate.
//!
//! Nothing in here performs I/O: ids and timestamps, the HTTP-agnostic
//! [`error::CoreError`], token kinds, expiry-duration parsing, auth
//! providers, role names and audit event names.

pub mod audit;
pub mod duration;
pub mod error;
pub mod hashing;
pub mod providers;
pub mod roles;
pub mod tokens;
pub mod types;
