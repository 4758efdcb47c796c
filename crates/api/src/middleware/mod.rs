//! Request extractors.
//!
//! - [`auth::AuthUser`] -- Caller authenticated by an ACCESS token in the `Authorization` header.
//! - [`auth::RefreshToken`] -- Raw REFRESH token from the `x-refresh-token` header.
//! - [`rbac::RequireAdmin`] -- Requires the `admin` role.
//! - [`request_meta::ClientMeta`] -- Client IP and user agent for the audit log.

pub mod auth;
pub mod rbac;
pub mod request_meta;
