//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods
//! that accept `&PgPool` as the first argument.

pub mod audit_repo;
pub mod session_repo;
pub mod token_repo;
pub mod user_repo;

pub use audit_repo::AuthAuditRepo;
pub use session_repo::SessionRepo;
pub use token_repo::TokenRepo;
pub use user_repo::UserRepo;
