//! Row structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` entity struct matching the database row
//! - Create/update DTOs consumed by the matching repository

pub mod audit;
pub mod session;
pub mod stamps;
pub mod token;
pub mod user;
