//! Warden HTTP API library.
//!
//! Exposes the building blocks (config, state, error handling, routes, mail
//! dispatch) so integration tests and the binary entrypoint share them.

pub mod config;
pub mod error;
pub mod handlers;
pub mod mail;
pub mod middleware;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
