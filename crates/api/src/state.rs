use std::sync::Arc;

use warden_auth::AuthServices;

use crate::config::ServerConfig;
use crate::mail::Mailer;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool. `None` when the services run over an
    /// in-process store.
    pub pool: Option<warden_db::DbPool>,
    pub config: Arc<ServerConfig>,
    /// Token, session, credential and audit services.
    pub auth: AuthServices,
    /// Outbound mail for confirmation and password-reset links.
    pub mailer: Arc<dyn Mailer>,
}
