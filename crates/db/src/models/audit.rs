//! Auth audit log model and DTO.
//!
//! Entries are append-only and carry no `updated_at`.

use serde::Serialize;
use sqlx::FromRow;
use warden_core::types::{DbId, Timestamp};

/// A row from the `auth_audit_logs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AuthAuditLog {
    pub id: DbId,
    pub user_id: Option<DbId>,
    pub event_type: String,
    pub ip_address: Option<String>,
    pub device_info: Option<String>,
    pub details: serde_json::Value,
    pub event_timestamp: Timestamp,
}

/// DTO for appending an audit entry. `details` should already be redacted.
#[derive(Debug, Clone)]
pub struct CreateAuthAuditLog {
    pub user_id: Option<DbId>,
    pub event_type: String,
    pub ip_address: Option<String>,
    pub device_info: Option<String>,
    pub details: serde_json::Value,
}
