//! Best-effort auth audit trail.
//!
//! Appends never fail the operation being audited; a store error is logged
//! at `warn` and dropped.

use std::sync::Arc;

use warden_core::audit::{redact_sensitive_fields, AuthEvent, EventPair};
use warden_core::types::DbId;
use warden_db::models::audit::CreateAuthAuditLog;

use crate::store::AuditLogStore;

/// Client metadata captured from the inbound request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMeta {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Clone)]
pub struct AuditRecorder {
    store: Arc<dyn AuditLogStore>,
}

impl AuditRecorder {
    pub fn new(store: Arc<dyn AuditLogStore>) -> Self {
        Self { store }
    }

    pub async fn record(
        &self,
        event: AuthEvent,
        user_id: Option<DbId>,
        meta: &RequestMeta,
        details: serde_json::Value,
    ) {
        let entry = CreateAuthAuditLog {
            user_id,
            event_type: event.as_str().to_string(),
            ip_address: meta.ip_address.clone(),
            device_info: meta.user_agent.clone(),
            details: redact_sensitive_fields(&details),
        };
        if let Err(e) = self.store.append_audit(&entry).await {
            tracing::warn!(event = %event, user_id, error = %e, "Failed to append auth audit entry");
        }
    }

    /// Record the success or failure event of `pair` depending on `outcome`.
    ///
    /// Failures carry the error message under `details.error`.
    pub async fn record_outcome<T, E>(
        &self,
        pair: EventPair,
        user_id: Option<DbId>,
        meta: &RequestMeta,
        details: serde_json::Value,
        outcome: &Result<T, E>,
    ) where
        T: Sync,
        E: std::fmt::Display + Sync,
    {
        let event = pair.for_outcome(outcome);
        let details = match (outcome, details) {
            (Err(e), serde_json::Value::Object(mut map)) => {
                map.insert("error".into(), serde_json::Value::from(e.to_string()));
                serde_json::Value::Object(map)
            }
            (Err(e), serde_json::Value::Null) => serde_json::json!({ "error": e.to_string() }),
            (_, details) => details,
        };
        self.record(event, user_id, meta, details).await;
    }
}
