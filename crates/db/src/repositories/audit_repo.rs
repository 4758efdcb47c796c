//! Repository for the append-only `auth_audit_logs` table.

use sqlx::PgPool;

use crate::models::audit::{AuthAuditLog, CreateAuthAuditLog};

const COLUMNS: &str =
    "id, user_id, event_type, ip_address, device_info, details, event_timestamp";

pub struct AuthAuditRepo;

impl AuthAuditRepo {
    /// Append one entry, returning the stored row.
    pub async fn create(
        pool: &PgPool,
        input: &CreateAuthAuditLog,
    ) -> Result<AuthAuditLog, sqlx::Error> {
        let query = format!(
            "INSERT INTO auth_audit_logs (user_id, event_type, ip_address, device_info, details)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AuthAuditLog>(&query)
            .bind(input.user_id)
            .bind(&input.event_type)
            .bind(&input.ip_address)
            .bind(&input.device_info)
            .bind(&input.details)
            .fetch_one(pool)
            .await
    }
}
