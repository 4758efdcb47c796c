//! Bookkeeping columns shared by `users`, `profile_settings` and `sessions`.

use serde::Serialize;
use sqlx::FromRow;
use warden_core::types::{DbId, Timestamp};

/// Creation/update/soft-delete stamps, flattened into the owning row.
///
/// `updated_at` is maintained by the `set_updated_at` trigger.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct RecordStamps {
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub deleted_at: Option<Timestamp>,
    pub created_by: Option<DbId>,
    pub updated_by: Option<DbId>,
    pub deleted_by: Option<DbId>,
}

impl RecordStamps {
    /// Column list for `SELECT`/`RETURNING` clauses.
    pub const COLUMNS: &'static str =
        "created_at, updated_at, deleted_at, created_by, updated_by, deleted_by";

    /// Fresh stamps for a row created at `now` with no actor.
    pub fn new(now: Timestamp) -> Self {
        Self {
            created_at: now,
            updated_at: now,
            deleted_at: None,
            created_by: None,
            updated_by: None,
            deleted_by: None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}
