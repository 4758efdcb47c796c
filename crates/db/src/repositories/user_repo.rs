//! Repository for the `users` and `profile_settings` tables.

use std::collections::BTreeMap;

use sqlx::types::Json;
use sqlx::PgPool;
use warden_core::types::DbId;

use crate::models::user::{
    CreateUser, LinkProvider, ProfileSetting, UpdateProfileSetting, User,
};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, email, password_hash, first_name, last_name, role, \
                        auth_providers, provider_subjects, profile_picture, \
                        created_at, updated_at, deleted_at, created_by, updated_by, deleted_by";

const SETTING_COLUMNS: &str = "id, user_id, is_email_verified, is_password_reset_required, \
                                created_at, updated_at, deleted_at, created_by, updated_by, deleted_by";

/// Identity directory operations. Emails are stored as given; callers
/// normalise them before reaching this layer.
pub struct UserRepo;

impl UserRepo {
    /// Insert a user and its profile settings in one transaction.
    ///
    /// A duplicate email fails with the `uq_users_email` unique violation.
    pub async fn create(
        pool: &PgPool,
        input: &CreateUser,
    ) -> Result<(User, ProfileSetting), sqlx::Error> {
        let mut subjects = BTreeMap::new();
        if let Some(subject) = &input.provider_subject {
            subjects.insert(input.provider.as_str().to_string(), subject.clone());
        }

        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO users
                (email, password_hash, first_name, last_name, role,
                 auth_providers, provider_subjects, profile_picture)
             VALUES ($1, $2, $3, $4, $5, ARRAY[$6]::text[], $7, $8)
             RETURNING {COLUMNS}"
        );
        let user = sqlx::query_as::<_, User>(&query)
            .bind(&input.email)
            .bind(&input.password_hash)
            .bind(&input.first_name)
            .bind(&input.last_name)
            .bind(&input.role)
            .bind(input.provider.as_str())
            .bind(Json(&subjects))
            .bind(&input.profile_picture)
            .fetch_one(&mut *tx)
            .await?;

        let query = format!(
            "INSERT INTO profile_settings (user_id, is_email_verified, created_by)
             VALUES ($1, $2, $1)
             RETURNING {SETTING_COLUMNS}"
        );
        let settings = sqlx::query_as::<_, ProfileSetting>(&query)
            .bind(user.id)
            .bind(input.email_verified)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok((user, settings))
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a user by email (exact match on the normalised address).
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM users WHERE email = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// Update a user's password hash. Returns `true` if the row was updated.
    pub async fn update_password(
        pool: &PgPool,
        id: DbId,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $2, updated_by = $1
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Attach a provider in one statement: set-union into `auth_providers`,
    /// merge the subject into `provider_subjects`, and replace the picture
    /// only when one is supplied.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn link_provider(
        pool: &PgPool,
        id: DbId,
        input: &LinkProvider,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!(
            "UPDATE users SET
                auth_providers = CASE
                    WHEN $2 = ANY(auth_providers) THEN auth_providers
                    ELSE array_append(auth_providers, $2)
                END,
                provider_subjects = provider_subjects || jsonb_build_object($2::text, $3::text),
                profile_picture = COALESCE($4, profile_picture),
                updated_by = $1
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(input.provider.as_str())
            .bind(&input.subject)
            .bind(&input.profile_picture)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_profile_setting(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Option<ProfileSetting>, sqlx::Error> {
        let query = format!("SELECT {SETTING_COLUMNS} FROM profile_settings WHERE user_id = $1");
        sqlx::query_as::<_, ProfileSetting>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Patch profile flags. Only non-`None` fields in `input` are applied.
    ///
    /// Returns `None` if the user has no settings row.
    pub async fn update_profile_setting(
        pool: &PgPool,
        user_id: DbId,
        input: &UpdateProfileSetting,
    ) -> Result<Option<ProfileSetting>, sqlx::Error> {
        let query = format!(
            "UPDATE profile_settings SET
                is_email_verified = COALESCE($2, is_email_verified),
                is_password_reset_required = COALESCE($3, is_password_reset_required),
                updated_by = $1
             WHERE user_id = $1
             RETURNING {SETTING_COLUMNS}"
        );
        sqlx::query_as::<_, ProfileSetting>(&query)
            .bind(user_id)
            .bind(input.is_email_verified)
            .bind(input.is_password_reset_required)
            .fetch_optional(pool)
            .await
    }
}
