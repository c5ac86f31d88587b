//! Repository for the `users` table.

use propdesk_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::user::{AdminUpdateUser, CreateUser, UpdateProfile, User, UserFilter};
use crate::repositories::contains_pattern;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, email, password_hash, first_name, last_name, phone, role, \
                        is_active, failed_login_count, locked_until, last_login_at, \
                        created_at, updated_at";

/// Provides CRUD operations for users.
pub struct UserRepo;

impl UserRepo {
    /// Insert a new user, returning the created row. Emails are stored
    /// lower-cased.
    pub async fn create(pool: &PgPool, input: &CreateUser) -> Result<User, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (email, password_hash, first_name, last_name, phone, role)
             VALUES (LOWER($1), $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&input.email)
            .bind(&input.password_hash)
            .bind(&input.first_name)
            .bind(&input.last_name)
            .bind(&input.phone)
            .bind(&input.role)
            .fetch_one(pool)
            .await
    }

    /// Find a user by internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a user by email (case-insensitive).
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE email = LOWER($1)");
        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// List users matching `filter`, newest first.
    pub async fn list(
        pool: &PgPool,
        filter: &UserFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<User>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM users
             WHERE ($1::TEXT IS NULL OR role = $1)
               AND ($2::BOOLEAN IS NULL OR is_active = $2)
               AND ($3::TEXT IS NULL OR email ILIKE $3
                    OR first_name ILIKE $3 OR last_name ILIKE $3)
             ORDER BY created_at DESC
             LIMIT $4 OFFSET $5"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&filter.role)
            .bind(filter.is_active)
            .bind(contains_pattern(filter.search.as_deref()))
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Count users matching `filter`.
    pub async fn count(pool: &PgPool, filter: &UserFilter) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM users
             WHERE ($1::TEXT IS NULL OR role = $1)
               AND ($2::BOOLEAN IS NULL OR is_active = $2)
               AND ($3::TEXT IS NULL OR email ILIKE $3
                    OR first_name ILIKE $3 OR last_name ILIKE $3)",
        )
        .bind(&filter.role)
        .bind(filter.is_active)
        .bind(contains_pattern(filter.search.as_deref()))
        .fetch_one(pool)
        .await
    }

    /// Update the caller's own profile. Only non-`None` fields are applied.
    pub async fn update_profile(
        pool: &PgPool,
        id: DbId,
        input: &UpdateProfile,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!(
            "UPDATE users SET
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                phone = COALESCE($4, phone)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(&input.first_name)
            .bind(&input.last_name)
            .bind(&input.phone)
            .fetch_optional(pool)
            .await
    }

    /// Admin update of role and active flag.
    pub async fn admin_update(
        pool: &PgPool,
        id: DbId,
        input: &AdminUpdateUser,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!(
            "UPDATE users SET
                role = COALESCE($2, role),
                is_active = COALESCE($3, is_active)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(&input.role)
            .bind(input.is_active)
            .fetch_optional(pool)
            .await
    }

    /// Soft-deactivate a user by setting `is_active = false`.
    ///
    /// Returns `true` if the row was updated.
    pub async fn deactivate(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE users SET is_active = false WHERE id = $1 AND is_active = true")
                .bind(id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Increment the failed login counter, returning the new value.
    pub async fn increment_failed_login(pool: &PgPool, id: DbId) -> Result<i32, sqlx::Error> {
        sqlx::query_scalar(
            "UPDATE users SET failed_login_count = failed_login_count + 1
             WHERE id = $1
             RETURNING failed_login_count",
        )
        .bind(id)
        .fetch_one(pool)
        .await
    }

    /// Lock a user account until the specified timestamp.
    pub async fn lock_account(
        pool: &PgPool,
        id: DbId,
        until: Timestamp,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET locked_until = $2 WHERE id = $1")
            .bind(id)
            .bind(until)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Record a successful login: reset `failed_login_count` to 0, clear `locked_until`,
    /// and set `last_login_at` to now.
    pub async fn record_successful_login(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE users SET
                failed_login_count = 0,
                locked_until = NULL,
                last_login_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Update a user's password hash. Returns `true` if the row was updated.
    pub async fn update_password(
        pool: &PgPool,
        id: DbId,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Whether an active user with `id` has `role`.
    pub async fn has_role(pool: &PgPool, id: DbId, role: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE id = $1 AND role = $2 AND is_active = true)",
        )
        .bind(id)
        .bind(role)
        .fetch_one(pool)
        .await
    }
}
