//! Database operations for the `users` table (the profile store).

use chrono::{DateTime, Utc};
use pulsevest_core::Role;
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `users` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: i64,
    pub uid: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub pulse_points: Decimal,
    pub contact_info: Option<String>,
    pub investment_interests: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Directory listing of an investor with a completed profile.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct InvestorRow {
    pub uid: String,
    pub name: String,
    pub contact_info: Option<String>,
    pub investment_interests: String,
}

const USER_COLUMNS: &str = "id, uid, name, email, role, pulse_points, contact_info, \
                            investment_interests, created_at, updated_at";

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Creates a profile for `uid` unless one already exists.
///
/// Returns `Some(row)` when a new profile was inserted and `None` when a
/// profile for `uid` was already present (which is left untouched).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn create_user(
    pool: &PgPool,
    uid: &str,
    name: &str,
    email: &str,
    role: Role,
) -> Result<Option<UserRow>, DbError> {
    let row = sqlx::query_as::<_, UserRow>(&format!(
        "INSERT INTO users (uid, name, email, role) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (uid) DO NOTHING \
         RETURNING {USER_COLUMNS}"
    ))
    .bind(uid)
    .bind(name)
    .bind(email)
    .bind(role.as_str())
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Returns the profile for `uid`, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_user_by_uid(pool: &PgPool, uid: &str) -> Result<Option<UserRow>, DbError> {
    let row = sqlx::query_as::<_, UserRow>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE uid = $1"
    ))
    .bind(uid)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Sparse update of the editable profile fields.
///
/// `name` uses `None` = keep. The nullable investor fields use the
/// `Option<Option<_>>` convention: `None` = keep, `Some(None)` = clear,
/// `Some(Some(v))` = set.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no profile exists for `uid`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn update_user_profile(
    pool: &PgPool,
    uid: &str,
    name: Option<&str>,
    contact_info: Option<Option<&str>>,
    investment_interests: Option<Option<&str>>,
) -> Result<UserRow, DbError> {
    let contact_info_supplied = contact_info.is_some();
    let contact_info_val = contact_info.flatten();
    let interests_supplied = investment_interests.is_some();
    let interests_val = investment_interests.flatten();

    sqlx::query_as::<_, UserRow>(&format!(
        "UPDATE users \
         SET name                 = COALESCE($2, name), \
             contact_info         = CASE WHEN $3::BOOL THEN $4 ELSE contact_info END, \
             investment_interests = CASE WHEN $5::BOOL THEN $6 ELSE investment_interests END, \
             updated_at           = NOW() \
         WHERE uid = $1 \
         RETURNING {USER_COLUMNS}"
    ))
    .bind(uid)
    .bind(name)
    .bind(contact_info_supplied)
    .bind(contact_info_val)
    .bind(interests_supplied)
    .bind(interests_val)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Adds `points` to the PulsePoints balance of `uid`.
///
/// Returns `false` when no profile exists for `uid` (nothing credited).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn credit_points(pool: &PgPool, uid: &str, points: Decimal) -> Result<bool, DbError> {
    let result = sqlx::query(
        "UPDATE users \
         SET pulse_points = pulse_points + $2, updated_at = NOW() \
         WHERE uid = $1",
    )
    .bind(uid)
    .bind(points)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Returns investors whose investment interests are filled in, ordered by name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_investors(pool: &PgPool) -> Result<Vec<InvestorRow>, DbError> {
    let rows = sqlx::query_as::<_, InvestorRow>(
        "SELECT uid, name, contact_info, investment_interests \
         FROM users \
         WHERE role = 'investor' \
           AND investment_interests IS NOT NULL \
           AND btrim(investment_interests) <> '' \
         ORDER BY name, id",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
