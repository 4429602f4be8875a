//! Database operations for the `reviews` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{is_unique_violation, DbError};

/// A row from the `reviews` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReviewRow {
    pub id: i64,
    pub public_id: Uuid,
    pub project_id: Uuid,
    pub user_uid: String,
    pub display_name: String,
    pub rating: i16,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy)]
pub struct NewReview<'a> {
    pub project_id: Uuid,
    pub user_uid: &'a str,
    pub display_name: &'a str,
    pub rating: i16,
    pub comment: &'a str,
}

const REVIEW_COLUMNS: &str =
    "id, public_id, project_id, user_uid, display_name, rating, comment, created_at";

/// Inserts a review. One review per (project, user) is enforced by a unique
/// constraint, so concurrent duplicates cannot both land.
///
/// # Errors
///
/// Returns [`DbError::Conflict`] if the user already reviewed the project, or
/// [`DbError::Sqlx`] for any other failure.
pub async fn insert_review(pool: &PgPool, review: NewReview<'_>) -> Result<ReviewRow, DbError> {
    let public_id = Uuid::new_v4();

    sqlx::query_as::<_, ReviewRow>(&format!(
        "INSERT INTO reviews (public_id, project_id, user_uid, display_name, rating, comment) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING {REVIEW_COLUMNS}"
    ))
    .bind(public_id)
    .bind(review.project_id)
    .bind(review.user_uid)
    .bind(review.display_name)
    .bind(review.rating)
    .bind(review.comment)
    .fetch_one(pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            DbError::Conflict("user has already reviewed this project".to_string())
        } else {
            DbError::Sqlx(e)
        }
    })
}

/// Returns every review for a project, newest first. Reviews created in the
/// same instant are ordered by insertion, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_reviews_for_project(
    pool: &PgPool,
    project_id: Uuid,
) -> Result<Vec<ReviewRow>, DbError> {
    let rows = sqlx::query_as::<_, ReviewRow>(&format!(
        "SELECT {REVIEW_COLUMNS} FROM reviews \
         WHERE project_id = $1 \
         ORDER BY created_at DESC, id DESC"
    ))
    .bind(project_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Returns the review `user_uid` left on `project_id`, if any.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_review_for_user(
    pool: &PgPool,
    project_id: Uuid,
    user_uid: &str,
) -> Result<Option<ReviewRow>, DbError> {
    let row = sqlx::query_as::<_, ReviewRow>(&format!(
        "SELECT {REVIEW_COLUMNS} FROM reviews WHERE project_id = $1 AND user_uid = $2"
    ))
    .bind(project_id)
    .bind(user_uid)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}
