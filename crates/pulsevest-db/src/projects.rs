//! Database operations for the `projects` table.

use chrono::{DateTime, Utc};
use pulsevest_core::{CategoryScore, MediaKind};
use rust_decimal::Decimal;
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row and input types
// ---------------------------------------------------------------------------

/// A row from the `projects` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProjectRow {
    pub id: i64,
    pub public_id: Uuid,
    pub creator_id: String,
    pub title: String,
    pub stage_name: String,
    pub real_name: String,
    pub description: String,
    pub funding_goal: Decimal,
    pub funding_reason: String,
    pub raised: Decimal,
    pub media_url: String,
    pub image_url: String,
    pub media_kind: String,
    pub pulse_score: Decimal,
    pub scores: Json<Vec<CategoryScore>>,
    pub suggestions: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied by a creator when publishing a project.
#[derive(Debug, Clone)]
pub struct NewProject<'a> {
    pub creator_id: &'a str,
    pub title: &'a str,
    pub stage_name: &'a str,
    pub real_name: &'a str,
    pub description: &'a str,
    pub funding_goal: Decimal,
    pub funding_reason: &'a str,
    /// Amount already raised at publish time; normally zero.
    pub raised: Decimal,
    pub media_url: &'a str,
    pub image_url: &'a str,
    pub media_kind: MediaKind,
    pub pulse_score: Decimal,
    pub scores: &'a [CategoryScore],
    pub suggestions: Option<&'a str>,
}

/// Sparse update of the creator-editable project fields.
///
/// `None` keeps the stored value. `suggestions` is nullable and follows the
/// `Option<Option<_>>` convention (`Some(None)` clears it).
#[derive(Debug, Clone, Default)]
pub struct ProjectPatch<'a> {
    pub title: Option<&'a str>,
    pub stage_name: Option<&'a str>,
    pub real_name: Option<&'a str>,
    pub description: Option<&'a str>,
    pub funding_goal: Option<Decimal>,
    pub funding_reason: Option<&'a str>,
    pub media_url: Option<&'a str>,
    pub image_url: Option<&'a str>,
    pub media_kind: Option<MediaKind>,
    pub pulse_score: Option<Decimal>,
    pub scores: Option<&'a [CategoryScore]>,
    pub suggestions: Option<Option<&'a str>>,
}

const PROJECT_COLUMNS: &str = "id, public_id, creator_id, title, stage_name, real_name, \
                               description, funding_goal, funding_reason, raised, media_url, \
                               image_url, media_kind, pulse_score, scores, suggestions, \
                               created_at, updated_at";

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Inserts a new project with a freshly generated public id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (including check constraint violations).
pub async fn create_project(pool: &PgPool, project: &NewProject<'_>) -> Result<ProjectRow, DbError> {
    let public_id = Uuid::new_v4();

    let row = sqlx::query_as::<_, ProjectRow>(&format!(
        "INSERT INTO projects \
           (public_id, creator_id, title, stage_name, real_name, description, funding_goal, \
            funding_reason, raised, media_url, image_url, media_kind, pulse_score, scores, \
            suggestions) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
         RETURNING {PROJECT_COLUMNS}"
    ))
    .bind(public_id)
    .bind(project.creator_id)
    .bind(project.title)
    .bind(project.stage_name)
    .bind(project.real_name)
    .bind(project.description)
    .bind(project.funding_goal)
    .bind(project.funding_reason)
    .bind(project.raised)
    .bind(project.media_url)
    .bind(project.image_url)
    .bind(project.media_kind.as_str())
    .bind(project.pulse_score)
    .bind(Json(project.scores))
    .bind(project.suggestions)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Returns a single project by public id, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_project(pool: &PgPool, public_id: Uuid) -> Result<Option<ProjectRow>, DbError> {
    let row = sqlx::query_as::<_, ProjectRow>(&format!(
        "SELECT {PROJECT_COLUMNS} FROM projects WHERE public_id = $1"
    ))
    .bind(public_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Returns all projects owned by `creator_id`, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_projects_by_creator(
    pool: &PgPool,
    creator_id: &str,
) -> Result<Vec<ProjectRow>, DbError> {
    let rows = sqlx::query_as::<_, ProjectRow>(&format!(
        "SELECT {PROJECT_COLUMNS} FROM projects \
         WHERE creator_id = $1 \
         ORDER BY created_at DESC, id DESC"
    ))
    .bind(creator_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns every project, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_all_projects(pool: &PgPool) -> Result<Vec<ProjectRow>, DbError> {
    let rows = sqlx::query_as::<_, ProjectRow>(&format!(
        "SELECT {PROJECT_COLUMNS} FROM projects ORDER BY created_at DESC, id DESC"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Overlays `patch` onto the stored project in a single `UPDATE … RETURNING`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no project has `public_id`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn update_project(
    pool: &PgPool,
    public_id: Uuid,
    patch: &ProjectPatch<'_>,
) -> Result<ProjectRow, DbError> {
    let suggestions_supplied = patch.suggestions.is_some();
    let suggestions_val = patch.suggestions.flatten();

    sqlx::query_as::<_, ProjectRow>(&format!(
        "UPDATE projects \
         SET title          = COALESCE($2, title), \
             stage_name     = COALESCE($3, stage_name), \
             real_name      = COALESCE($4, real_name), \
             description    = COALESCE($5, description), \
             funding_goal   = COALESCE($6, funding_goal), \
             funding_reason = COALESCE($7, funding_reason), \
             media_url      = COALESCE($8, media_url), \
             image_url      = COALESCE($9, image_url), \
             media_kind     = COALESCE($10, media_kind), \
             pulse_score    = COALESCE($11, pulse_score), \
             scores         = COALESCE($12, scores), \
             suggestions    = CASE WHEN $13::BOOL THEN $14 ELSE suggestions END, \
             updated_at     = NOW() \
         WHERE public_id = $1 \
         RETURNING {PROJECT_COLUMNS}"
    ))
    .bind(public_id)
    .bind(patch.title)
    .bind(patch.stage_name)
    .bind(patch.real_name)
    .bind(patch.description)
    .bind(patch.funding_goal)
    .bind(patch.funding_reason)
    .bind(patch.media_url)
    .bind(patch.image_url)
    .bind(patch.media_kind.map(MediaKind::as_str))
    .bind(patch.pulse_score)
    .bind(patch.scores.map(Json))
    .bind(suggestions_supplied)
    .bind(suggestions_val)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Hard-deletes a project.
///
/// Interactions, reviews and investments referencing the project are kept.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no project has `public_id`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn delete_project(pool: &PgPool, public_id: Uuid) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM projects WHERE public_id = $1")
        .bind(public_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}
