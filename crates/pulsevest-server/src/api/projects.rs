//! Project handlers.
//!
//! - `POST   /api/v1/projects`             create
//! - `GET    /api/v1/projects?creatorId=…` a creator's projects, newest first
//! - `GET    /api/v1/projects/all`         every project, newest first
//! - `GET    /api/v1/projects/{id}`        one project
//! - `PUT    /api/v1/projects/{id}`        sparse update of editable fields
//! - `DELETE /api/v1/projects/{id}`        hard delete

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use pulsevest_core::{funding_percentage, CategoryScore, MediaKind};
use pulsevest_db::{DbError, NewProject, ProjectPatch, ProjectRow};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{
    double_option, map_db_error, parse_json, parse_public_id, require_field, validate_money,
    ApiError, ApiResponse, AppState, ResponseMeta,
};

const MAX_PULSE_SCORE: Decimal = Decimal::ONE_HUNDRED;

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CreateProjectRequest {
    #[serde(alias = "creator")]
    pub creator_id: Option<String>,
    pub title: Option<String>,
    #[serde(default)]
    pub stage_name: String,
    #[serde(default)]
    pub real_name: String,
    #[serde(default)]
    pub description: String,
    pub funding_goal: Decimal,
    #[serde(default)]
    pub funding_reason: String,
    /// Amount raised before publishing. Normally omitted.
    #[serde(default)]
    pub current: Decimal,
    pub media_url: Option<String>,
    pub image_url: Option<String>,
    pub media_type: MediaKind,
    #[serde(default)]
    pub pulse_score: Decimal,
    #[serde(default)]
    pub scores: Vec<CategoryScore>,
    pub suggestions: Option<String>,
}

// Owner, raised-so-far and timestamps are deliberately absent; unknown fields
// are rejected rather than ignored.
#[allow(clippy::option_option)]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(super) struct UpdateProjectRequest {
    pub title: Option<String>,
    pub stage_name: Option<String>,
    pub real_name: Option<String>,
    pub description: Option<String>,
    pub funding_goal: Option<Decimal>,
    pub funding_reason: Option<String>,
    pub media_url: Option<String>,
    pub image_url: Option<String>,
    pub media_type: Option<MediaKind>,
    pub pulse_score: Option<Decimal>,
    pub scores: Option<Vec<CategoryScore>>,
    #[serde(default, deserialize_with = "double_option")]
    pub suggestions: Option<Option<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ListProjectsQuery {
    pub creator_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CreateProjectResponse {
    pub project_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ProjectItem {
    pub id: Uuid,
    pub creator_id: String,
    pub title: String,
    pub stage_name: String,
    pub real_name: String,
    pub description: String,
    pub funding_goal: Decimal,
    pub funding_reason: String,
    pub current: Decimal,
    pub funding_percentage: Decimal,
    pub media_url: String,
    pub image_url: String,
    pub media_type: String,
    pub pulse_score: Decimal,
    pub scores: Vec<CategoryScore>,
    pub suggestions: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProjectRow> for ProjectItem {
    fn from(row: ProjectRow) -> Self {
        Self {
            id: row.public_id,
            funding_percentage: funding_percentage(row.raised, row.funding_goal),
            creator_id: row.creator_id,
            title: row.title,
            stage_name: row.stage_name,
            real_name: row.real_name,
            description: row.description,
            funding_goal: row.funding_goal,
            funding_reason: row.funding_reason,
            current: row.raised,
            media_url: row.media_url,
            image_url: row.image_url,
            media_type: row.media_kind,
            pulse_score: row.pulse_score,
            scores: row.scores.0,
            suggestions: row.suggestions,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

fn validate_funding_goal(value: Decimal) -> Result<(), ApiError> {
    if value.is_sign_negative() {
        return Err(ApiError::validation(format!(
            "fundingGoal must not be negative, got {value}"
        )));
    }
    validate_money("fundingGoal", value)?;
    Ok(())
}

fn validate_pulse_score(value: Decimal) -> Result<(), ApiError> {
    if value < Decimal::ZERO || value > MAX_PULSE_SCORE {
        return Err(ApiError::validation(format!(
            "pulseScore must be between 0 and 100, got {value}"
        )));
    }
    Ok(())
}

fn project_error(request_id: &str, id: Uuid, e: &DbError) -> ApiError {
    match e {
        DbError::NotFound => ApiError::not_found(format!("project '{id}' not found")),
        other => map_db_error(request_id, other),
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/projects: publish a project.
pub(super) async fn create_project(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Result<Json<CreateProjectRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<CreateProjectResponse>>), ApiError> {
    let body = parse_json(body)?;

    let creator_id = require_field("creatorId", body.creator_id.as_deref())?;
    let title = require_field("title", body.title.as_deref())?;
    let media_url = require_field("mediaUrl", body.media_url.as_deref())?;
    let image_url = require_field("imageUrl", body.image_url.as_deref())?;
    validate_funding_goal(body.funding_goal)?;
    validate_pulse_score(body.pulse_score)?;
    if body.current.is_sign_negative() {
        return Err(ApiError::validation("current must not be negative"));
    }
    validate_money("current", body.current)?;

    let row = pulsevest_db::create_project(
        &state.pool,
        &NewProject {
            creator_id,
            title,
            stage_name: body.stage_name.trim(),
            real_name: body.real_name.trim(),
            description: &body.description,
            funding_goal: body.funding_goal,
            funding_reason: &body.funding_reason,
            raised: body.current,
            media_url,
            image_url,
            media_kind: body.media_type,
            pulse_score: body.pulse_score,
            scores: &body.scores,
            suggestions: body.suggestions.as_deref(),
        },
    )
    .await
    .map_err(|e| map_db_error(&req_id.0, &e))?;

    tracing::info!(
        request_id = %req_id.0,
        project_id = %row.public_id,
        creator_id,
        "project created"
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: CreateProjectResponse {
                project_id: row.public_id,
            },
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// GET /api/v1/projects?creatorId=…: a creator's projects, newest first.
pub(super) async fn list_projects(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<ListProjectsQuery>,
) -> Result<Json<ApiResponse<Vec<ProjectItem>>>, ApiError> {
    let creator_id = require_field("creatorId", params.creator_id.as_deref())?;

    let rows = pulsevest_db::list_projects_by_creator(&state.pool, creator_id)
        .await
        .map_err(|e| map_db_error(&req_id.0, &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(ProjectItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// GET /api/v1/projects/all: every project, newest first.
pub(super) async fn list_all_projects(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<ProjectItem>>>, ApiError> {
    let rows = pulsevest_db::list_all_projects(&state.pool)
        .await
        .map_err(|e| map_db_error(&req_id.0, &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(ProjectItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// GET /api/v1/projects/{id}
pub(super) async fn get_project(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ProjectItem>>, ApiError> {
    let id = parse_public_id("project id", &id)?;

    let row = pulsevest_db::get_project(&state.pool, id)
        .await
        .map_err(|e| map_db_error(&req_id.0, &e))?
        .ok_or_else(|| ApiError::not_found(format!("project '{id}' not found")))?;

    Ok(Json(ApiResponse {
        data: ProjectItem::from(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// PUT /api/v1/projects/{id}: sparse update; returns the updated project.
pub(super) async fn update_project(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
    body: Result<Json<UpdateProjectRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<ProjectItem>>, ApiError> {
    let id = parse_public_id("project id", &id)?;
    let body = parse_json(body)?;

    let title = match body.title.as_deref() {
        Some(t) => Some(require_field("title", Some(t))?),
        None => None,
    };
    for (field, value) in [("mediaUrl", &body.media_url), ("imageUrl", &body.image_url)] {
        if let Some(v) = value {
            require_field(field, Some(v.as_str()))?;
        }
    }
    if let Some(goal) = body.funding_goal {
        validate_funding_goal(goal)?;
    }
    if let Some(score) = body.pulse_score {
        validate_pulse_score(score)?;
    }

    let patch = ProjectPatch {
        title,
        stage_name: body.stage_name.as_deref(),
        real_name: body.real_name.as_deref(),
        description: body.description.as_deref(),
        funding_goal: body.funding_goal,
        funding_reason: body.funding_reason.as_deref(),
        media_url: body.media_url.as_deref().map(str::trim),
        image_url: body.image_url.as_deref().map(str::trim),
        media_kind: body.media_type,
        pulse_score: body.pulse_score,
        scores: body.scores.as_deref(),
        suggestions: body.suggestions.as_ref().map(Option::as_deref),
    };

    let row = pulsevest_db::update_project(&state.pool, id, &patch)
        .await
        .map_err(|e| project_error(&req_id.0, id, &e))?;

    tracing::info!(request_id = %req_id.0, project_id = %id, "project updated");

    Ok(Json(ApiResponse {
        data: ProjectItem::from(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// DELETE /api/v1/projects/{id}: hard delete.
pub(super) async fn delete_project(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let id = parse_public_id("project id", &id)?;

    pulsevest_db::delete_project(&state.pool, id)
        .await
        .map_err(|e| project_error(&req_id.0, id, &e))?;

    tracing::info!(request_id = %req_id.0, project_id = %id, "project deleted");

    Ok(Json(ApiResponse {
        data: serde_json::json!({ "deleted": true }),
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_request_rejects_non_editable_fields() {
        for field in ["creatorId", "current", "createdAt", "id"] {
            let body = format!(r#"{{"{field}": "x"}}"#);
            let parsed = serde_json::from_str::<UpdateProjectRequest>(&body);
            assert!(parsed.is_err(), "{field} should be rejected");
        }
    }

    #[test]
    fn update_request_distinguishes_null_from_absent_suggestions() {
        let absent: UpdateProjectRequest = serde_json::from_str("{}").expect("parse");
        assert_eq!(absent.suggestions, None);

        let cleared: UpdateProjectRequest =
            serde_json::from_str(r#"{"suggestions": null}"#).expect("parse");
        assert_eq!(cleared.suggestions, Some(None));

        let set: UpdateProjectRequest =
            serde_json::from_str(r#"{"suggestions": "tighten the mix"}"#).expect("parse");
        assert_eq!(set.suggestions, Some(Some("tighten the mix".to_string())));
    }

    #[test]
    fn create_request_accepts_numeric_money_and_lowercase_media_type() {
        let body: CreateProjectRequest = serde_json::from_str(
            r#"{
                "creatorId": "c-1",
                "title": "Lagos Nights",
                "fundingGoal": 5000,
                "mediaUrl": "https://cdn.example.com/a.mp3",
                "imageUrl": "https://cdn.example.com/a.png",
                "mediaType": "audio",
                "pulseScore": 87.5,
                "scores": [{"category": "Vocals", "score": 90, "explanation": "Strong"}]
            }"#,
        )
        .expect("parse");
        assert_eq!(body.funding_goal, Decimal::from(5000));
        assert_eq!(body.pulse_score, Decimal::new(875, 1));
        assert_eq!(body.media_type, MediaKind::Audio);
        assert_eq!(body.current, Decimal::ZERO);
        assert_eq!(body.scores.len(), 1);
    }

    #[test]
    fn create_request_rejects_unknown_media_type() {
        let parsed = serde_json::from_str::<CreateProjectRequest>(
            r#"{"fundingGoal": 1, "mediaType": "image"}"#,
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn funding_goal_must_fit_money_column() {
        assert!(validate_funding_goal(Decimal::new(100_050, 2)).is_ok());
        assert!(validate_funding_goal(Decimal::new(1, 3)).is_err());
        assert!(validate_funding_goal(Decimal::from(1_000_000_000_000_000_i64)).is_err());
        assert!(validate_funding_goal(Decimal::NEGATIVE_ONE).is_err());
    }

    #[test]
    fn pulse_score_bounds_are_inclusive() {
        assert!(validate_pulse_score(Decimal::ZERO).is_ok());
        assert!(validate_pulse_score(Decimal::ONE_HUNDRED).is_ok());
        assert!(validate_pulse_score(Decimal::new(1001, 1)).is_err());
        assert!(validate_pulse_score(Decimal::NEGATIVE_ONE).is_err());
    }

    #[test]
    fn project_item_reports_funding_percentage() {
        use pulsevest_db::ProjectRow;
        use sqlx::types::Json;

        let row = ProjectRow {
            id: 1,
            public_id: Uuid::new_v4(),
            creator_id: "c-1".to_string(),
            title: "T".to_string(),
            stage_name: String::new(),
            real_name: String::new(),
            description: String::new(),
            funding_goal: Decimal::from(400),
            funding_reason: String::new(),
            raised: Decimal::from(100),
            media_url: "m".to_string(),
            image_url: "i".to_string(),
            media_kind: "video".to_string(),
            pulse_score: Decimal::from(50),
            scores: Json(Vec::new()),
            suggestions: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let item = ProjectItem::from(row);
        assert_eq!(item.funding_percentage, Decimal::from(25));
        let json = serde_json::to_value(&item).expect("serialize");
        assert_eq!(json["mediaType"], "video");
        assert!(json.get("creatorId").is_some());
    }
}
