//! Review handlers.
//!
//! - `POST /api/v1/reviews`              submit (one per user per project)
//! - `GET  /api/v1/reviews/{project_id}` list, newest first

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use pulsevest_db::{DbError, NewReview, ReviewRow};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{
    map_db_error, parse_json, parse_public_id, require_field, ApiError, ApiResponse, AppState,
    ErrorKind, ResponseMeta,
};

const MIN_RATING: i64 = 1;
const MAX_RATING: i64 = 5;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SubmitReviewRequest {
    pub project_id: Option<String>,
    pub fan_id: Option<String>,
    pub fan_name: Option<String>,
    pub rating: Option<i64>,
    pub comment: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SubmitReviewResponse {
    pub review_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ReviewItem {
    pub id: Uuid,
    pub project_id: Uuid,
    pub fan_id: String,
    pub fan_name: String,
    pub rating: i16,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

impl From<ReviewRow> for ReviewItem {
    fn from(row: ReviewRow) -> Self {
        Self {
            id: row.public_id,
            project_id: row.project_id,
            fan_id: row.user_uid,
            fan_name: row.display_name,
            rating: row.rating,
            comment: row.comment,
            created_at: row.created_at,
        }
    }
}

fn validate_rating(rating: Option<i64>) -> Result<i16, ApiError> {
    let rating = rating.ok_or_else(|| ApiError::validation("rating is required"))?;
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(ApiError::validation(format!(
            "rating must be between {MIN_RATING} and {MAX_RATING}, got {rating}"
        )));
    }
    i16::try_from(rating).map_err(|_| ApiError::validation("rating is out of range"))
}

/// POST /api/v1/reviews
pub(super) async fn submit_review(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Result<Json<SubmitReviewRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<SubmitReviewResponse>>), ApiError> {
    let body = parse_json(body)?;

    let project_id = require_field("projectId", body.project_id.as_deref())?;
    let fan_id = require_field("fanId", body.fan_id.as_deref())?;
    let fan_name = require_field("fanName", body.fan_name.as_deref())?;
    let comment = require_field("comment", body.comment.as_deref())?;
    let rating = validate_rating(body.rating)?;
    let project_id = parse_public_id("projectId", project_id)?;

    let row = pulsevest_db::insert_review(
        &state.pool,
        NewReview {
            project_id,
            user_uid: fan_id,
            display_name: fan_name,
            rating,
            comment,
        },
    )
    .await
    .map_err(|e| match e {
        DbError::Conflict(_) => {
            ApiError::new(ErrorKind::Conflict, "You have already reviewed this project.")
        }
        other => map_db_error(&req_id.0, &other),
    })?;

    tracing::info!(
        request_id = %req_id.0,
        review_id = %row.public_id,
        %project_id,
        fan_id,
        rating,
        "review submitted"
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: SubmitReviewResponse {
                review_id: row.public_id,
            },
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// GET /api/v1/reviews/{project_id}
pub(super) async fn list_reviews(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(project_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<ReviewItem>>>, ApiError> {
    let project_id = parse_public_id("projectId", &project_id)?;

    let rows = pulsevest_db::list_reviews_for_project(&state.pool, project_id)
        .await
        .map_err(|e| map_db_error(&req_id.0, &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(ReviewItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_bounds_are_inclusive() {
        assert_eq!(validate_rating(Some(1)).expect("1 ok"), 1);
        assert_eq!(validate_rating(Some(5)).expect("5 ok"), 5);
        assert!(validate_rating(Some(0)).is_err());
        assert!(validate_rating(Some(6)).is_err());
        assert!(validate_rating(Some(i64::MAX)).is_err());
        assert!(validate_rating(None).is_err());
    }

    #[test]
    fn fractional_rating_is_rejected_at_parse_time() {
        let parsed = serde_json::from_str::<SubmitReviewRequest>(r#"{"rating": 4.5}"#);
        assert!(parsed.is_err());
    }
}
