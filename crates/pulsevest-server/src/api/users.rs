//! Profile handlers and the investor directory.
//!
//! - `POST  /api/v1/users`       idempotent profile creation after signup
//! - `GET   /api/v1/users/{uid}` profile incl. PulsePoints balance
//! - `PATCH /api/v1/users/{uid}` name and investor details
//! - `GET   /api/v1/investors`   investors with completed profiles

use std::str::FromStr;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use pulsevest_core::Role;
use pulsevest_db::{DbError, InvestorRow, UserRow};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{
    double_option, map_db_error, parse_json, require_field, ApiError, ApiResponse, AppState,
    ResponseMeta,
};

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(super) struct CreateUserRequest {
    pub uid: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
}

#[allow(clippy::option_option)]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(super) struct UpdateUserRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub contact_info: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub investment_interests: Option<Option<String>>,
}

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CreateUserResponse {
    pub uid: String,
    pub created: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct UserItem {
    pub uid: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub pulse_points: Decimal,
    pub contact_info: Option<String>,
    pub investment_interests: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<UserRow> for UserItem {
    fn from(row: UserRow) -> Self {
        Self {
            uid: row.uid,
            name: row.name,
            email: row.email,
            role: row.role,
            pulse_points: row.pulse_points,
            contact_info: row.contact_info,
            investment_interests: row.investment_interests,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct InvestorItem {
    pub uid: String,
    pub name: String,
    pub contact_info: Option<String>,
    pub investment_interests: String,
}

impl From<InvestorRow> for InvestorItem {
    fn from(row: InvestorRow) -> Self {
        Self {
            uid: row.uid,
            name: row.name,
            contact_info: row.contact_info,
            investment_interests: row.investment_interests,
        }
    }
}

/// Blank strings in a nullable field are stored as `NULL`.
#[allow(clippy::option_option)]
fn trimmed_nullable(field: Option<Option<&str>>) -> Option<Option<&str>> {
    field.map(|v| v.map(str::trim).filter(|s| !s.is_empty()))
}

fn user_not_found(uid: &str) -> ApiError {
    ApiError::not_found(format!("user '{uid}' not found"))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/users: 201 when created, 200 when the profile already exists.
pub(super) async fn create_user(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<CreateUserResponse>>), ApiError> {
    let body = parse_json(body)?;

    let uid = require_field("uid", body.uid.as_deref())?;
    let name = require_field("name", body.name.as_deref())?;
    let email = require_field("email", body.email.as_deref())?;
    let role = require_field("role", body.role.as_deref())?;
    let role = Role::from_str(role).map_err(|e| ApiError::validation(e.to_string()))?;

    let created = pulsevest_db::create_user(&state.pool, uid, name, email, role)
        .await
        .map_err(|e| map_db_error(&req_id.0, &e))?
        .is_some();

    let (status, message) = if created {
        tracing::info!(request_id = %req_id.0, uid, %role, "user profile created");
        (StatusCode::CREATED, None)
    } else {
        (StatusCode::OK, Some("user profile already exists"))
    };

    Ok((
        status,
        Json(ApiResponse {
            data: CreateUserResponse {
                uid: uid.to_owned(),
                created,
                message,
            },
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// GET /api/v1/users/{uid}
pub(super) async fn get_user(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(uid): Path<String>,
) -> Result<Json<ApiResponse<UserItem>>, ApiError> {
    let row = pulsevest_db::get_user_by_uid(&state.pool, &uid)
        .await
        .map_err(|e| map_db_error(&req_id.0, &e))?
        .ok_or_else(|| user_not_found(&uid))?;

    Ok(Json(ApiResponse {
        data: UserItem::from(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// PATCH /api/v1/users/{uid}: sparse update of the editable profile fields.
pub(super) async fn update_user(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(uid): Path<String>,
    body: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<UserItem>>, ApiError> {
    let body = parse_json(body)?;

    let name = match body.name.as_deref() {
        Some(n) => Some(require_field("name", Some(n))?),
        None => None,
    };

    let row = pulsevest_db::update_user_profile(
        &state.pool,
        &uid,
        name,
        trimmed_nullable(body.contact_info.as_ref().map(Option::as_deref)),
        trimmed_nullable(body.investment_interests.as_ref().map(Option::as_deref)),
    )
    .await
    .map_err(|e| match e {
        DbError::NotFound => user_not_found(&uid),
        other => map_db_error(&req_id.0, &other),
    })?;

    tracing::info!(request_id = %req_id.0, uid = %uid, "user profile updated");

    Ok(Json(ApiResponse {
        data: UserItem::from(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// GET /api/v1/investors
pub(super) async fn list_investors(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<InvestorItem>>>, ApiError> {
    let rows = pulsevest_db::list_investors(&state.pool)
        .await
        .map_err(|e| map_db_error(&req_id.0, &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(InvestorItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_request_rejects_points_and_role() {
        for field in ["pulsePoints", "role", "uid", "email"] {
            let body = format!(r#"{{"{field}": "x"}}"#);
            assert!(
                serde_json::from_str::<UpdateUserRequest>(&body).is_err(),
                "{field} should be rejected"
            );
        }
    }

    #[test]
    fn update_request_reads_camel_case_investor_fields() {
        let body: UpdateUserRequest = serde_json::from_str(
            r#"{"contactInfo": null, "investmentInterests": "film scores"}"#,
        )
        .expect("parse");
        assert_eq!(body.contact_info, Some(None));
        assert_eq!(
            body.investment_interests,
            Some(Some("film scores".to_string()))
        );
        assert!(body.name.is_none());
    }

    #[test]
    fn blank_nullable_fields_become_null() {
        assert_eq!(trimmed_nullable(None), None);
        assert_eq!(trimmed_nullable(Some(None)), Some(None));
        assert_eq!(trimmed_nullable(Some(Some("   "))), Some(None));
        assert_eq!(trimmed_nullable(Some(Some(" jazz "))), Some(Some("jazz")));
    }

    #[test]
    fn create_response_omits_message_when_created() {
        let json = serde_json::to_value(CreateUserResponse {
            uid: "u-1".to_string(),
            created: true,
            message: None,
        })
        .expect("serialize");
        assert!(json.get("message").is_none());
        assert_eq!(json["created"], true);
    }
}
