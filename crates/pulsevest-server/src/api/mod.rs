mod interactions;
mod investments;
mod projects;
mod reviews;
mod uploads;
mod users;

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, State},
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use uuid::Uuid;

use pulsevest_storage::StorageClient;

use crate::middleware::{enforce_rate_limit, request_id, RateLimitState, RequestId};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    /// `None` when no storage credentials are configured; the upload routes
    /// then fail with a downstream error.
    pub storage: Option<Arc<StorageClient>>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

/// Failure classes a handler can report. Each maps to one HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Downstream,
}

impl ErrorKind {
    fn status(self) -> StatusCode {
        match self {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Downstream => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error response. Serializes to `{ "error": "<message>" }`.
#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    pub kind: ErrorKind,
    pub error: String,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            error: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.kind.status(), Json(self)).into_response()
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

pub(super) fn map_db_error(request_id: &str, error: &pulsevest_db::DbError) -> ApiError {
    match error {
        pulsevest_db::DbError::NotFound => ApiError::not_found("record not found"),
        pulsevest_db::DbError::Conflict(message) => {
            ApiError::new(ErrorKind::Conflict, message.clone())
        }
        pulsevest_db::DbError::OutOfRange(message) => ApiError::validation(message.clone()),
        pulsevest_db::DbError::Sqlx(_) | pulsevest_db::DbError::Migration(_) => {
            tracing::error!(request_id, error = %error, "database query failed");
            ApiError::new(ErrorKind::Downstream, "database query failed")
        }
    }
}

/// Unwraps a JSON body, turning malformed or mistyped input into a 400.
pub(super) fn parse_json<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ApiError::validation(rejection.body_text()))
}

/// Trims `value` and rejects it when absent or blank.
pub(super) fn require_field<'a>(field: &str, value: Option<&'a str>) -> Result<&'a str, ApiError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::validation(format!("{field} is required")))
}

/// Money columns are `NUMERIC(14, 2)`: whole cents below 10^12.
const MONEY_SCALE: u32 = 2;
const MONEY_LIMIT: i64 = 1_000_000_000_000;

/// Rejects amounts the money columns cannot store exactly.
pub(super) fn validate_money(field: &str, value: Decimal) -> Result<Decimal, ApiError> {
    if value.normalize().scale() > MONEY_SCALE {
        return Err(ApiError::validation(format!(
            "{field} must have at most {MONEY_SCALE} decimal places, got {value}"
        )));
    }
    if value.abs() >= Decimal::from(MONEY_LIMIT) {
        return Err(ApiError::validation(format!(
            "{field} must be less than {MONEY_LIMIT}, got {value}"
        )));
    }
    Ok(value)
}

pub(super) fn parse_public_id(field: &str, value: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(value.trim())
        .map_err(|_| ApiError::validation(format!("{field} must be a valid id, got '{value}'")))
}

/// Deserializes a nullable PATCH field so that an explicit `null` becomes
/// `Some(None)`. Use with `#[serde(default)]` so an absent field stays `None`.
#[allow(clippy::option_option)]
pub(super) fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static("x-request-id")])
}

fn upload_router(upload_max_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/api/v1/uploads", post(uploads::upload_media))
        .layer(
            ServiceBuilder::new()
                .layer(DefaultBodyLimit::disable())
                .layer(RequestBodyLimitLayer::new(upload_max_bytes)),
        )
}

fn api_router(rate_limit: RateLimitState, upload_max_bytes: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/projects",
            get(projects::list_projects).post(projects::create_project),
        )
        .route("/api/v1/projects/all", get(projects::list_all_projects))
        .route(
            "/api/v1/projects/{id}",
            get(projects::get_project)
                .put(projects::update_project)
                .delete(projects::delete_project),
        )
        .route(
            "/api/v1/projects/{id}/investments",
            post(investments::record_investment),
        )
        .route(
            "/api/v1/interactions",
            post(interactions::record_interaction),
        )
        .route("/api/v1/reviews", post(reviews::submit_review))
        .route("/api/v1/reviews/{project_id}", get(reviews::list_reviews))
        .route("/api/v1/users", post(users::create_user))
        .route(
            "/api/v1/users/{uid}",
            get(users::get_user).patch(users::update_user),
        )
        .route("/api/v1/investors", get(users::list_investors))
        .route("/api/v1/upload-signature", post(uploads::sign_upload))
        .merge(upload_router(upload_max_bytes))
        .layer(axum::middleware::from_fn_with_state(
            rate_limit,
            enforce_rate_limit,
        ))
}

pub fn build_app(state: AppState, rate_limit: RateLimitState, upload_max_bytes: usize) -> Router {
    let public_routes = Router::new().route("/api/v1/health", get(health));

    Router::new()
        .merge(public_routes)
        .merge(api_router(rate_limit, upload_max_bytes))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match pulsevest_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}
