//! `POST /api/v1/projects/{id}/investments`: record an investment and bump
//! the project's raised total.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Extension, Json,
};
use pulsevest_core::funding_percentage;
use pulsevest_db::DbError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{
    map_db_error, parse_json, parse_public_id, require_field, validate_money, ApiError,
    ApiResponse, AppState, ResponseMeta,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RecordInvestmentRequest {
    pub investor_id: Option<String>,
    pub amount: Option<Decimal>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RecordInvestmentResponse {
    pub investment_id: Uuid,
    pub current: Decimal,
    pub funding_percentage: Decimal,
}

fn validate_amount(amount: Option<Decimal>) -> Result<Decimal, ApiError> {
    match amount {
        Some(a) if a > Decimal::ZERO => validate_money("amount", a),
        Some(a) => Err(ApiError::validation(format!(
            "amount must be greater than 0, got {a}"
        ))),
        None => Err(ApiError::validation("amount is required")),
    }
}

pub(super) async fn record_investment(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
    body: Result<Json<RecordInvestmentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<RecordInvestmentResponse>>), ApiError> {
    let project_id = parse_public_id("project id", &id)?;
    let body = parse_json(body)?;
    let investor_id = require_field("investorId", body.investor_id.as_deref())?;
    let amount = validate_amount(body.amount)?;

    let receipt = pulsevest_db::record_investment(&state.pool, project_id, investor_id, amount)
        .await
        .map_err(|e| match e {
            DbError::NotFound => ApiError::not_found(format!("project '{project_id}' not found")),
            other => map_db_error(&req_id.0, &other),
        })?;

    tracing::info!(
        request_id = %req_id.0,
        investment_id = %receipt.investment.public_id,
        %project_id,
        investor_id,
        %amount,
        raised = %receipt.raised,
        "investment recorded"
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: RecordInvestmentResponse {
                investment_id: receipt.investment.public_id,
                current: receipt.raised,
                funding_percentage: funding_percentage(receipt.raised, receipt.funding_goal),
            },
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}
